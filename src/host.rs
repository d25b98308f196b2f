use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
    time::{Duration, Instant},
};

/// Where `io.print` and `debug` write their lines.
#[derive(Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Buffer(Rc<RefCell<Vec<u8>>>),
}

impl OutputSink {
    /// In-memory sink; read it back with [`OutputSink::contents`].
    pub fn buffer() -> Self {
        OutputSink::Buffer(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn write(&self, text: &str) -> io::Result<()> {
        match self {
            OutputSink::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(text.as_bytes())?;
                out.flush()
            }
            OutputSink::Buffer(buffer) => buffer.borrow_mut().write_all(text.as_bytes()),
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        match self {
            OutputSink::Stdout => io::stdout().flush(),
            OutputSink::Buffer(_) => Ok(()),
        }
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        self.write(&format!("{line}\n"))
    }

    /// Captured text; always empty for stdout.
    pub fn contents(&self) -> String {
        match self {
            OutputSink::Stdout => String::new(),
            OutputSink::Buffer(buffer) => String::from_utf8_lossy(&buffer.borrow()).into_owned(),
        }
    }
}

/// Per-interpreter host state handed to the standard library, so several
/// interpreters can run side by side with their own clocks and sinks.
#[derive(Clone)]
pub struct HostContext {
    started: Instant,
    output: OutputSink,
}

impl HostContext {
    pub fn new(output: OutputSink) -> Self {
        Self {
            started: Instant::now(),
            output,
        }
    }

    pub fn stdout() -> Self {
        Self::new(OutputSink::Stdout)
    }

    pub fn buffered() -> Self {
        Self::new(OutputSink::buffer())
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::stdout()
    }
}
