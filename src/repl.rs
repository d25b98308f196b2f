use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{LunaError, Result},
    runtime::Interpreter,
};

const PROMPT: &str = ">> ";
const CONTINUATION: &str = ".. ";

pub struct Repl {
    interpreter: Interpreter,
}

impl Repl {
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(readline_error)?;
        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION };
            match editor.readline(prompt) {
                Ok(line) => {
                    if buffer.is_empty() {
                        let trimmed = line.trim();
                        if trimmed == ":quit" || trimmed == ":exit" {
                            break;
                        }
                        if trimmed.is_empty() {
                            continue;
                        }
                    }
                    buffer.push_str(&line);
                    buffer.push('\n');
                    if bracket_depth(&buffer) > 0 {
                        continue;
                    }
                    let source = std::mem::take(&mut buffer);
                    editor.add_history_entry(source.trim_end()).ok();
                    self.eval_line(&source);
                }
                Err(ReadlineError::Interrupted) if !buffer.is_empty() => buffer.clear(),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(readline_error(err)),
            }
        }
        Ok(())
    }

    fn eval_line(&mut self, source: &str) {
        match self.interpreter.eval_source(source) {
            Ok(value) if value.is_void() => {}
            Ok(value) => println!("{value}"),
            Err(LunaError::Diagnostic(diag)) => eprintln!("{diag}"),
            Err(other) => eprintln!("error: {other}"),
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

fn readline_error(err: ReadlineError) -> LunaError {
    LunaError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
}

/// Net count of open `(`, `[` and `{` in `source`, ignoring anything inside
/// quoted strings. A positive result means the input is incomplete.
pub fn bracket_depth(source: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = source.chars();
    while let Some(ch) = chars.next() {
        match quote {
            Some(_) if ch == '\\' => {
                chars.next();
            }
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '#' => {
                    for skipped in chars.by_ref() {
                        if skipped == '\n' {
                            break;
                        }
                    }
                }
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}
