use std::fmt;

use thiserror::Error;

/// Location of a token in the source text. `line` and `column` are zero-based and
/// count characters; `offset` is the byte offset from the start of the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Runtime,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Option<Position>,
    pub snippet: Option<String>,
    pub notes: Vec<String>,
    width: usize,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
            snippet: None,
            notes: Vec::new(),
            width: 1,
        }
    }

    pub fn lexer(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Lexer, message)
    }

    pub fn parser(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Parser, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Runtime, message)
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Number of carets drawn under the offending token.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attaches the offending source line and a caret pointer beneath it.
    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(position) = self.position {
            if let Some(line) = source.lines().nth(position.line) {
                let pointer = format!("{}{}", " ".repeat(position.column), "^".repeat(self.width));
                self.snippet = Some(format!("{line}\n{pointer}"));
            }
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(position) = self.position {
            write!(f, " at {position}")?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, ":\n{snippet}")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the Luna toolchain.
#[derive(Debug, Error)]
pub enum LunaError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LunaError {
    pub fn runtime(message: impl Into<String>) -> Self {
        LunaError::Diagnostic(Diagnostic::runtime(message))
    }

    /// Fills in `position` unless the diagnostic already carries one.
    pub fn at(self, position: Position) -> Self {
        match self {
            LunaError::Diagnostic(diag) if diag.position.is_none() => {
                LunaError::Diagnostic(diag.with_position(position))
            }
            other => other,
        }
    }

    pub fn with_source(self, source: &str) -> Self {
        match self {
            LunaError::Diagnostic(diag) if diag.snippet.is_none() => {
                LunaError::Diagnostic(diag.with_source(source))
            }
            other => other,
        }
    }

    pub fn kind(&self) -> Option<&DiagnosticKind> {
        match self {
            LunaError::Diagnostic(diag) => Some(&diag.kind),
            LunaError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LunaError>;
