use thiserror::Error;

/// Why a declaration could not be given a symbol identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("{kind} has no name to build a symbol identifier from")]
    Unnamed { kind: &'static str },

    #[error("{kind} is a statement, statements carry no symbol identifier")]
    NotADeclaration { kind: &'static str },
}

/// Why one translation unit could not be dumped.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("{path}:{line}:{column}: {message}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DumpError {
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, DumpError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}
