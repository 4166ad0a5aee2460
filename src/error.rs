//! Error types shared by the lexer, parser and interpreter.

pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when parsing or evaluating an expression.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: Box<str> },
    #[error("invalid arity: {0}")]
    InvalidArity(Box<str>),
    #[error("invalid type: {0}")]
    InvalidType(Box<str>),
    #[error("invalid value: {0}")]
    InvalidValue(Box<str>),
    #[error("unknown function \"{0}\"")]
    UnknownFunction(Box<str>),
    #[error("invalid visit: {0}")]
    InvalidVisit(Box<str>),
}

impl Error {
    pub(crate) fn syntax(column: usize, message: impl Into<Box<str>>) -> Self {
        Error::Syntax {
            column,
            message: message.into(),
        }
    }

    /// The 0-based column of a syntax error.
    pub fn column(&self) -> Option<usize> {
        match self {
            Error::Syntax { column, .. } => Some(*column),
            _ => None,
        }
    }

    /// Whether the error may be swallowed by the `disable_visit_errors`
    /// runtime option. Syntax errors never are.
    pub fn is_suppressible(&self) -> bool {
        !matches!(self, Error::Syntax { .. })
    }
}
