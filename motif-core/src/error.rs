use std::fmt;

/// Broad classes of failure, shown in the prefix of every reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong argument count or an argument that doesn't parse
    Usage,
    /// Unknown pattern, command or operation
    Lookup,
    /// A well-formed value outside its allowed bounds
    Range,
    /// Output port or playback failure; never produced by this crate
    Resource,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Usage => write!(f, "usage"),
            ErrorCategory::Lookup => write!(f, "lookup"),
            ErrorCategory::Range => write!(f, "range"),
            ErrorCategory::Resource => write!(f, "resource"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotifError {
    #[error("Usage: {0}")]
    Usage(String),

    #[error("Invalid note: {0}")]
    InvalidNote(String),

    #[error("Invalid {what}: {value}")]
    InvalidNumber { what: &'static str, value: String },

    #[error("Pattern '{0}' not found")]
    PatternNotFound(String),

    #[error("Unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{what} must be {min}-{max}")]
    OutOfRange {
        what: &'static str,
        min: i64,
        max: i64,
    },

    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

impl MotifError {
    pub fn usage(text: impl Into<String>) -> Self {
        MotifError::Usage(text.into())
    }

    pub fn invalid_number(what: &'static str, value: &str) -> Self {
        MotifError::InvalidNumber {
            what,
            value: value.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MotifError::Usage(_) | MotifError::InvalidNote(_) | MotifError::InvalidNumber { .. } => {
                ErrorCategory::Usage
            }
            MotifError::PatternNotFound(_)
            | MotifError::UnknownCommand(_)
            | MotifError::UnknownOperation(_) => ErrorCategory::Lookup,
            MotifError::OutOfRange { .. } | MotifError::NotPositive(_) => ErrorCategory::Range,
        }
    }
}

pub type Result<T> = std::result::Result<T, MotifError>;
