/*!
 * Error types for the RegFlow core crate.
 */
use thiserror::Error;

/// Error type for RegFlow core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A value had a different kind than the caller required
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// The kind the caller asked for
        expected: &'static str,
        /// The kind that was actually present
        found: String,
    },

    /// Invalid value error
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for RegFlow core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new type mismatch error
    pub fn type_mismatch<S: AsRef<str>>(expected: &'static str, found: S) -> Self {
        Error::TypeMismatch {
            expected,
            found: found.as_ref().to_string(),
        }
    }

    /// Create a new invalid value error
    pub fn invalid_value<S: AsRef<str>>(msg: S) -> Self {
        Error::InvalidValue(msg.as_ref().to_string())
    }

    /// Create a new logging error
    pub fn logging<S: AsRef<str>>(msg: S) -> Self {
        Error::Logging(msg.as_ref().to_string())
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        Error::Other(msg.as_ref().to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
