//! Error types for adversario operations.
//!
//! Recoverable failures (bad hyperparameters, I/O, corrupt dataset files)
//! surface as [`AdversarioError`]. Shape mismatches inside the tensor layer
//! panic, matching the numerical-library convention.

use std::fmt;

/// Main error type for adversario operations.
///
/// # Examples
///
/// ```
/// use adversario::error::AdversarioError;
///
/// let err = AdversarioError::InvalidHyperparameter {
///     param: "radius".to_string(),
///     value: "-0.5".to_string(),
///     constraint: "> 0".to_string(),
/// };
/// assert!(err.to_string().contains("radius"));
/// ```
#[derive(Debug)]
pub enum AdversarioError {
    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Dataset dimensions are inconsistent.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Unknown dataset-variant selector.
    UnknownPolicy {
        /// Selector string that failed to parse
        selector: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Invalid or corrupt dataset file.
    FormatError {
        /// Error description
        message: String,
    },

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for AdversarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdversarioError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            AdversarioError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {expected}, got {actual}")
            }
            AdversarioError::UnknownPolicy { selector } => {
                write!(
                    f,
                    "Unknown target policy '{selector}' (expected drand, ddet, or dother)"
                )
            }
            AdversarioError::Io(e) => write!(f, "I/O error: {e}"),
            AdversarioError::FormatError { message } => {
                write!(f, "Invalid dataset format: {message}")
            }
            AdversarioError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for AdversarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdversarioError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AdversarioError {
    fn from(e: std::io::Error) -> Self {
        AdversarioError::Io(e)
    }
}

impl From<String> for AdversarioError {
    fn from(msg: String) -> Self {
        AdversarioError::Other(msg)
    }
}

impl From<&str> for AdversarioError {
    fn from(msg: &str) -> Self {
        AdversarioError::Other(msg.to_string())
    }
}

/// Convenience result type for adversario operations.
pub type Result<T> = std::result::Result<T, AdversarioError>;
