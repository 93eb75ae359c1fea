//! Validation Error Types

use thiserror::Error;

/// Errors during parameter validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// One or more required parameters absent or empty
    #[error("missing query parameter: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Parameter present but not a finite number
    #[error("invalid {field} query parameter: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Text parameter longer than allowed
    #[error("{field} is {len} characters long, at most {max} allowed")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
