//! Parameter Validation
//!
//! Turns raw request parameters into validated readings and station names.
//! A parameter that is absent is reported differently from one that is
//! present but unusable.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{
    NameParams, ReadingParams, ValidName, ValidReading, ValidationConfig, Validator,
};
