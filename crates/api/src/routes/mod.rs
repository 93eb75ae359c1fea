//! Request handlers

pub mod names;
pub mod readings;
