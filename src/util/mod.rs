//! Utility types and functions for EDL.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`sanitize_name`] - Filesystem-safe unit names

mod error;
mod sanitize;

pub use error::*;
pub use sanitize::*;
