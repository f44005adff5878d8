#![forbid(unsafe_code)]
#![doc = "Common error types for pemview."]

pub mod error;

pub use error::*;
