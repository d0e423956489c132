//! # Tube Map Common Library
//!
//! Shared code for the tube map backend:
//! - Error type
//! - Configuration loading
//! - Line-oriented file reading
//! - Suffix-based directory listing

pub mod config;
pub mod error;
pub mod lines;
pub mod listing;

pub use error::{Error, Result};
pub use lines::LineReader;
