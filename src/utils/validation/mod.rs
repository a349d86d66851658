//! Validation utilities
//!
//! Input checks that run before the pipeline commits to any work.

pub mod file;

pub use file::FileValidator;
