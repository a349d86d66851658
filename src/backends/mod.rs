//! Backend implementations of the background removal capability
//!
//! - Border-key backend (pure Rust, keys out a plain backdrop; used by the CLI)
//!
//! Model-based backends live outside this crate and plug in through
//! [`RemovalBackend`](crate::inference::RemovalBackend).

pub mod border_key;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

pub use self::border_key::BorderKeyBackend;
