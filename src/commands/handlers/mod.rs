//! Command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

pub mod remind;

pub use remind::RemindHandler;
