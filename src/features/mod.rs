//! # Features
//!
//! Feature modules for the reminder bot.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

pub mod reminders;
