// Core layer - shared configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure
pub mod database;

// Application layer
pub mod commands;

// Re-export core config for convenience
pub use core::Config;

// Re-export infrastructure
pub use database::Database;

// Re-export feature items
pub use features::reminders::{
    DeliveryChannel, DeliveryFailure, FailureKind, Reminder, ReminderScheduler, ReminderService,
    ReminderStatus, ReminderStore, SchedulerState,
};
