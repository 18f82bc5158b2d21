//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use crate::features::reminders::ReminderService;

/// Shared context for all command handlers
///
/// Holds the services command handlers need; currently the reminder service
/// over the persistent store.
#[derive(Clone)]
pub struct CommandContext {
    pub reminders: ReminderService,
}

impl CommandContext {
    /// Create a new CommandContext with the given services
    pub fn new(reminders: ReminderService) -> Self {
        Self { reminders }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_context_clone() {
        // CommandContext should be Clone for sharing across handlers
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }
}
