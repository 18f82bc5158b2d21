//! # Reminder Commands
//!
//! Definitions for /remind and /reminders.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![create_remind_command(), create_reminders_command()]
}

/// Creates the remind command
fn create_remind_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("remind")
        .description("Создать напоминание")
        .create_option(|option| {
            option
                .name("time")
                .description("Когда напомнить: «через 30 минут», «завтра в 15:00», «15:45»")
                .kind(CommandOptionType::String)
                .required(true)
                .min_length(1)
                .max_length(100)
        })
        .create_option(|option| {
            option
                .name("message")
                .description("Текст напоминания")
                .kind(CommandOptionType::String)
                .required(true)
                .min_length(1)
                .max_length(1000)
        })
        .to_owned()
}

/// Creates the reminders command (list / cancel)
fn create_reminders_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("reminders")
        .description("Показать или отменить активные напоминания")
        .create_option(|option| {
            option
                .name("action")
                .description("Что сделать")
                .kind(CommandOptionType::String)
                .required(false)
                .add_string_choice("Список", "list")
                .add_string_choice("Отменить", "cancel")
        })
        .create_option(|option| {
            option
                .name("id")
                .description("ID напоминания для отмены")
                .kind(CommandOptionType::Integer)
                .required(false)
        })
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_commands_defines_both() {
        let commands = create_commands();
        assert_eq!(commands.len(), 2);
    }
}
