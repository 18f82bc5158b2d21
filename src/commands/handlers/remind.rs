//! Reminder command handlers
//!
//! Handles: remind, reminders
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::SlashCommandHandler;
use crate::commands::slash::{get_integer_option, get_string_option};
use crate::features::reminders::parser::format_time;

const TIME_FORMAT_HELP: &str = "❌ Не удалось распознать время. Поддерживаемые форматы:\n\
    • `через 30 минут`, `через 2 часа`\n\
    • `сегодня в 18:00`, `завтра в 09:30`\n\
    • `15:45` — сегодня (если не прошло) или завтра\n\
    • `2024-06-10 14:30` или `10.06.2024 14:30`";

/// Handler for reminder-related commands
pub struct RemindHandler;

#[async_trait]
impl SlashCommandHandler for RemindHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["remind", "reminders"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        match command.data.name.as_str() {
            "remind" => self.handle_remind(&ctx, serenity_ctx, command).await,
            "reminders" => self.handle_reminders(&ctx, serenity_ctx, command).await,
            _ => Ok(()),
        }
    }
}

impl RemindHandler {
    /// Handle /remind command - create a new reminder
    async fn handle_remind(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.to_string();

        let time_text = get_string_option(&command.data.options, "time")
            .ok_or_else(|| anyhow::anyhow!("Missing time parameter"))?;
        let message = get_string_option(&command.data.options, "message")
            .ok_or_else(|| anyhow::anyhow!("Missing message parameter"))?;

        let now = chrono::Local::now().naive_local();
        match ctx.reminders.create(&user_id, &time_text, &message, now).await? {
            Some(reminder) => {
                respond(
                    serenity_ctx,
                    command,
                    &format!(
                        "✅ Напоминание создано!\n\n📝 **Текст:** {}\n⏰ **Время:** {}\n🆔 **ID:** {}",
                        reminder.body,
                        format_time(reminder.due_at, now),
                        reminder.id
                    ),
                )
                .await
            }
            None => respond(serenity_ctx, command, TIME_FORMAT_HELP).await,
        }
    }

    /// Handle /reminders command - list or cancel reminders
    async fn handle_reminders(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let user_id = command.user.id.to_string();
        let action =
            get_string_option(&command.data.options, "action").unwrap_or_else(|| "list".to_string());

        debug!("Processing reminders/{action} for user {user_id}");

        match action.as_str() {
            "cancel" => {
                self.cancel_reminder(ctx, serenity_ctx, command, &user_id)
                    .await
            }
            _ => self.list_reminders(ctx, serenity_ctx, command, &user_id).await,
        }
    }

    /// Cancel a specific reminder
    async fn cancel_reminder(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        user_id: &str,
    ) -> Result<()> {
        let Some(id) = get_integer_option(&command.data.options, "id") else {
            return respond(
                serenity_ctx,
                command,
                "❌ Укажите ID напоминания для отмены. Список ID: `/reminders`",
            )
            .await;
        };

        if ctx.reminders.cancel(id, user_id).await? {
            respond(serenity_ctx, command, &format!("✅ Напоминание #{id} отменено.")).await
        } else {
            respond(
                serenity_ctx,
                command,
                &format!("❌ Напоминание #{id} не найдено или принадлежит не вам."),
            )
            .await
        }
    }

    /// List all active reminders
    async fn list_reminders(
        &self,
        ctx: &CommandContext,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
        user_id: &str,
    ) -> Result<()> {
        let reminders = ctx.reminders.list_active(user_id).await?;

        if reminders.is_empty() {
            return respond(
                serenity_ctx,
                command,
                "📭 У вас нет активных напоминаний.\n\nСоздайте новое: `/remind`",
            )
            .await;
        }

        let now = chrono::Local::now().naive_local();
        let mut listing = String::from("📋 **Ваши активные напоминания:**\n\n");
        for reminder in &reminders {
            listing.push_str(&format!(
                "**#{}** — {}\n> {}\n\n",
                reminder.id,
                format_time(reminder.due_at, now),
                reminder.body
            ));
        }
        listing.push_str("*Отменить: `/reminders action:Отменить id:<номер>`*");

        respond(serenity_ctx, command, &listing).await
    }
}

async fn respond(
    serenity_ctx: &Context,
    command: &ApplicationCommandInteraction,
    content: &str,
) -> Result<()> {
    command
        .create_interaction_response(&serenity_ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|msg| msg.content(content))
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remind_handler_commands() {
        let handler = RemindHandler;
        let names = handler.command_names();

        assert!(names.contains(&"remind"));
        assert!(names.contains(&"reminders"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_time_format_help_lists_the_supported_forms() {
        assert!(TIME_FORMAT_HELP.contains("через 30 минут"));
        assert!(TIME_FORMAT_HELP.contains("завтра в 09:30"));
        assert!(TIME_FORMAT_HELP.contains("2024-06-10 14:30"));
    }
}
