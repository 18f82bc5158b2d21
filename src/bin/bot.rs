use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;

use pomni::commands::handlers::RemindHandler;
use pomni::commands::{register_global_commands, CommandContext, CommandRegistry};
use pomni::core::Config;
use pomni::database::Database;
use pomni::features::reminders::{
    DirectMessages, ReminderScheduler, ReminderService, ReminderStore,
};

struct Handler {
    registry: CommandRegistry,
    context: Arc<CommandContext>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("🤖 Bot ID: {}", ready.user.id);

        if let Err(err) = register_global_commands(&ctx).await {
            error!("Failed to register slash commands: {err:#}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::ApplicationCommand(command) = interaction {
            let name = command.data.name.clone();
            let Some(handler) = self.registry.get(&name) else {
                return;
            };
            if let Err(err) = handler
                .handle(Arc::clone(&self.context), &ctx, &command)
                .await
            {
                error!("Command /{name} failed: {err:#}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminder bot...");

    let database = Database::open(&config.database_path)?;
    let store: Arc<dyn ReminderStore> = Arc::new(database);
    let service = ReminderService::new(Arc::clone(&store));

    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(RemindHandler));
    let handler = Handler {
        registry,
        context: Arc::new(CommandContext::new(service)),
    };

    // Slash commands and outgoing DMs need no privileged gateway intents
    let intents = GatewayIntents::empty();
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    // Reminders are delivered over the recipient's DM channel
    let delivery = Arc::new(DirectMessages::new(client.cache_and_http.http.clone()));
    let scheduler = Arc::new(ReminderScheduler::new(store, delivery));
    scheduler.start(config.poll_interval);

    info!("Establishing WebSocket connection to Discord gateway...");
    let result = client.start().await;

    scheduler.stop();
    result?;
    Ok(())
}
