use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::{Activity, Ready};
use serenity::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

use reflex::{BotConfig, MessageBus, MessageEvent, Reloader, SerenityChat};

struct Handler {
    bus: Arc<MessageBus>,
    status: Option<String>,
}

impl Handler {
    fn to_event(msg: &Message) -> MessageEvent {
        MessageEvent {
            content: msg.content.clone(),
            author_id: msg.author.id.0.to_string(),
            author_is_bot: msg.author.bot,
            channel_id: msg.channel_id.0.to_string(),
            guild_id: msg.guild_id.map(|g| g.0.to_string()),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        self.bus.publish(Arc::new(Self::to_event(&msg))).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Bot logged in as {}#{:04}", ready.user.name, ready.user.discriminator);
        info!("Connected to {} guilds", ready.guilds.len());
        if let Some(status) = &self.status {
            ctx.set_activity(Activity::playing(status)).await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = PathBuf::from(
        std::env::var("REFLEX_CONFIG").unwrap_or_else(|_| "reflex.json".to_string()),
    );
    let config = BotConfig::load(&config_path)?;
    info!("Loaded config from {}", config_path.display());

    let bus = Arc::new(MessageBus::new());
    let handler = Handler {
        bus: Arc::clone(&bus),
        status: config.status.clone(),
    };

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.bot_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("client creation failed: {}", e)
        })?;

    // The reloader owns the live command set; the initial install is just
    // the first swap.
    let chat = Arc::new(SerenityChat::new(client.cache_and_http.http.clone()));
    let reloader = Reloader::new(config_path, bus, chat);
    let count = reloader.install(&config.commands).await?;
    info!("Installed {count} commands. Connecting to gateway...");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!("failed to establish gateway connection: {}", why));
    }

    Ok(())
}
