//! # Dispatcher
//!
//! Fans each inbound message out to every registered command concurrently.
//! Commands are independent: one command's failure never affects another's
//! evaluation or execution for the same event.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod bus;

use anyhow::Result;
use log::{error, info};
use std::sync::{Arc, Weak};

use crate::chat::ChatClient;
use crate::commands::{Command, CommandConfig};
use crate::reload::Reloader;

/// Ephemeral context for one inbound message. Created per event, owned by
/// that event's dispatch, discarded afterwards.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub content: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub channel_id: String,
    /// Empty for direct messages, which the dispatcher discards.
    pub guild_id: Option<String>,
}

/// The live command set plus the outbound chat client.
///
/// Immutable after construction; the reload controller replaces whole
/// dispatchers rather than mutating one in place, so dispatch needs no
/// locks.
pub struct Dispatcher {
    commands: Vec<Arc<Command>>,
    chat: Arc<dyn ChatClient>,
}

impl Dispatcher {
    /// Build the full command set from configuration.
    ///
    /// Fail-fast: any bad command record aborts the whole load. A partially
    /// loaded command set would be worse than a clear startup failure.
    pub fn from_config(
        configs: &[CommandConfig],
        chat: Arc<dyn ChatClient>,
        reloader: &Weak<Reloader>,
    ) -> Result<Self> {
        let mut commands = Vec::with_capacity(configs.len());
        for config in configs {
            commands.push(Arc::new(Command::from_config(config, reloader)?));
        }
        info!("Parsed {} commands", commands.len());
        Ok(Self { commands, chat })
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Fan one event out to every command.
    ///
    /// Bot-authored messages and direct messages are discarded up front.
    /// Each command runs in its own task; completion order across commands
    /// is arbitrary and failures are logged, never propagated.
    pub fn dispatch(&self, event: Arc<MessageEvent>) {
        if event.author_is_bot {
            return;
        }
        let Some(guild_id) = event.guild_id.clone() else {
            return;
        };
        for command in &self.commands {
            let command = Arc::clone(command);
            let event = Arc::clone(&event);
            let chat = Arc::clone(&self.chat);
            let guild_id = guild_id.clone();
            tokio::spawn(async move {
                if !command.allowed(&event.channel_id, &guild_id, &event.author_id) {
                    return;
                }
                if !command.matches(&event.content) {
                    return;
                }
                info!(
                    "command fired command={} type={} userID={} channelID={} guildID={guild_id} text={:?}",
                    command.name(),
                    command.kind(),
                    event.author_id,
                    event.channel_id,
                    event.content
                );
                if let Err(e) = command.execute(&event, &chat).await {
                    error!(
                        "command failed command={} type={} userID={} channelID={} guildID={guild_id} text={:?} error={e:#}",
                        command.name(),
                        command.kind(),
                        event.author_id,
                        event.channel_id,
                        event.content
                    );
                }
            });
        }
    }
}
