//! # Command Variants
//!
//! A command couples a trigger, an access policy, and an execution behavior.
//! The variant set is closed and known at compile time, so behaviors live in
//! an enum rather than an open registry; the config `type` tag selects the
//! constructor.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Reload meta-command
//! - 1.1.0: REST bridge variant
//! - 1.0.0: Static, random, and regex replies

pub mod access;
pub mod rest;
pub mod trigger;

use anyhow::{anyhow, bail, Context as _, Result};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Weak};

use crate::chat::ChatClient;
use crate::dispatch::MessageEvent;
use crate::reload::Reloader;
use access::AccessPolicy;
use rest::RestBridge;
use trigger::{Trigger, TriggerConfig};

/// One command record from the configuration document.
///
/// `options` is an opaque blob parsed by the selected variant's constructor.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub access: AccessPolicy,
    #[serde(default)]
    pub options: Value,
}

/// Variant-specific execution behavior.
#[derive(Debug)]
pub enum Behavior {
    /// Fixed response, optionally wrapped in a prefix and suffix.
    StaticReply {
        response: String,
        prefix: String,
        suffix: String,
    },
    /// One response picked uniformly at random per firing.
    RandomReply {
        responses: Vec<String>,
        prefix: String,
        suffix: String,
    },
    /// Fixed response behind a regex trigger.
    RegexReply { response: String },
    /// Templated HTTP call with a formatted reply.
    RestBridge(RestBridge),
    /// Meta-command that hot-reloads the whole command set.
    Reload { reloader: Weak<Reloader> },
}

/// A fully constructed command: immutable after construction, shared across
/// dispatch tasks behind an `Arc`.
#[derive(Debug)]
pub struct Command {
    name: String,
    kind: String,
    access: AccessPolicy,
    trigger: Trigger,
    behavior: Behavior,
}

#[derive(Debug, Clone, Deserialize)]
struct StaticOptions {
    #[serde(flatten)]
    trigger: TriggerConfig,
    response: String,
    #[serde(default)]
    response_prefix: String,
    #[serde(default)]
    response_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RandomOptions {
    #[serde(flatten)]
    trigger: TriggerConfig,
    responses: Vec<String>,
    #[serde(default)]
    response_prefix: String,
    #[serde(default)]
    response_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RegexOptions {
    trigger_regex: String,
    response: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ReloadOptions {
    trigger: String,
}

impl Command {
    /// Construct a command from its config record.
    ///
    /// Every validation lives here: bad trigger specs, conflicting
    /// allow/deny lists, malformed options, and unknown types are all
    /// construction errors, so matching and execution never see a
    /// half-built command.
    pub fn from_config(config: &CommandConfig, reloader: &Weak<Reloader>) -> Result<Self> {
        config
            .access
            .validate()
            .with_context(|| format!("command '{}'", config.name))?;

        let (trigger, behavior) = match config.kind.as_str() {
            "static" => {
                let options: StaticOptions = parse_options(config)?;
                let trigger = Trigger::from_config(&options.trigger)
                    .with_context(|| format!("command '{}'", config.name))?;
                (
                    trigger,
                    Behavior::StaticReply {
                        response: options.response,
                        prefix: options.response_prefix,
                        suffix: options.response_suffix,
                    },
                )
            }
            "random" => {
                let options: RandomOptions = parse_options(config)?;
                if options.responses.is_empty() {
                    bail!("command '{}': 'responses' must not be empty", config.name);
                }
                let trigger = Trigger::from_config(&options.trigger)
                    .with_context(|| format!("command '{}'", config.name))?;
                (
                    trigger,
                    Behavior::RandomReply {
                        responses: options.responses,
                        prefix: options.response_prefix,
                        suffix: options.response_suffix,
                    },
                )
            }
            "regex" => {
                let options: RegexOptions = parse_options(config)?;
                let trigger = Trigger::from_config(&TriggerConfig {
                    trigger_regex: Some(options.trigger_regex),
                    ..Default::default()
                })
                .with_context(|| format!("command '{}'", config.name))?;
                (trigger, Behavior::RegexReply { response: options.response })
            }
            "rest" => {
                let trigger_fields: TriggerConfig = parse_options(config)?;
                let trigger = Trigger::from_config(&trigger_fields)
                    .with_context(|| format!("command '{}'", config.name))?;
                let bridge = RestBridge::from_options(&config.name, &trigger, &config.options)?;
                (trigger, Behavior::RestBridge(bridge))
            }
            "reload" => {
                let options: ReloadOptions = parse_options(config)?;
                (
                    Trigger::Literal(options.trigger),
                    Behavior::Reload {
                        reloader: reloader.clone(),
                    },
                )
            }
            other => bail!("command '{}' has unknown type '{other}'", config.name),
        };

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind.clone(),
            access: config.access.clone(),
            trigger,
            behavior,
        })
    }

    /// Human-readable name, for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant tag, for logging.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the command may fire in this context. Pure; denial is silent.
    pub fn allowed(&self, channel_id: &str, guild_id: &str, user_id: &str) -> bool {
        self.access.allowed(channel_id, guild_id, user_id)
    }

    /// Whether the message activates this command. Pure and total.
    pub fn matches(&self, text: &str) -> bool {
        self.trigger.matches(text)
    }

    /// Run the command's behavior for a matched event.
    pub async fn execute(&self, event: &MessageEvent, chat: &Arc<dyn ChatClient>) -> Result<()> {
        match &self.behavior {
            Behavior::StaticReply {
                response,
                prefix,
                suffix,
            } => {
                chat.send_text(&event.channel_id, &format!("{prefix}{response}{suffix}"))
                    .await
            }
            Behavior::RandomReply {
                responses,
                prefix,
                suffix,
            } => {
                // Non-empty is guaranteed at construction.
                let pick = responses
                    .choose(&mut rand::rng())
                    .ok_or_else(|| anyhow!("no responses configured"))?;
                chat.send_text(&event.channel_id, &format!("{prefix}{pick}{suffix}"))
                    .await
            }
            Behavior::RegexReply { response } => chat.send_text(&event.channel_id, response).await,
            Behavior::RestBridge(bridge) => bridge.run(event, chat.as_ref()).await,
            Behavior::Reload { reloader } => {
                let reloader = reloader
                    .upgrade()
                    .ok_or_else(|| anyhow!("reload controller is gone"))?;
                match reloader.reload().await {
                    Ok(count) => {
                        chat.send_text(
                            &event.channel_id,
                            &format!("Commands reloaded! Parsed {count} commands."),
                        )
                        .await
                    }
                    Err(e) => {
                        chat.send_text(&event.channel_id, "Failed to reload commands.")
                            .await?;
                        Err(e)
                    }
                }
            }
        }
    }
}

fn parse_options<T: serde::de::DeserializeOwned>(config: &CommandConfig) -> Result<T> {
    serde_json::from_value(config.options.clone())
        .with_context(|| format!("invalid options for command '{}'", config.name))
}
