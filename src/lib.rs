// Core layer - configuration
pub mod core;

// Platform boundary - outbound chat client
pub mod chat;

// Command layer - variants, triggers, access gating
pub mod commands;

// Dispatch layer - per-event fan-out and the subscription bus
pub mod dispatch;

// HTTP transport with response caching for the REST bridge
pub mod http_cache;

// Hot reload of the live command set
pub mod reload;

// Re-export the types bootstrap needs
pub use chat::{ChatClient, EmbedSpec, SerenityChat};
pub use commands::{Command, CommandConfig};
pub use crate::core::BotConfig;
pub use dispatch::bus::MessageBus;
pub use dispatch::{Dispatcher, MessageEvent};
pub use reload::Reloader;
