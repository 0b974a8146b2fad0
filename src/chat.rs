//! # Chat Client Boundary
//!
//! The engine talks to the chat platform only through [`ChatClient`], so
//! command execution and dispatch stay testable without a live gateway.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use std::sync::Arc;

/// A rich-embed payload, the subset of the platform's embed surface the
/// engine needs.
#[derive(Debug, Clone, Default)]
pub struct EmbedSpec {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

/// Outbound side of the chat platform.
///
/// All methods are fallible and must be safe for concurrent use by many
/// dispatch tasks.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a plain text message to a channel.
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()>;

    /// Upload a file to a channel.
    async fn send_file(&self, channel_id: &str, filename: &str, bytes: &[u8]) -> Result<()>;

    /// Send a rich embed to a channel.
    async fn send_embed(&self, channel_id: &str, embed: &EmbedSpec) -> Result<()>;
}

/// [`ChatClient`] backed by the serenity HTTP client.
pub struct SerenityChat {
    http: Arc<Http>,
}

impl SerenityChat {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn parse_channel(channel_id: &str) -> Result<ChannelId> {
        let id: u64 = channel_id
            .parse()
            .with_context(|| format!("invalid channel id '{channel_id}'"))?;
        Ok(ChannelId(id))
    }
}

#[async_trait]
impl ChatClient for SerenityChat {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()> {
        let channel = Self::parse_channel(channel_id)?;
        channel
            .say(&self.http, text)
            .await
            .with_context(|| format!("failed to send message to channel {channel_id}"))?;
        Ok(())
    }

    async fn send_file(&self, channel_id: &str, filename: &str, bytes: &[u8]) -> Result<()> {
        let channel = Self::parse_channel(channel_id)?;
        channel
            .send_files(&self.http, vec![(bytes, filename)], |m| m)
            .await
            .with_context(|| format!("failed to upload {filename} to channel {channel_id}"))?;
        Ok(())
    }

    async fn send_embed(&self, channel_id: &str, embed: &EmbedSpec) -> Result<()> {
        let channel = Self::parse_channel(channel_id)?;
        let spec = embed.clone();
        channel
            .send_message(&self.http, |m| {
                m.embed(|e| {
                    if let Some(title) = &spec.title {
                        e.title(title);
                    }
                    if let Some(description) = &spec.description {
                        e.description(description);
                    }
                    if let Some(url) = &spec.url {
                        e.url(url);
                    }
                    if let Some(image_url) = &spec.image_url {
                        e.image(image_url);
                    }
                    e
                })
            })
            .await
            .with_context(|| format!("failed to send embed to channel {channel_id}"))?;
        Ok(())
    }
}
