//! # Access Gate
//!
//! Allow/deny evaluation restricting where and by whom a command may fire.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{anyhow, Result};
use serde::Deserialize;

/// Per-command access restrictions across the channel, guild, and user axes.
///
/// An empty list means "no restriction" on that side of the axis. Denial is
/// silent: callers send nothing and log nothing when a gate rejects, so
/// restricted commands stay invisible to unauthorized contexts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessPolicy {
    /// Only these channels may use the command, if non-empty.
    #[serde(default)]
    pub channel_allow: Vec<String>,
    /// These channels may not use the command.
    #[serde(default)]
    pub channel_deny: Vec<String>,
    /// Only these guilds may use the command, if non-empty.
    #[serde(default)]
    pub guild_allow: Vec<String>,
    /// These guilds may not use the command.
    #[serde(default)]
    pub guild_deny: Vec<String>,
    /// Only these users may use the command, if non-empty.
    #[serde(default)]
    pub user_allow: Vec<String>,
    /// These users may not use the command.
    #[serde(default)]
    pub user_deny: Vec<String>,
}

fn list_contains(list: &[String], id: &str) -> bool {
    list.iter().any(|entry| entry == id)
}

impl AccessPolicy {
    /// Reject policies that populate both the allow and deny list on the
    /// same axis. A populated allow-list is already the authoritative
    /// positive filter; a deny-list next to it can only contradict it.
    pub fn validate(&self) -> Result<()> {
        let axes = [
            ("channel", &self.channel_allow, &self.channel_deny),
            ("guild", &self.guild_allow, &self.guild_deny),
            ("user", &self.user_allow, &self.user_deny),
        ];
        for (axis, allow, deny) in axes {
            if !allow.is_empty() && !deny.is_empty() {
                return Err(anyhow!(
                    "cannot set both an allow-list and a deny-list on the {axis} axis"
                ));
            }
        }
        Ok(())
    }

    /// Evaluate the gate for one message context.
    ///
    /// Axes are checked in fixed order (channel, guild, user), allow before
    /// deny, short-circuiting on the first failure. Allow-first means an
    /// empty allow-list is "no restriction" rather than "deny all".
    pub fn allowed(&self, channel_id: &str, guild_id: &str, user_id: &str) -> bool {
        if !self.channel_allow.is_empty() && !list_contains(&self.channel_allow, channel_id) {
            return false;
        }
        if !self.channel_deny.is_empty() && list_contains(&self.channel_deny, channel_id) {
            return false;
        }
        if !self.guild_allow.is_empty() && !list_contains(&self.guild_allow, guild_id) {
            return false;
        }
        if !self.guild_deny.is_empty() && list_contains(&self.guild_deny, guild_id) {
            return false;
        }
        if !self.user_allow.is_empty() && !list_contains(&self.user_allow, user_id) {
            return false;
        }
        if !self.user_deny.is_empty() && list_contains(&self.user_deny, user_id) {
            return false;
        }
        true
    }
}
