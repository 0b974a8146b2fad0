//! # Trigger Matching
//!
//! Decides whether an inbound message activates a command.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::Deserialize;

/// The condition under which a command fires.
///
/// Exactly one trigger kind exists per command; the ambiguity of "which
/// config field is set" is resolved once, at construction, so matching
/// itself is a total function.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Fires on exact equality with one string.
    Literal(String),
    /// Fires on exact equality with any member of the set.
    LiteralSet(Vec<String>),
    /// Fires when the compiled pattern matches anywhere in the message.
    Pattern(Regex),
}

/// Raw trigger fields as they appear in command options.
///
/// Commands embed this with `#[serde(flatten)]` so every variant shares the
/// same trigger vocabulary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerConfig {
    /// Message that triggers the command.
    #[serde(default)]
    pub trigger: Option<String>,
    /// List of messages, any of which triggers the command.
    #[serde(default)]
    pub triggers: Option<Vec<String>>,
    /// Regular expression that triggers the command.
    #[serde(default)]
    pub trigger_regex: Option<String>,
}

impl Trigger {
    /// Build a trigger from config fields.
    ///
    /// Exactly one of `trigger`, `triggers`, `trigger_regex` must be set;
    /// zero or more than one is a configuration error.
    pub fn from_config(config: &TriggerConfig) -> Result<Self> {
        let mut candidates = Vec::new();
        if let Some(literal) = &config.trigger {
            candidates.push(Trigger::Literal(literal.clone()));
        }
        if let Some(set) = &config.triggers {
            candidates.push(Trigger::LiteralSet(set.clone()));
        }
        if let Some(pattern) = &config.trigger_regex {
            let regex = Regex::new(pattern)
                .map_err(|e| anyhow!("invalid trigger regex '{pattern}': {e}"))?;
            candidates.push(Trigger::Pattern(regex));
        }
        match candidates.len() {
            0 => Err(anyhow!(
                "no trigger configured: one of 'trigger', 'triggers', 'trigger_regex' is required"
            )),
            1 => Ok(candidates.remove(0)),
            _ => Err(anyhow!(
                "ambiguous trigger: only one of 'trigger', 'triggers', 'trigger_regex' may be set"
            )),
        }
    }

    /// Check whether the message activates this trigger.
    ///
    /// Pure and total: no trimming, case-sensitive, regex is unanchored
    /// unless the pattern anchors itself.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Trigger::Literal(literal) => text == literal,
            Trigger::LiteralSet(set) => set.iter().any(|t| text == t),
            Trigger::Pattern(regex) => regex.is_match(text),
        }
    }

    /// The compiled pattern, if this is a regex trigger.
    pub fn pattern(&self) -> Option<&Regex> {
        match self {
            Trigger::Pattern(regex) => Some(regex),
            _ => None,
        }
    }
}
