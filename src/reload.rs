//! # Reload Controller
//!
//! Hot-reloads the command set: re-reads the configuration, builds a fresh
//! dispatcher, and swaps it in without stopping the process. Failures leave
//! the previously active command set untouched.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.2.0

use anyhow::{Context as _, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chat::ChatClient;
use crate::commands::CommandConfig;
use crate::core::BotConfig;
use crate::dispatch::bus::{MessageBus, SubscriptionId};
use crate::dispatch::Dispatcher;

/// Owns the swap between live dispatchers.
///
/// The new dispatcher subscribes before the old one detaches, so dispatch
/// never goes dark during a reload. The cost is a brief window in which one
/// event can be dispatched by both sets; see [`MessageBus`].
pub struct Reloader {
    config_path: PathBuf,
    bus: Arc<MessageBus>,
    chat: Arc<dyn ChatClient>,
    active: Mutex<Option<SubscriptionId>>,
}

impl Reloader {
    pub fn new(config_path: PathBuf, bus: Arc<MessageBus>, chat: Arc<dyn ChatClient>) -> Arc<Self> {
        Arc::new(Self {
            config_path,
            bus,
            chat,
            active: Mutex::new(None),
        })
    }

    /// Install the initial command set at startup.
    pub async fn install(self: &Arc<Self>, configs: &[CommandConfig]) -> Result<usize> {
        let dispatcher =
            Dispatcher::from_config(configs, Arc::clone(&self.chat), &Arc::downgrade(self))?;
        Ok(self.swap(Arc::new(dispatcher)).await)
    }

    /// Re-read the configuration and replace the live command set.
    ///
    /// Returns the number of parsed commands. If loading or construction
    /// fails at any step, the old dispatcher stays subscribed and the error
    /// is reported to the caller.
    pub async fn reload(self: &Arc<Self>) -> Result<usize> {
        let config = BotConfig::load(&self.config_path)
            .with_context(|| format!("reload from {} failed", self.config_path.display()))?;
        let dispatcher = Dispatcher::from_config(
            &config.commands,
            Arc::clone(&self.chat),
            &Arc::downgrade(self),
        )
        .context("reload aborted, previous command set stays active")?;
        let count = self.swap(Arc::new(dispatcher)).await;
        info!("Reloaded command set, parsed {count} commands");
        Ok(count)
    }

    /// Subscribe the new dispatcher, then detach the old one.
    async fn swap(&self, dispatcher: Arc<Dispatcher>) -> usize {
        let count = dispatcher.len();
        let new_id = self.bus.subscribe(dispatcher).await;
        let old = self.active.lock().await.replace(new_id);
        if let Some(old_id) = old {
            if !self.bus.unsubscribe(old_id).await {
                warn!("stale subscription {old_id} was already detached");
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::RecordingChat;
    use crate::dispatch::MessageEvent;
    use serde_json::json;
    use std::time::Duration;

    fn write_config(commands: serde_json::Value) -> PathBuf {
        let path = std::env::temp_dir().join(format!("reflex-test-{}.json", uuid::Uuid::new_v4()));
        let config = json!({ "bot_token": "t", "commands": commands });
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        path
    }

    fn static_command(name: &str, trigger: &str, response: &str) -> serde_json::Value {
        json!({
            "name": name, "type": "static",
            "options": { "trigger": trigger, "response": response }
        })
    }

    fn event(content: &str) -> Arc<MessageEvent> {
        Arc::new(MessageEvent {
            content: content.to_string(),
            author_id: "u1".to_string(),
            author_is_bot: false,
            channel_id: "c1".to_string(),
            guild_id: Some("g1".to_string()),
        })
    }

    async fn wait_for_sends(chat: &RecordingChat, count: usize) {
        for _ in 0..100 {
            if chat.sent_texts().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} sends, got {:?}", chat.sent_texts());
    }

    #[tokio::test]
    async fn reload_swaps_in_the_new_command_set() {
        let recorder = RecordingChat::new();
        let bus = Arc::new(MessageBus::new());
        let path = write_config(json!([static_command("new", "!new", "after reload")]));
        let reloader = Reloader::new(path.clone(), Arc::clone(&bus), recorder.clone());

        let initial: Vec<CommandConfig> =
            serde_json::from_value(json!([static_command("old", "!old", "before reload")]))
                .unwrap();
        assert_eq!(reloader.install(&initial).await.unwrap(), 1);

        let count = reloader.reload().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(bus.subscriber_count().await, 1);

        // Old trigger is gone, new trigger is live.
        bus.publish(event("!old")).await;
        bus.publish(event("!new")).await;
        wait_for_sends(&recorder, 1).await;
        assert_eq!(
            recorder.sent_texts(),
            vec![("c1".to_string(), "after reload".to_string())]
        );

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn failed_reload_keeps_the_old_set_active() {
        let recorder = RecordingChat::new();
        let bus = Arc::new(MessageBus::new());
        let missing = std::env::temp_dir().join("reflex-test-does-not-exist.json");
        let reloader = Reloader::new(missing, Arc::clone(&bus), recorder.clone());

        let initial: Vec<CommandConfig> =
            serde_json::from_value(json!([static_command("old", "!old", "still alive")])).unwrap();
        reloader.install(&initial).await.unwrap();

        let err = reloader.reload().await.unwrap_err();
        assert!(format!("{err:#}").contains("reload from"));
        assert_eq!(bus.subscriber_count().await, 1);

        bus.publish(event("!old")).await;
        wait_for_sends(&recorder, 1).await;
        assert_eq!(
            recorder.sent_texts(),
            vec![("c1".to_string(), "still alive".to_string())]
        );
    }

    #[tokio::test]
    async fn reload_with_bad_command_record_keeps_the_old_set() {
        let recorder = RecordingChat::new();
        let bus = Arc::new(MessageBus::new());
        let path = write_config(json!([
            { "name": "broken", "type": "rest", "options": {} }
        ]));
        let reloader = Reloader::new(path.clone(), Arc::clone(&bus), recorder.clone());

        let initial: Vec<CommandConfig> =
            serde_json::from_value(json!([static_command("old", "!old", "still alive")])).unwrap();
        reloader.install(&initial).await.unwrap();

        assert!(reloader.reload().await.is_err());
        assert_eq!(bus.subscriber_count().await, 1);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn reload_command_fired_through_dispatch_confirms_in_channel() {
        let recorder = RecordingChat::new();
        let bus = Arc::new(MessageBus::new());
        let path = write_config(json!([
            static_command("greet", "!hi", "hello"),
            { "name": "reload", "type": "reload", "options": { "trigger": "!reload" } }
        ]));
        let reloader = Reloader::new(path.clone(), Arc::clone(&bus), recorder.clone());

        let initial: Vec<CommandConfig> = serde_json::from_value(json!([
            { "name": "reload", "type": "reload", "options": { "trigger": "!reload" } }
        ]))
        .unwrap();
        reloader.install(&initial).await.unwrap();

        bus.publish(event("!reload")).await;
        wait_for_sends(&recorder, 1).await;
        assert_eq!(
            recorder.sent_texts(),
            vec![("c1".to_string(), "Commands reloaded! Parsed 2 commands.".to_string())]
        );
        assert_eq!(bus.subscriber_count().await, 1);

        std::fs::remove_file(path).ok();
    }
}
