use async_trait::async_trait;
use tracing::{debug, info};

use super::ChatSession;
use crate::domain::notification::Notification;
use crate::shared::errors::DispatchError;
use crate::shared::types::Presence;

/// Dry-run session: writes everything to the log instead of Discord
#[derive(Debug, Default)]
pub struct ConsoleSession;

#[async_trait]
impl ChatSession for ConsoleSession {
    async fn set_presence(&self, presence: &Presence) -> Result<(), DispatchError> {
        info!("Presence: {:?} {}", presence.kind, presence.text);
        Ok(())
    }

    async fn send(&self, channel_id: u64, notification: &Notification) -> Result<(), DispatchError> {
        info!("📨 Channel {}:\n{}", channel_id, notification.render_text());
        if let Ok(json) = serde_json::to_string(notification) {
            debug!("Notification: {}", json);
        }
        Ok(())
    }
}
