//! Discord delivery - gateway presence, REST messages and a console stand-in

pub mod console;
pub mod payloads;
pub mod session;

pub use console::ConsoleSession;
pub use session::DiscordSession;

use async_trait::async_trait;
use crate::domain::notification::Notification;
use crate::shared::errors::DispatchError;
use crate::shared::types::Presence;

/// Connected chat session the scheduler talks to
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Set the activity text shown under the bot name
    async fn set_presence(&self, presence: &Presence) -> Result<(), DispatchError>;

    /// Post a notification to a channel
    async fn send(&self, channel_id: u64, notification: &Notification) -> Result<(), DispatchError>;
}
