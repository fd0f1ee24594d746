//! Notification domain - the message posted after every cycle

mod builder;

pub use builder::NotificationBuilder;

use crate::domain::price::DeltaDisplay;
use crate::shared::types::AuthorConfig;
use serde::Serialize;

/// One line of the notification, one per symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationField {
    /// Uppercase symbol, e.g. "BTCUSDT"
    pub name: String,
    /// Price with 2 decimals, without currency prefix
    pub price: String,
    #[serde(serialize_with = "serialize_display")]
    pub delta: DeltaDisplay,
}

impl NotificationField {
    /// "$51000.00 ~ [+2.00%]"
    pub fn value(&self) -> String {
        format!("${} ~ [{}]", self.price, self.delta)
    }
}

/// Price update for a single cycle. Built once and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub timestamp: String,
    pub color: u32,
    pub author: Option<NotificationAuthor>,
    pub fields: Vec<NotificationField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

impl From<&AuthorConfig> for NotificationAuthor {
    fn from(author: &AuthorConfig) -> Self {
        Self {
            name: author.name.clone(),
            icon_url: author.icon_url.clone(),
        }
    }
}

impl Notification {
    /// Plain text rendering used by the console session and logs
    pub fn render_text(&self) -> String {
        let mut lines = vec![self.title.clone(), self.timestamp.clone()];
        lines.extend(
            self.fields
                .iter()
                .map(|field| format!("{}: {}", field.name, field.value())),
        );
        lines.join("\n")
    }
}

fn serialize_display<S: serde::Serializer>(
    delta: &DeltaDisplay,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(delta)
}
