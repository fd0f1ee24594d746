use chrono::NaiveDateTime;

use super::{Notification, NotificationAuthor, NotificationField};
use crate::domain::price::Quote;
use crate::shared::types::BotConfig;
use crate::shared::utils::{format_price, format_timestamp};

/// Turns a cycle's quotes into a notification. Pure: no I/O, no history access.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    interval_minutes: u64,
    color: u32,
    author: Option<NotificationAuthor>,
}

impl NotificationBuilder {
    pub fn new(interval_minutes: u64, color: u32) -> Self {
        Self {
            interval_minutes,
            color,
            author: None,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            interval_minutes: config.interval_minutes,
            color: config.color,
            author: config.author.as_ref().map(NotificationAuthor::from),
        }
    }

    pub fn with_author(mut self, author: NotificationAuthor) -> Self {
        self.author = Some(author);
        self
    }

    pub fn title(&self) -> String {
        format!("Prices ~ [m{}]", self.interval_minutes)
    }

    /// Fields follow the order of `quotes`
    pub fn build(&self, started_at: NaiveDateTime, quotes: &[Quote]) -> Notification {
        let fields = quotes
            .iter()
            .map(|quote| NotificationField {
                name: quote.sample.pair.key(),
                price: format_price(quote.sample.price),
                delta: quote.delta.clone(),
            })
            .collect();

        Notification {
            title: self.title(),
            timestamp: format_timestamp(started_at),
            color: self.color,
            author: self.author.clone(),
            fields,
        }
    }
}
