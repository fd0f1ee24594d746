//! Tickerbot - periodic crypto price updates for Discord
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::Scheduler;
pub use domain::notification::{Notification, NotificationBuilder};
pub use domain::price::PriceHistory;
pub use infrastructure::{BinanceClient, ChatSession, PriceSource};
pub use shared::config::ConfigLoader;
