//! Infrastructure layer - price API and chat clients

pub mod discord;
pub mod price_api;

pub use discord::{ChatSession, ConsoleSession, DiscordSession};
pub use price_api::{BinanceClient, PriceSource};
