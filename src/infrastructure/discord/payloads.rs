//! Discord gateway frames and REST bodies

use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::notification::Notification;
use crate::shared::types::Presence;

pub const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
pub const API_BASE: &str = "https://discord.com/api/v10";

pub mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const PRESENCE_UPDATE: u8 = 3;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Any frame received from the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayFrame {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    pub s: Option<u64>,
    pub t: Option<String>,
}

impl GatewayFrame {
    pub fn heartbeat_interval_ms(&self) -> Option<u64> {
        self.d.get("heartbeat_interval").and_then(Value::as_u64)
    }

    pub fn is_ready(&self) -> bool {
        self.op == op::DISPATCH && self.t.as_deref() == Some("READY")
    }
}

pub fn identify(token: &str) -> Value {
    json!({
        "op": op::IDENTIFY,
        "d": {
            "token": token,
            // no privileged or message intents, the bot only posts
            "intents": 0,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "tickerbot",
                "device": "tickerbot",
            },
        },
    })
}

pub fn heartbeat(last_sequence: Option<u64>) -> Value {
    json!({ "op": op::HEARTBEAT, "d": last_sequence })
}

pub fn presence_update(presence: &Presence) -> Value {
    json!({
        "op": op::PRESENCE_UPDATE,
        "d": {
            "since": null,
            "activities": [{ "name": presence.text, "type": presence.kind.code() }],
            "status": "online",
            "afk": false,
        },
    })
}

pub fn embed(notification: &Notification) -> Value {
    let fields: Vec<Value> = notification
        .fields
        .iter()
        .map(|field| json!({ "name": field.name, "value": field.value(), "inline": false }))
        .collect();

    let mut embed = json!({
        "title": notification.title,
        "description": notification.timestamp,
        "color": notification.color,
        "fields": fields,
    });
    if let Some(author) = &notification.author {
        let mut author_json = json!({ "name": author.name });
        if let Some(icon_url) = &author.icon_url {
            author_json["icon_url"] = json!(icon_url);
        }
        embed["author"] = author_json;
    }
    embed
}

/// Body of POST /channels/{id}/messages
pub fn message_body(notification: &Notification) -> Value {
    json!({ "embeds": [embed(notification)] })
}
