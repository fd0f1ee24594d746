//! Discord bot session: gateway connection for presence, REST for messages

use async_trait::async_trait;
use futures_util::{stream::SplitSink, stream::SplitStream, SinkExt, Stream, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::payloads::{self, op, GatewayFrame};
use super::ChatSession;
use crate::domain::notification::Notification;
use crate::shared::errors::DispatchError;
use crate::shared::types::Presence;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn gateway_error(e: impl std::fmt::Display) -> DispatchError {
    DispatchError::Gateway(e.to_string())
}

/// Logged-in Discord bot.
///
/// `connect` returns once the gateway reports READY; a background task then keeps the
/// connection alive with heartbeats and forwards presence updates.
pub struct DiscordSession {
    http_client: Client,
    token: String,
    api_base: String,
    username: String,
    outgoing: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
}

impl DiscordSession {
    pub async fn connect(token: &str) -> Result<Self, DispatchError> {
        Self::connect_to(token, payloads::GATEWAY_URL, payloads::API_BASE).await
    }

    pub async fn connect_to(token: &str, gateway_url: &str, api_base: &str) -> Result<Self, DispatchError> {
        info!("🔌 Connecting to Discord gateway...");
        let (ws, _response) = connect_async(gateway_url).await.map_err(gateway_error)?;
        let (mut writer, mut reader) = ws.split();

        let hello = next_frame(&mut reader).await?;
        let heartbeat_ms = match (hello.op, hello.heartbeat_interval_ms()) {
            (op::HELLO, Some(0)) => {
                return Err(DispatchError::Gateway("HELLO with zero heartbeat interval".to_string()))
            }
            (op::HELLO, Some(ms)) => ms,
            _ => return Err(DispatchError::Gateway(format!("expected HELLO, got op {}", hello.op))),
        };

        send_frame(&mut writer, &payloads::identify(token)).await?;

        let mut last_sequence = None;
        let username = loop {
            let frame = next_frame(&mut reader).await?;
            if frame.s.is_some() {
                last_sequence = frame.s;
            }
            if frame.is_ready() {
                break frame
                    .d
                    .pointer("/user/username")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
            }
            match frame.op {
                op::HEARTBEAT => send_frame(&mut writer, &payloads::heartbeat(last_sequence)).await?,
                op::INVALID_SESSION => {
                    return Err(DispatchError::Gateway(
                        "session rejected, check the bot token".to_string(),
                    ))
                }
                _ => {}
            }
        };
        info!("✅ Logged in to Discord as {}", username);

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));
        tokio::spawn(keep_alive(
            writer,
            reader,
            outgoing_rx,
            Duration::from_millis(heartbeat_ms),
            last_sequence,
            Arc::clone(&connected),
        ));

        let http_client = Client::builder()
            .user_agent(concat!("DiscordBot (tickerbot, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()?;

        Ok(Self {
            http_client,
            token: token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            username,
            outgoing,
            connected,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatSession for DiscordSession {
    async fn set_presence(&self, presence: &Presence) -> Result<(), DispatchError> {
        if !self.is_connected() {
            return Err(DispatchError::Gateway("gateway connection closed".to_string()));
        }
        self.outgoing
            .send(payloads::presence_update(presence).to_string())
            .map_err(|_| DispatchError::Gateway("gateway connection closed".to_string()))?;
        info!("Presence set: {:?} {}", presence.kind, presence.text);
        Ok(())
    }

    async fn send(&self, channel_id: u64, notification: &Notification) -> Result<(), DispatchError> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(&payloads::message_body(notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!("Notification delivered to channel {}", channel_id);
        Ok(())
    }
}

async fn send_frame(
    writer: &mut SplitSink<WsStream, Message>,
    frame: &Value,
) -> Result<(), DispatchError> {
    writer
        .send(Message::Text(frame.to_string().into()))
        .await
        .map_err(gateway_error)
}

/// Next JSON frame, skipping control messages
async fn next_frame<S>(reader: &mut S) -> Result<GatewayFrame, DispatchError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str()).map_err(gateway_error);
            }
            Some(Ok(Message::Close(frame))) => {
                let detail = match frame {
                    Some(cf) => format!("code={} reason={}", u16::from(cf.code), cf.reason.as_str()),
                    None => "no close frame".to_string(),
                };
                return Err(DispatchError::Gateway(format!("connection closed: {}", detail)));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(gateway_error(e)),
            None => return Err(DispatchError::Gateway("connection closed".to_string())),
        }
    }
}

async fn keep_alive(
    mut writer: SplitSink<WsStream, Message>,
    mut reader: SplitStream<WsStream>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    heartbeat_interval: Duration,
    mut last_sequence: Option<u64>,
    connected: Arc<AtomicBool>,
) {
    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    heartbeat.tick().await; // arm

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if let Err(e) = send_frame(&mut writer, &payloads::heartbeat(last_sequence)).await {
                    error!("❌ Heartbeat failed: {}", e);
                    break;
                }
            }
            frame = outgoing.recv() => {
                let Some(text) = frame else {
                    // session dropped
                    let _ = writer.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = writer.send(Message::Text(text.into())).await {
                    error!("❌ Gateway send failed: {}", e);
                    break;
                }
            }
            incoming = next_frame(&mut reader) => {
                let frame = match incoming {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("⚠️ Gateway closed: {}", e);
                        break;
                    }
                };
                if frame.s.is_some() {
                    last_sequence = frame.s;
                }
                match frame.op {
                    op::HEARTBEAT => {
                        if send_frame(&mut writer, &payloads::heartbeat(last_sequence)).await.is_err() {
                            break;
                        }
                    }
                    op::RECONNECT | op::INVALID_SESSION => {
                        warn!("⚠️ Gateway asked to reconnect (op {}), presence updates are no longer delivered", frame.op);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
}
