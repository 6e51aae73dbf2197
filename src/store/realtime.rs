//! Phoenix channel client for the store's realtime change stream.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::{ChangeEvent, ChangeFeed, ChangeKind, StoreConfig, StoreError, Subscription};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const BASE_RECONNECT_DELAY: Duration = Duration::from_millis(500);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
const JOIN_REF: &str = "1";

#[derive(Debug, Clone)]
pub struct RealtimeFeed {
    url: Url,
    topic: String,
    table: String,
    access_token: String,
}

impl RealtimeFeed {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        Ok(Self {
            url: config.realtime_endpoint()?,
            topic: format!("realtime:public:{}", config.table),
            table: config.table.clone(),
            access_token: config.anon_key.clone(),
        })
    }

    fn join_message(&self) -> String {
        json!({
            "topic": self.topic,
            "event": "phx_join",
            "payload": {
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": "*", "schema": "public", "table": self.table }
                    ]
                },
                "access_token": self.access_token
            },
            "ref": JOIN_REF,
            "join_ref": JOIN_REF
        })
        .to_string()
    }
}

impl ChangeFeed for RealtimeFeed {
    fn subscribe_changes(&self, sink: mpsc::UnboundedSender<ChangeEvent>) -> Subscription {
        let feed = self.clone();
        Subscription::new(tokio::spawn(async move {
            connection_loop(feed, sink).await;
        }))
    }
}

async fn connection_loop(feed: RealtimeFeed, sink: mpsc::UnboundedSender<ChangeEvent>) {
    let mut attempt: u32 = 0;

    while !sink.is_closed() {
        match try_connect(&feed, &sink, attempt > 0).await {
            Ok(()) => {
                debug!("realtime listener stopped");
                break;
            }
            Err(SessionEnd { joined, reason }) => {
                if joined {
                    attempt = 0;
                }
                attempt += 1;
                let delay = BASE_RECONNECT_DELAY
                    .saturating_mul(2u32.saturating_pow(attempt.min(6)))
                    .min(MAX_RECONNECT_DELAY);
                warn!(attempt, ?delay, "realtime connection lost: {reason}");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

struct SessionEnd {
    joined: bool,
    reason: String,
}

impl SessionEnd {
    fn before_join(reason: impl Into<String>) -> Self {
        Self {
            joined: false,
            reason: reason.into(),
        }
    }

    fn after_join(reason: impl Into<String>) -> Self {
        Self {
            joined: true,
            reason: reason.into(),
        }
    }
}

/// One socket session. `Ok` means the receiving side went away.
async fn try_connect(
    feed: &RealtimeFeed,
    sink: &mpsc::UnboundedSender<ChangeEvent>,
    resync: bool,
) -> Result<(), SessionEnd> {
    let (socket, _) = connect_async(feed.url.as_str())
        .await
        .map_err(|err| SessionEnd::before_join(format!("connect: {err}")))?;
    let (mut write, mut read) = socket.split();

    write
        .send(Message::Text(feed.join_message()))
        .await
        .map_err(|err| SessionEnd::before_join(format!("send join: {err}")))?;
    info!(topic = %feed.topic, "joined realtime channel");

    // Events may have been missed while disconnected.
    if resync
        && sink
            .send(ChangeEvent {
                kind: ChangeKind::Update,
                task_id: None,
            })
            .is_err()
    {
        return Ok(());
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut heartbeat_ref: u64 = 1;

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                        Frame::Change(event) => {
                            if sink.send(event).is_err() {
                                return Ok(());
                            }
                        }
                        Frame::ChannelClosed(reason) => {
                            return Err(SessionEnd::after_join(reason));
                        }
                        Frame::Ignored => {}
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(SessionEnd::after_join("connection closed by server"));
                    }
                    Some(Err(err)) => {
                        return Err(SessionEnd::after_join(format!("read: {err}")));
                    }
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                heartbeat_ref += 1;
                if let Err(err) = write.send(Message::Text(heartbeat_message(heartbeat_ref))).await {
                    return Err(SessionEnd::after_join(format!("heartbeat: {err}")));
                }
            }
            () = sink.closed() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
        }
    }
}

fn heartbeat_message(reference: u64) -> String {
    json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": reference.to_string()
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
struct PhoenixFrame {
    #[serde(default)]
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Change(ChangeEvent),
    ChannelClosed(String),
    Ignored,
}

fn parse_frame(text: &str) -> Frame {
    let frame: PhoenixFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            debug!("ignoring unparseable realtime frame: {err}");
            return Frame::Ignored;
        }
    };

    match frame.event.as_str() {
        "postgres_changes" => {
            let data = &frame.payload["data"];
            change_from(data["type"].as_str(), data).map_or(Frame::Ignored, Frame::Change)
        }
        "INSERT" | "UPDATE" | "DELETE" => {
            change_from(Some(frame.event.as_str()), &frame.payload)
                .map_or(Frame::Ignored, Frame::Change)
        }
        "phx_reply" => {
            let status = frame.payload["status"].as_str().unwrap_or_default();
            if status != "ok" {
                warn!(status, response = %frame.payload["response"], "realtime reply was not ok");
            }
            Frame::Ignored
        }
        "phx_error" => Frame::ChannelClosed("channel error".to_string()),
        "phx_close" => Frame::ChannelClosed("channel closed".to_string()),
        _ => Frame::Ignored,
    }
}

fn change_from(kind: Option<&str>, data: &Value) -> Option<ChangeEvent> {
    let kind = ChangeKind::parse(kind?)?;
    let task_id = ["record", "old_record"]
        .iter()
        .find_map(|key| data[*key]["id"].as_str())
        .and_then(|raw| Uuid::parse_str(raw).ok());
    Some(ChangeEvent { kind, task_id })
}
