/// Realtime change-feed subscriptions
///
/// Each subscription owns one WebSocket task that joins a channel scoped to
/// a table (optionally narrowed to a row predicate), forwards parsed change
/// events over an mpsc channel, reconnects on failure and shuts down when
/// the `Subscription` handle is dropped.
use crate::{
    backend::Table,
    error::{ClientError, ClientResult},
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Kind of remote write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change delivered by the feed; `row` is the new row, or the old row
/// for deletes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    pub row: Value,
}

/// Realtime connection settings
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint including the API key
    pub url: String,
    /// Reconnect interval in seconds
    pub reconnect_interval: u64,
    /// Buffer size for event channels
    pub buffer_size: usize,
    /// Heartbeat interval in seconds
    pub heartbeat_interval: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_interval: 5,
            buffer_size: 256,
            heartbeat_interval: 30,
        }
    }
}

/// Realtime subscription factory
#[derive(Debug, Clone)]
pub struct Realtime {
    config: RealtimeConfig,
}

/// Live subscription handle; dropping it tears the socket task down
pub struct Subscription {
    receiver: mpsc::Receiver<ChangeEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Receive the next change event; `None` after teardown
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Build a subscription around an existing receiver (tests)
    #[doc(hidden)]
    pub fn from_parts(receiver: mpsc::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Realtime {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    /// Subscribe to changes on a table, optionally narrowed by an equality
    /// predicate such as `("post_id", id)`
    pub fn subscribe(
        &self,
        table: Table,
        predicate: Option<(&str, String)>,
    ) -> ClientResult<Subscription> {
        if self.config.url.is_empty() {
            return Err(ClientError::Subscription(
                "Realtime URL not configured".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(self.config.buffer_size);
        let url = self.config.url.clone();
        let table_name = table.as_str().to_string();
        let filter = predicate.map(|(column, value)| format!("{}=eq.{}", column, value));
        let reconnect = self.config.reconnect_interval;
        let heartbeat = self.config.heartbeat_interval;

        let task = tokio::spawn(async move {
            run_channel(url, table_name, filter, tx, reconnect, heartbeat).await;
        });

        Ok(Subscription { receiver: rx, task })
    }
}

/// Channel join frame for one table subscription
fn join_frame(table: &str, filter: Option<&str>) -> String {
    let mut change = serde_json::json!({
        "event": "*",
        "schema": "public",
        "table": table,
    });
    if let Some(filter) = filter {
        change["filter"] = Value::String(filter.to_string());
    }
    serde_json::json!({
        "topic": format!("realtime:public:{}", table),
        "event": "phx_join",
        "payload": { "config": { "postgres_changes": [change] } },
        "ref": "1",
    })
    .to_string()
}

fn heartbeat_frame() -> String {
    serde_json::json!({
        "topic": "phoenix",
        "event": "heartbeat",
        "payload": {},
        "ref": "hb",
    })
    .to_string()
}

/// Parse a channel message into a change event, if it carries one
pub fn parse_change_event(text: &str) -> Option<ChangeEvent> {
    let message: Value = serde_json::from_str(text).ok()?;
    if message.get("event")?.as_str()? != "postgres_changes" {
        return None;
    }
    let data = message.get("payload")?.get("data")?;
    let kind = match data.get("type")?.as_str()? {
        "INSERT" => ChangeKind::Insert,
        "UPDATE" => ChangeKind::Update,
        "DELETE" => ChangeKind::Delete,
        _ => return None,
    };
    let table = data.get("table")?.as_str()?.to_string();
    let row = match kind {
        ChangeKind::Delete => data.get("old_record")?.clone(),
        _ => data.get("record")?.clone(),
    };
    Some(ChangeEvent { kind, table, row })
}

/// Connect, join and pump one channel until the receiver goes away
async fn run_channel(
    url: String,
    table: String,
    filter: Option<String>,
    tx: mpsc::Sender<ChangeEvent>,
    reconnect_interval: u64,
    heartbeat_interval: u64,
) {
    loop {
        info!(table = %table, "Connecting to realtime channel");

        match connect_async(&url).await {
            Ok((mut ws_stream, _)) => {
                let join = join_frame(&table, filter.as_deref());
                if let Err(e) = ws_stream.send(Message::Text(join)).await {
                    error!("Failed to join channel: {}", e);
                } else {
                    debug!(table = %table, "Joined realtime channel");
                    let mut heartbeat =
                        tokio::time::interval(Duration::from_secs(heartbeat_interval));
                    heartbeat.tick().await; // first tick is immediate

                    loop {
                        tokio::select! {
                            _ = heartbeat.tick() => {
                                if let Err(e) = ws_stream
                                    .send(Message::Text(heartbeat_frame()))
                                    .await
                                {
                                    error!("Failed to send heartbeat: {}", e);
                                    break;
                                }
                            }
                            msg = ws_stream.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        if let Some(event) = parse_change_event(&text) {
                                            if tx.send(event).await.is_err() {
                                                debug!("Subscriber dropped, closing channel");
                                                return;
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Ping(data))) => {
                                        if let Err(e) =
                                            ws_stream.send(Message::Pong(data)).await
                                        {
                                            error!("Failed to send pong: {}", e);
                                            break;
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) => {
                                        info!(table = %table, "Channel closed by server");
                                        break;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        error!("WebSocket error: {}", e);
                                        break;
                                    }
                                    None => break,
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("Failed to connect to realtime: {}", e);
            }
        }

        if tx.is_closed() {
            return;
        }
        warn!(
            table = %table,
            "Realtime disconnected, reconnecting in {}s", reconnect_interval
        );
        tokio::time::sleep(Duration::from_secs(reconnect_interval)).await;
    }
}
