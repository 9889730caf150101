//! Matrix messaging adapter over the client-server API.
//!
//! Joins one room, long-polls `/sync` for new `m.text` messages in it, and
//! posts replies as `m.notice` events with an HTML `formatted_body`.

use crate::config::MatrixConfig;
use crate::error::MessagingError;
use crate::messaging::traits::{InboundStream, Messaging};
use crate::{InboundMessage, OutboundResponse};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};

/// Pause between retries after a failed `/sync`.
const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Matrix adapter state.
pub struct MatrixAdapter {
    http: reqwest::Client,
    homeserver: String,
    access_token: String,
    room_id: String,
    sync_timeout_ms: u64,
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl MatrixAdapter {
    pub fn new(config: &MatrixConfig) -> anyhow::Result<Self> {
        // Leave headroom over the long-poll timeout so `/sync` isn't cut off.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.sync_timeout_ms) + Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            homeserver: config.homeserver.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            room_id: config.room_id.clone(),
            sync_timeout_ms: config.sync_timeout_ms,
            shutdown_tx: Arc::new(RwLock::new(None)),
        })
    }

    fn client(&self) -> MatrixClient {
        MatrixClient {
            http: self.http.clone(),
            homeserver: self.homeserver.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Cloneable request helper shared between the adapter and its sync task.
#[derive(Clone)]
struct MatrixClient {
    http: reqwest::Client,
    homeserver: String,
    access_token: String,
}

impl MatrixClient {
    fn url(&self, path: &str) -> String {
        format!("{}/_matrix/client/v3/{}", self.homeserver, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &'static str,
    ) -> Result<T, MessagingError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessagingError::Status {
                status,
                context,
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn whoami(&self) -> Result<String, MessagingError> {
        #[derive(Deserialize)]
        struct WhoAmI {
            user_id: String,
        }

        let response = self
            .http
            .get(self.url("account/whoami"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let whoami: WhoAmI = Self::read_json(response, "whoami").await?;
        Ok(whoami.user_id)
    }

    async fn join(&self, room_id: &str) -> Result<(), MessagingError> {
        let response = self
            .http
            .post(self.url(&format!("join/{}", urlencoding::encode(room_id))))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let _: serde_json::Value = Self::read_json(response, "room join").await?;
        Ok(())
    }

    async fn sync(
        &self,
        since: Option<&str>,
        timeout_ms: u64,
    ) -> Result<SyncResponse, MessagingError> {
        let timeout = timeout_ms.to_string();
        let mut request = self
            .http
            .get(self.url("sync"))
            .bearer_auth(&self.access_token)
            .query(&[("timeout", timeout.as_str())]);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        let response = request.send().await?;
        Self::read_json(response, "sync").await
    }

    async fn send_message(
        &self,
        room_id: &str,
        response: OutboundResponse,
    ) -> Result<String, MessagingError> {
        #[derive(Deserialize)]
        struct SendResponse {
            event_id: String,
        }

        let content = match response {
            OutboundResponse::Text(text) => serde_json::json!({
                "msgtype": "m.notice",
                "body": text,
            }),
            OutboundResponse::Html { html, fallback } => serde_json::json!({
                "msgtype": "m.notice",
                "body": fallback,
                "format": "org.matrix.custom.html",
                "formatted_body": html,
            }),
        };

        let txn_id = uuid::Uuid::new_v4();
        let response = self
            .http
            .put(self.url(&format!(
                "rooms/{}/send/m.room.message/{txn_id}",
                urlencoding::encode(room_id)
            )))
            .bearer_auth(&self.access_token)
            .json(&content)
            .send()
            .await?;
        let sent: SendResponse = Self::read_json(response, "send message").await?;
        Ok(sent.event_id)
    }
}

#[derive(Debug, Deserialize)]
struct SyncResponse {
    next_batch: String,
    #[serde(default)]
    rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
struct SyncRooms {
    #[serde(default)]
    join: HashMap<String, JoinedRoom>,
}

#[derive(Debug, Default, Deserialize)]
struct JoinedRoom {
    #[serde(default)]
    timeline: Timeline,
}

#[derive(Debug, Default, Deserialize)]
struct Timeline {
    #[serde(default)]
    events: Vec<RoomEvent>,
}

#[derive(Debug, Deserialize)]
struct RoomEvent {
    #[serde(rename = "type")]
    kind: String,
    event_id: String,
    sender: String,
    origin_server_ts: i64,
    #[serde(default)]
    content: serde_json::Value,
}

/// Pull text messages for `room_id` out of a sync response, oldest first.
fn inbound_messages(room_id: &str, sync: SyncResponse) -> Vec<InboundMessage> {
    let mut rooms = sync.rooms.join;
    let Some(room) = rooms.remove(room_id) else {
        return Vec::new();
    };

    room.timeline
        .events
        .into_iter()
        .filter(|event| event.kind == "m.room.message")
        .filter_map(|event| {
            if event.content.get("msgtype").and_then(|v| v.as_str()) != Some("m.text") {
                return None;
            }
            let body = event.content.get("body")?.as_str()?.to_string();
            let timestamp = chrono::DateTime::from_timestamp_millis(event.origin_server_ts)
                .unwrap_or_else(chrono::Utc::now);
            Some(InboundMessage {
                id: event.event_id,
                source: "matrix".into(),
                room_id: room_id.to_string(),
                sender_id: event.sender,
                body,
                timestamp,
            })
        })
        .collect()
}

impl Messaging for MatrixAdapter {
    fn name(&self) -> &str {
        "matrix"
    }

    async fn start(&self) -> crate::Result<InboundStream> {
        let client = self.client();
        client.join(&self.room_id).await?;

        // Skip the backlog: only messages after this point are handled.
        let initial = client.sync(None, 0).await?;
        let mut since = initial.next_batch;

        tracing::info!(room_id = %self.room_id, "matrix connected");

        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        let room_id = self.room_id.clone();
        let timeout_ms = self.sync_timeout_ms;

        tokio::spawn(async move {
            loop {
                let result = tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("matrix sync loop shutting down");
                        break;
                    }
                    result = client.sync(Some(&since), timeout_ms) => result,
                };

                let sync = match result {
                    Ok(sync) => sync,
                    Err(error) => {
                        tracing::warn!(%error, "matrix sync failed, retrying");
                        tokio::time::sleep(SYNC_RETRY_DELAY).await;
                        continue;
                    }
                };

                since = sync.next_batch.clone();
                for message in inbound_messages(&room_id, sync) {
                    if let Err(error) = inbound_tx.send(message).await {
                        tracing::warn!(
                            %error,
                            "failed to send inbound message from matrix (receiver dropped)"
                        );
                        return;
                    }
                }
            }
        });

        let stream = tokio_stream::wrappers::ReceiverStream::new(inbound_rx);
        Ok(Box::pin(stream))
    }

    async fn whoami(&self) -> crate::Result<String> {
        Ok(self.client().whoami().await?)
    }

    async fn send(&self, room_id: &str, response: OutboundResponse) -> crate::Result<()> {
        let event_id = self.client().send_message(room_id, response).await?;
        tracing::debug!(%room_id, %event_id, "matrix message sent");
        Ok(())
    }

    async fn health_check(&self) -> crate::Result<()> {
        if self.shutdown_tx.read().await.is_none() {
            return Err(MessagingError::NotStarted.into());
        }
        Ok(())
    }

    async fn shutdown(&self) -> crate::Result<()> {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            tx.send(()).await.ok();
        }
        tracing::info!("matrix adapter shut down");
        Ok(())
    }
}
