//! Bot controller: answers issue references in chat and relays repository
//! events into the room.

use crate::forge::ForgeApi;
use crate::messaging::{InboundStream, Messaging};
use crate::references::extract_issue_references;
use crate::render::{format_event, format_link, render_response};
use crate::resolver::IssueResolver;
use crate::watcher::RepoEventWatcher;
use crate::{InboundMessage, OutboundResponse};

use futures::StreamExt as _;
use std::sync::Arc;
use tokio::sync::{OnceCell, watch};

pub struct BotController<F, M> {
    resolver: IssueResolver<F>,
    messaging: Arc<M>,
    own_user_id: OnceCell<String>,
}

impl<F: ForgeApi, M: Messaging> BotController<F, M> {
    pub fn new(forge: Arc<F>, messaging: Arc<M>) -> Self {
        Self {
            resolver: IssueResolver::new(forge),
            messaging,
            own_user_id: OnceCell::new(),
        }
    }

    /// The bot's own user id, fetched from the transport on first use and
    /// cached for the life of the controller.
    pub async fn own_user_id(&self) -> crate::Result<&str> {
        let user_id = self
            .own_user_id
            .get_or_try_init(|| self.messaging.whoami())
            .await?;
        Ok(user_id.as_str())
    }

    /// Build the reply for an inbound message, if it deserves one.
    pub async fn handle_message(&self, message: &InboundMessage) -> Option<OutboundResponse> {
        match self.own_user_id().await {
            Ok(own) if own == message.sender_id => {
                tracing::trace!(message_id = %message.id, "ignoring own message");
                return None;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(%error, "cannot resolve own identity, dropping message");
                return None;
            }
        }

        let numbers = extract_issue_references(&message.body);
        if numbers.is_empty() {
            return None;
        }

        tracing::debug!(message_id = %message.id, ?numbers, "resolving issue references");
        let links = self.resolver.resolve_all(&numbers).await;
        render_response(&links, format_link)
    }

    /// Handle an inbound message and send the reply, if any, to its room.
    pub async fn process_message(&self, message: InboundMessage) {
        let Some(response) = self.handle_message(&message).await else {
            return;
        };

        match self.messaging.send(&message.room_id, response).await {
            Ok(()) => tracing::debug!(room_id = %message.room_id, "issue links sent"),
            Err(error) => {
                tracing::warn!(room_id = %message.room_id, %error, "failed to send issue links")
            }
        }
    }

    /// Process inbound messages one at a time until the stream ends or
    /// `shutdown` flips to `true`.
    pub async fn run(&self, mut inbound: InboundStream, mut shutdown: watch::Receiver<bool>) {
        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                message = inbound.next() => message,
            };
            let Some(message) = message else {
                tracing::info!(adapter = self.messaging.name(), "inbound stream ended");
                break;
            };
            self.process_message(message).await;
        }
    }

    /// Start `watcher` in the background and relay every batch it produces
    /// to `room_id`. The returned task ends once the watcher stops.
    pub fn spawn_event_relay(
        &self,
        watcher: RepoEventWatcher<F>,
        room_id: String,
        shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let (mut batches, watcher_handle) = watcher.spawn(shutdown);
        let messaging = self.messaging.clone();

        tokio::spawn(async move {
            while let Some(batch) = batches.recv().await {
                let Some(response) = render_response(&batch, format_event) else {
                    continue;
                };
                match messaging.send(&room_id, response).await {
                    Ok(()) => {
                        tracing::debug!(%room_id, count = batch.len(), "repository events relayed")
                    }
                    Err(error) => {
                        tracing::warn!(%room_id, %error, "failed to relay repository events")
                    }
                }
            }

            if let Err(error) = watcher_handle.await {
                tracing::error!(%error, "repository event watcher task failed");
            }
        })
    }
}
