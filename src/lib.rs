//! issuebridge: a chat bot that links forge issues mentioned in a room and
//! relays new repository activity back into it.

pub mod bot;
pub mod config;
pub mod error;
pub mod forge;
pub mod messaging;
pub mod references;
pub mod render;
pub mod resolver;
pub mod watcher;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Room identifier type.
pub type RoomId = String;

/// Inbound message from the chat room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub source: String,
    pub room_id: RoomId,
    pub sender_id: String,
    pub body: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Outbound message to the chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundResponse {
    Text(String),
    /// HTML body with a plain-text fallback for clients that don't render it.
    Html { html: String, fallback: String },
}

impl OutboundResponse {
    /// The plain-text body, whichever variant this is.
    pub fn plain_text(&self) -> &str {
        match self {
            OutboundResponse::Text(text) => text,
            OutboundResponse::Html { fallback, .. } => fallback,
        }
    }
}
