//! Wire types for the issue lookup and repository events endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An issue or pull request as returned by the issue lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: IssueState,
    #[serde(default)]
    pub state_reason: Option<StateReason>,
    #[serde(default)]
    pub locked: bool,
    /// Present only on pull requests.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

/// Why an issue was closed (or reopened).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReason {
    Completed,
    NotPlanned,
    Reopened,
    #[serde(other)]
    Other,
}

/// Repository event kinds, parsed from the feed's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Issues,
    PullRequest,
    IssueComment,
    Other(String),
}

impl EventKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "IssuesEvent" => EventKind::Issues,
            "PullRequestEvent" => EventKind::PullRequest,
            "IssueCommentEvent" => EventKind::IssueComment,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            EventKind::Issues => "IssuesEvent",
            EventKind::PullRequest => "PullRequestEvent",
            EventKind::IssueComment => "IssueCommentEvent",
            EventKind::Other(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// The issue or pull request an event is about.
///
/// Some payloads are trimmed down to `number` and the API `url`, so the title
/// may be empty and the link falls back to whatever URL the payload carries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSubject")]
pub struct EventSubject {
    pub number: u64,
    pub title: String,
    pub html_url: Option<String>,
}

#[derive(Deserialize)]
struct RawSubject {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<RawSubject> for EventSubject {
    fn from(raw: RawSubject) -> Self {
        Self {
            number: raw.number,
            title: raw.title.unwrap_or_default(),
            html_url: raw.html_url.or(raw.url),
        }
    }
}

/// One entry from the repository's public events feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEvent")]
pub struct RepoEvent {
    pub id: String,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    pub actor: String,
    /// `opened`, `closed`, `reopened`, `created`, ...
    pub action: Option<String>,
    pub subject: Option<EventSubject>,
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    actor: RawActor,
    created_at: DateTime<Utc>,
    #[serde(default)]
    payload: RawPayload,
}

#[derive(Deserialize)]
struct RawActor {
    login: String,
}

#[derive(Default, Deserialize)]
struct RawPayload {
    action: Option<String>,
    issue: Option<EventSubject>,
    pull_request: Option<EventSubject>,
}

impl From<RawEvent> for RepoEvent {
    fn from(raw: RawEvent) -> Self {
        let kind = EventKind::from_type_name(&raw.kind);
        // Pull request events carry the PR under `pull_request`; issue and
        // comment events carry it under `issue`.
        let subject = match kind {
            EventKind::PullRequest => raw.payload.pull_request.or(raw.payload.issue),
            _ => raw.payload.issue.or(raw.payload.pull_request),
        };
        Self {
            id: raw.id,
            kind,
            created_at: raw.created_at,
            actor: raw.actor.login,
            action: raw.payload.action,
            subject,
        }
    }
}

/// A successful (non-cached) events listing.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<RepoEvent>,
    /// Caching token to send back on the next request.
    pub etag: Option<String>,
    /// Server-advised seconds to wait before polling again.
    pub poll_interval: Option<u64>,
    /// Newest `created_at` on the page, counting entries that could not be
    /// decoded into `events`.
    pub newest_created_at: Option<DateTime<Utc>>,
}

/// Outcome of a conditional events listing.
#[derive(Debug, Clone)]
pub enum EventsFetch {
    /// Nothing changed since the caching token was issued.
    Unchanged {
        /// Server-advised seconds to wait before polling again.
        poll_interval: Option<u64>,
    },
    Modified(EventPage),
}
