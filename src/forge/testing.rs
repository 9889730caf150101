//! Scripted `ForgeApi` double for unit tests.

use crate::error::ForgeError;
use crate::forge::traits::ForgeApi;
use crate::forge::types::{
    EventKind, EventPage, EventSubject, EventsFetch, Issue, IssueState, RepoEvent, StateReason,
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// How a scripted issue lookup should answer.
#[derive(Debug, Clone)]
pub enum IssueScript {
    Found(Issue),
    Missing,
    Broken,
}

#[derive(Default)]
pub struct ScriptedForge {
    issues: Mutex<HashMap<u64, IssueScript>>,
    event_responses: Mutex<VecDeque<Result<EventsFetch, ForgeError>>>,
    pub issue_calls: Mutex<Vec<u64>>,
    pub etags_sent: Mutex<Vec<Option<String>>>,
}

impl ScriptedForge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(self, number: u64, script: IssueScript) -> Self {
        self.issues.lock().insert(number, script);
        self
    }

    /// Queue the next `list_events` answer. An empty queue answers `Unchanged`.
    pub fn push_events(&self, response: Result<EventsFetch, ForgeError>) {
        self.event_responses.lock().push_back(response);
    }
}

impl ForgeApi for ScriptedForge {
    async fn get_issue(&self, number: u64) -> Result<Issue, ForgeError> {
        self.issue_calls.lock().push(number);
        let script = self.issues.lock().get(&number).cloned();
        match script {
            Some(IssueScript::Found(issue)) => Ok(issue),
            Some(IssueScript::Broken) => Err(ForgeError::Decode("scripted failure".into())),
            Some(IssueScript::Missing) | None => Err(ForgeError::NotFound { number }),
        }
    }

    async fn list_events(&self, etag: Option<&str>) -> Result<EventsFetch, ForgeError> {
        self.etags_sent.lock().push(etag.map(ToOwned::to_owned));
        self.event_responses
            .lock()
            .pop_front()
            .unwrap_or(Ok(EventsFetch::Unchanged {
                poll_interval: None,
            }))
    }
}

pub fn issue(
    number: u64,
    title: &str,
    state: IssueState,
    state_reason: Option<StateReason>,
    locked: bool,
) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        html_url: format!("https://github.com/octo/widgets/issues/{number}"),
        state,
        state_reason,
        locked,
        pull_request: None,
    }
}

pub fn pull_request(
    number: u64,
    title: &str,
    state: IssueState,
    state_reason: Option<StateReason>,
) -> Issue {
    Issue {
        html_url: format!("https://github.com/octo/widgets/pull/{number}"),
        pull_request: Some(serde_json::json!({
            "url": format!("https://api.github.com/repos/octo/widgets/pulls/{number}")
        })),
        ..issue(number, title, state, state_reason, false)
    }
}

pub fn at(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .expect("test timestamp should parse")
        .with_timezone(&Utc)
}

pub fn event(id: &str, kind: EventKind, timestamp: &str, number: u64) -> RepoEvent {
    RepoEvent {
        id: id.to_string(),
        kind,
        created_at: at(timestamp),
        actor: "octocat".into(),
        action: Some("opened".into()),
        subject: Some(EventSubject {
            number,
            title: format!("Item {number}"),
            html_url: Some(format!("https://github.com/octo/widgets/issues/{number}")),
        }),
    }
}

pub fn page(events: Vec<RepoEvent>, etag: &str, poll_interval: Option<u64>) -> EventsFetch {
    EventsFetch::Modified(EventPage {
        events,
        etag: Some(etag.to_string()),
        poll_interval,
        newest_created_at: None,
    })
}
