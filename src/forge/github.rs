//! GitHub REST client for issue lookups and the repository events feed.

use crate::config::ForgeConfig;
use crate::error::ForgeError;
use crate::forge::traits::ForgeApi;
use crate::forge::types::{EventPage, EventsFetch, Issue, RepoEvent};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;

/// Response header carrying the server-advised poll interval in seconds.
const POLL_INTERVAL_HEADER: &str = "x-poll-interval";

/// GitHub API client bound to one repository.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GithubClient {
    pub fn new(config: &ForgeConfig) -> Result<Self, ForgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("issuebridge/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| ForgeError::InvalidHeader("authorization".into()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }
}

impl ForgeApi for GithubClient {
    async fn get_issue(&self, number: u64) -> Result<Issue, ForgeError> {
        let response = self
            .http
            .get(self.repo_url(&format!("issues/{number}")))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ForgeError::NotFound { number });
        }
        if !status.is_success() {
            return Err(ForgeError::Status {
                status,
                context: "issue lookup",
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|error| ForgeError::Decode(error.to_string()))
    }

    async fn list_events(&self, etag: Option<&str>) -> Result<EventsFetch, ForgeError> {
        let mut request = self
            .http
            .get(self.repo_url("events"))
            .query(&[("per_page", "100")]);
        if let Some(etag) = etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers();
        let poll_interval = headers
            .get(POLL_INTERVAL_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        if status == StatusCode::NOT_MODIFIED {
            return Ok(EventsFetch::Unchanged { poll_interval });
        }
        if !status.is_success() {
            return Err(ForgeError::Status {
                status,
                context: "events listing",
            });
        }

        let etag = headers
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);

        let body = response.bytes().await?;
        let entries: Vec<serde_json::Value> = serde_json::from_slice(&body)
            .map_err(|error| ForgeError::Decode(error.to_string()))?;
        let (events, newest_created_at) = decode_events(entries);

        Ok(EventsFetch::Modified(EventPage {
            events,
            etag,
            poll_interval,
            newest_created_at,
        }))
    }
}

/// Decode feed entries one at a time so a single odd payload can't hide the
/// rest of the page. Undecodable entries still count towards the newest
/// timestamp.
fn decode_events(entries: Vec<serde_json::Value>) -> (Vec<RepoEvent>, Option<DateTime<Utc>>) {
    let mut events = Vec::with_capacity(entries.len());
    let mut newest = None;

    for entry in entries {
        let created_at = entry
            .get("created_at")
            .and_then(|value| value.as_str())
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.with_timezone(&Utc));
        newest = newest.max(created_at);

        let id = entry
            .get("id")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        match serde_json::from_value::<RepoEvent>(entry) {
            Ok(event) => events.push(event),
            Err(error) => {
                tracing::debug!(event_id = %id, %error, "skipping undecodable repository event")
            }
        }
    }

    (events, newest)
}
