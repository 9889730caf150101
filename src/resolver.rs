//! Issue resolution: turn referenced numbers into displayable links.

use crate::forge::{ForgeApi, Issue, IssueState, StateReason};

use futures::future::join_all;
use std::sync::Arc;

/// Whether a resolved item is an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Issue,
    PullRequest,
}

impl LinkKind {
    pub fn label(self) -> &'static str {
        match self {
            LinkKind::Issue => "Issue",
            LinkKind::PullRequest => "PR",
        }
    }
}

/// Status marker shown next to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGlyph {
    Done,
    Rejected,
    InProgress,
    Pending,
    Locked,
}

impl StatusGlyph {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusGlyph::Done => "✅",
            StatusGlyph::Rejected => "🚫",
            StatusGlyph::InProgress => "🔄",
            StatusGlyph::Pending => "⏳",
            StatusGlyph::Locked => "🔒",
        }
    }

    /// Pick the glyph for an issue. The arms are a fallback chain; order
    /// matters.
    pub fn for_issue(issue: &Issue) -> Self {
        match issue.state_reason {
            Some(StateReason::Completed) => StatusGlyph::Done,
            Some(StateReason::NotPlanned) => StatusGlyph::Rejected,
            _ if issue.is_pull_request() => StatusGlyph::InProgress,
            _ if issue.state == IssueState::Open => StatusGlyph::Pending,
            _ if issue.locked => StatusGlyph::Locked,
            _ => StatusGlyph::Done,
        }
    }
}

impl std::fmt::Display for StatusGlyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forge item ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub kind: LinkKind,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: IssueState,
    pub glyph: StatusGlyph,
}

impl From<Issue> for ResolvedLink {
    fn from(issue: Issue) -> Self {
        let glyph = StatusGlyph::for_issue(&issue);
        let kind = if issue.is_pull_request() {
            LinkKind::PullRequest
        } else {
            LinkKind::Issue
        };
        Self {
            kind,
            number: issue.number,
            title: issue.title,
            url: issue.html_url,
            state: issue.state,
            glyph,
        }
    }
}

/// Looks up referenced numbers against the forge.
///
/// Lookups never fail outward: a missing or unreachable item just resolves
/// to `None` so one bad reference can't sink the rest of a message.
pub struct IssueResolver<F> {
    forge: Arc<F>,
}

impl<F> Clone for IssueResolver<F> {
    fn clone(&self) -> Self {
        Self {
            forge: self.forge.clone(),
        }
    }
}

impl<F: ForgeApi> IssueResolver<F> {
    pub fn new(forge: Arc<F>) -> Self {
        Self { forge }
    }

    /// Resolve a single reference.
    pub async fn resolve(&self, number: u64) -> Option<ResolvedLink> {
        if number == 0 {
            return None;
        }

        match self.forge.get_issue(number).await {
            Ok(issue) => Some(ResolvedLink::from(issue)),
            Err(error) if error.is_not_found() => {
                tracing::debug!(number, "referenced issue does not exist");
                None
            }
            Err(error) => {
                tracing::warn!(number, %error, "failed to resolve issue reference");
                None
            }
        }
    }

    /// Resolve several references concurrently. Output follows input order,
    /// with unresolvable numbers dropped.
    pub async fn resolve_all(&self, numbers: &[u64]) -> Vec<ResolvedLink> {
        join_all(numbers.iter().map(|number| self.resolve(*number)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::testing::{IssueScript, ScriptedForge, issue, pull_request};

    #[test]
    fn closed_completed_issue_is_done() {
        let item = issue(
            101,
            "done",
            IssueState::Closed,
            Some(StateReason::Completed),
            false,
        );
        assert_eq!(StatusGlyph::for_issue(&item), StatusGlyph::Done);
    }

    #[test]
    fn open_pull_request_is_in_progress() {
        let item = pull_request(102, "wip", IssueState::Open, None);
        assert_eq!(StatusGlyph::for_issue(&item), StatusGlyph::InProgress);
    }

    #[test]
    fn closed_locked_issue_without_reason_is_locked() {
        let item = issue(103, "heated", IssueState::Closed, None, true);
        assert_eq!(StatusGlyph::for_issue(&item), StatusGlyph::Locked);
    }

    #[test]
    fn glyph_precedence_table() {
        let cases = [
            (
                pull_request(1, "", IssueState::Closed, Some(StateReason::Completed)),
                StatusGlyph::Done,
            ),
            (
                pull_request(2, "", IssueState::Closed, Some(StateReason::NotPlanned)),
                StatusGlyph::Rejected,
            ),
            (
                pull_request(3, "", IssueState::Closed, None),
                StatusGlyph::InProgress,
            ),
            (
                issue(4, "", IssueState::Closed, Some(StateReason::NotPlanned), true),
                StatusGlyph::Rejected,
            ),
            (
                issue(5, "", IssueState::Open, Some(StateReason::Reopened), false),
                StatusGlyph::Pending,
            ),
            (
                issue(6, "", IssueState::Open, None, true),
                StatusGlyph::Pending,
            ),
            (
                issue(7, "", IssueState::Closed, None, false),
                StatusGlyph::Done,
            ),
        ];

        for (item, expected) in cases {
            assert_eq!(
                StatusGlyph::for_issue(&item),
                expected,
                "unexpected glyph for #{}",
                item.number
            );
        }
    }

    #[test]
    fn link_kind_follows_pull_request_field() {
        let link = ResolvedLink::from(pull_request(812, "Add widget", IssueState::Open, None));
        assert_eq!(link.kind, LinkKind::PullRequest);
        assert_eq!(link.url, "https://github.com/octo/widgets/pull/812");
    }

    #[tokio::test]
    async fn zero_is_rejected_without_a_lookup() {
        let forge = Arc::new(ScriptedForge::new());
        let resolver = IssueResolver::new(forge.clone());

        assert!(resolver.resolve(0).await.is_none());
        assert!(forge.issue_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_and_broken_lookups_resolve_to_none() {
        let forge = Arc::new(
            ScriptedForge::new()
                .with_issue(404, IssueScript::Missing)
                .with_issue(500, IssueScript::Broken),
        );
        let resolver = IssueResolver::new(forge);

        assert!(resolver.resolve(404).await.is_none());
        assert!(resolver.resolve(500).await.is_none());
    }

    #[tokio::test]
    async fn resolve_all_keeps_reference_order_and_skips_failures() {
        let forge = Arc::new(
            ScriptedForge::new()
                .with_issue(
                    300,
                    IssueScript::Found(issue(300, "third", IssueState::Open, None, false)),
                )
                .with_issue(200, IssueScript::Broken)
                .with_issue(
                    100,
                    IssueScript::Found(pull_request(100, "first", IssueState::Open, None)),
                ),
        );
        let resolver = IssueResolver::new(forge);

        let links = resolver.resolve_all(&[300, 200, 100, 999]).await;

        let numbers: Vec<u64> = links.iter().map(|link| link.number).collect();
        assert_eq!(numbers, vec![300, 100]);
        assert_eq!(links[1].kind, LinkKind::PullRequest);
    }
}
