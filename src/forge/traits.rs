//! Forge API trait.

use crate::error::ForgeError;
use crate::forge::types::{EventsFetch, Issue};

/// The two forge endpoints the bot relies on.
///
/// Implemented by [`GithubClient`](crate::forge::GithubClient) for real use
/// and by scripted doubles in tests.
pub trait ForgeApi: Send + Sync + 'static {
    /// Look up an issue or pull request by number.
    ///
    /// Returns [`ForgeError::NotFound`] when the number doesn't exist.
    fn get_issue(
        &self,
        number: u64,
    ) -> impl std::future::Future<Output = Result<Issue, ForgeError>> + Send;

    /// List the repository's recent public events, conditional on `etag`.
    fn list_events(
        &self,
        etag: Option<&str>,
    ) -> impl std::future::Future<Output = Result<EventsFetch, ForgeError>> + Send;
}
