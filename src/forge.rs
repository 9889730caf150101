//! Forge API boundary: wire types, the `ForgeApi` trait, and the GitHub client.

pub mod github;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;
pub mod types;

pub use github::GithubClient;
pub use traits::ForgeApi;
pub use types::{
    EventKind, EventPage, EventSubject, EventsFetch, Issue, IssueState, RepoEvent, StateReason,
};
