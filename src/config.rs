//! Configuration loading and validation.

use crate::error::{ConfigError, Result};
use crate::forge::EventKind;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_API_BASE: &str = "https://api.github.com";

/// issuebridge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Forge (GitHub) access and target repository.
    pub forge: ForgeConfig,

    /// Matrix homeserver and room.
    pub matrix: MatrixConfig,

    /// Repository event watcher settings.
    pub watcher: WatcherConfig,
}

/// Forge access configuration.
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// REST API base URL.
    pub api_base: String,

    /// Personal access token. Optional for public repositories.
    pub token: Option<String>,

    pub owner: String,
    pub repo: String,

    pub request_timeout_secs: u64,
}

impl ForgeConfig {
    /// `owner/repo` slug.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Matrix transport configuration.
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub access_token: String,
    pub room_id: String,
    /// Long-poll timeout passed to `/sync`.
    pub sync_timeout_ms: u64,
}

/// Repository event watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Event kinds relayed into the room.
    pub event_types: Vec<EventKind>,

    /// Poll interval used when the server doesn't advise one.
    pub default_poll_interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            event_types: vec![EventKind::Issues, EventKind::PullRequest],
            default_poll_interval_secs: 60,
        }
    }
}

/// On-disk TOML layout. Every key is optional so environment variables can
/// fill the gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    github: TomlGithub,
    #[serde(default)]
    matrix: TomlMatrix,
    #[serde(default)]
    watcher: TomlWatcher,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGithub {
    api_base: Option<String>,
    token: Option<String>,
    /// `owner/repo`.
    repo: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlMatrix {
    homeserver: Option<String>,
    access_token: Option<String>,
    room_id: Option<String>,
    sync_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlWatcher {
    event_types: Option<Vec<String>>,
    default_poll_interval_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the default config file (if present) and the
    /// process environment.
    pub fn load() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        match default_config_path().filter(|path| path.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "reading default config file");
                let toml = read_toml(&path)?;
                Self::resolve(toml, &env)
            }
            None => Self::resolve(TomlConfig::default(), &env),
        }
    }

    /// Load from a specific config file path, with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let toml = read_toml(path)?;
        Self::resolve(toml, &env)
    }

    /// Parse TOML content without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let toml: TomlConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        Self::resolve(toml, &HashMap::new())
    }

    fn resolve(toml: TomlConfig, env: &HashMap<String, String>) -> Result<Self> {
        let env_var = |key: &str| env.get(key).filter(|value| !value.trim().is_empty()).cloned();

        let slug = env_var("ISSUEBRIDGE_GITHUB_REPO")
            .or(toml.github.repo)
            .ok_or_else(|| ConfigError::MissingKey("github.repo".into()))?;
        let (owner, repo) = parse_repo_slug(&slug)?;

        let forge = ForgeConfig {
            api_base: toml
                .github
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            token: env_var("ISSUEBRIDGE_GITHUB_TOKEN")
                .or_else(|| env_var("GITHUB_TOKEN"))
                .or(toml.github.token),
            owner,
            repo,
            request_timeout_secs: toml.github.request_timeout_secs.unwrap_or(30),
        };

        let matrix = MatrixConfig {
            homeserver: env_var("ISSUEBRIDGE_MATRIX_HOMESERVER")
                .or(toml.matrix.homeserver)
                .ok_or_else(|| ConfigError::MissingKey("matrix.homeserver".into()))?
                .trim_end_matches('/')
                .to_string(),
            access_token: env_var("ISSUEBRIDGE_MATRIX_TOKEN")
                .or(toml.matrix.access_token)
                .ok_or_else(|| ConfigError::MissingKey("matrix.access_token".into()))?,
            room_id: env_var("ISSUEBRIDGE_MATRIX_ROOM")
                .or(toml.matrix.room_id)
                .ok_or_else(|| ConfigError::MissingKey("matrix.room_id".into()))?,
            sync_timeout_ms: toml.matrix.sync_timeout_ms.unwrap_or(30_000),
        };

        let mut watcher = WatcherConfig::default();
        if let Some(types) = toml.watcher.event_types {
            watcher.event_types = types.iter().map(|name| EventKind::from_type_name(name)).collect();
        }
        if let Some(secs) = toml.watcher.default_poll_interval_secs {
            if secs == 0 {
                return Err(ConfigError::Invalid(
                    "watcher.default_poll_interval_secs must be at least 1".into(),
                )
                .into());
            }
            watcher.default_poll_interval_secs = secs;
        }

        Ok(Self {
            forge,
            matrix,
            watcher,
        })
    }
}

/// `<config_dir>/issuebridge/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("issuebridge").join("config.toml"))
}

fn read_toml(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Load {
        path: path.display().to_string(),
        source,
    })?;
    let toml = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml)
}

fn parse_repo_slug(slug: &str) -> Result<(String, String)> {
    let (owner, repo) = slug
        .trim()
        .split_once('/')
        .ok_or_else(|| ConfigError::Invalid(format!("repo must be 'owner/repo', got '{slug}'")))?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(
            ConfigError::Invalid(format!("repo must be 'owner/repo', got '{slug}'")).into(),
        );
    }
    Ok((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const MINIMAL: &str = r#"
        [github]
        repo = "octo/widgets"

        [matrix]
        homeserver = "https://matrix.example.org/"
        access_token = "syt_secret"
        room_id = "!room:example.org"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml_str(MINIMAL).expect("minimal config should load");

        assert_eq!(config.forge.api_base, "https://api.github.com");
        assert_eq!(config.forge.slug(), "octo/widgets");
        assert!(config.forge.token.is_none());
        assert_eq!(config.matrix.homeserver, "https://matrix.example.org");
        assert_eq!(config.matrix.sync_timeout_ms, 30_000);
        assert_eq!(
            config.watcher.event_types,
            vec![EventKind::Issues, EventKind::PullRequest]
        );
        assert_eq!(config.watcher.default_poll_interval_secs, 60);
    }

    #[test]
    fn environment_overrides_file_values() {
        let toml: TomlConfig = toml::from_str(MINIMAL).expect("toml should parse");
        let env = HashMap::from([
            ("ISSUEBRIDGE_GITHUB_REPO".to_string(), "acme/rockets".to_string()),
            ("GITHUB_TOKEN".to_string(), "ghp_fallback".to_string()),
            ("ISSUEBRIDGE_MATRIX_ROOM".to_string(), "!other:example.org".to_string()),
        ]);

        let config = Config::resolve(toml, &env).expect("config should resolve");

        assert_eq!(config.forge.owner, "acme");
        assert_eq!(config.forge.repo, "rockets");
        assert_eq!(config.forge.token.as_deref(), Some("ghp_fallback"));
        assert_eq!(config.matrix.room_id, "!other:example.org");
    }

    #[test]
    fn missing_access_token_is_fatal() {
        let content = r#"
            [github]
            repo = "octo/widgets"

            [matrix]
            homeserver = "https://matrix.example.org"
            room_id = "!room:example.org"
        "#;

        let error = Config::from_toml_str(content).expect_err("missing token must fail");
        assert!(matches!(
            error,
            Error::Config(ConfigError::MissingKey(ref key)) if key == "matrix.access_token"
        ));
    }

    #[test]
    fn malformed_repo_slug_is_rejected() {
        assert!(parse_repo_slug("octo").is_err());
        assert!(parse_repo_slug("/widgets").is_err());
        assert!(parse_repo_slug("octo/widgets/extra").is_err());
        assert_eq!(
            parse_repo_slug(" octo/widgets ").expect("slug should parse"),
            ("octo".to_string(), "widgets".to_string())
        );
    }

    #[test]
    fn zero_default_poll_interval_is_rejected() {
        let content = format!("{MINIMAL}\n[watcher]\ndefault_poll_interval_secs = 0\n");

        let error = Config::from_toml_str(&content).expect_err("zero interval must fail");
        assert!(matches!(error, Error::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn watcher_event_types_parse_from_names() {
        let content = format!(
            "{MINIMAL}\n[watcher]\nevent_types = [\"IssueCommentEvent\", \"ReleaseEvent\"]\ndefault_poll_interval_secs = 120\n"
        );

        let config = Config::from_toml_str(&content).expect("config should load");

        assert_eq!(
            config.watcher.event_types,
            vec![
                EventKind::IssueComment,
                EventKind::Other("ReleaseEvent".into())
            ]
        );
        assert_eq!(config.watcher.default_poll_interval_secs, 120);
    }
}
