use std::{env, sync::OnceLock, time::Duration};

use thiserror::Error;

pub const POST_LIMIT: usize = 2000;
pub const COMMENT_LIMIT: usize = 1000;
pub const SNIPPET_LIMIT: usize = 10_000;
pub const BIO_LIMIT: usize = 160;
pub const NAME_LIMIT: usize = 60;
pub const LOCATION_LIMIT: usize = 60;
pub const PINNED_LIMIT: usize = 6;
pub const USERNAME_LIMIT: usize = 39;

pub const NOTIFICATION_CAP: usize = 50;

// a feed with fewer posts than this pulls in last month's shard too
pub const FEED_MIN_POSTS: usize = 5;
pub const FEED_DEFAULT_LIMIT: usize = 50;
pub const FEED_MAX_LIMIT: usize = 100;

pub const TRENDING_DEFAULT_LIMIT: usize = 10;
pub const TRENDING_MAX_LIMIT: usize = 50;

pub const WRITE_COOLDOWN: Duration = Duration::from_secs(4);

pub const SEARCH_PER_PAGE: u32 = 20;

pub const LEGACY_POSTS_PATH: &str = "posts.json";
pub const TRENDING_PATH: &str = "trending.json";

pub const GITHUB_OAUTH_URL: &str = "https://github.com";
pub const OAUTH_SCOPES: &str = "read:user public_repo gist";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

pub const USER_AGENT: &str = concat!("buildfeed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required when DATA_REPO is set")]
    Missing(&'static str),
    #[error("DATA_REPO must look like owner/name, got {0:?}")]
    BadRepo(String),
}

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_repo: Option<DataRepoConfig>,
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub app_url: String,
    pub allowed_origins: Vec<String>,
    pub admin_key: Option<String>,
    pub logging_webhook: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DataRepoConfig {
    pub repo: String,
    pub token: String,
    pub branch: String,
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_repo = match var("DATA_REPO") {
            Some(repo) => {
                if !crate::data::is_full_name(&repo) {
                    return Err(ConfigError::BadRepo(repo));
                }
                Some(DataRepoConfig {
                    repo,
                    token: var("DATA_REPO_TOKEN").ok_or(ConfigError::Missing("DATA_REPO_TOKEN"))?,
                    branch: var("DATA_BRANCH").unwrap_or_else(|| "main".into()),
                })
            }
            None => None,
        };

        let app_url = var("APP_URL").unwrap_or_else(|| "http://localhost:3000".into());
        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => vec![app_url.clone()],
        };

        Ok(Config {
            data_repo,
            api_url: var("GITHUB_API_URL").unwrap_or_else(|| "https://api.github.com".into()),
            client_id: var("GITHUB_CLIENT_ID").unwrap_or_default(),
            client_secret: var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
            app_url,
            allowed_origins,
            admin_key: var("ADMIN_KEY"),
            logging_webhook: var("LOGGING_WEBHOOK"),
        })
    }

    /// Settings with nothing external configured.
    pub fn local() -> Self {
        Config {
            data_repo: None,
            api_url: "https://api.github.com".into(),
            client_id: String::new(),
            client_secret: String::new(),
            app_url: "http://localhost:3000".into(),
            allowed_origins: vec!["http://localhost:3000".into()],
            admin_key: None,
            logging_webhook: None,
        }
    }
}

pub fn start_time() -> &'static str {
    static START: OnceLock<String> = OnceLock::new();
    START.get_or_init(|| chrono::Utc::now().to_rfc3339())
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
