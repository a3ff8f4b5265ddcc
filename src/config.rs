use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_STORAGE_BUCKET: &str = "applications";
pub const DEFAULT_AVATAR_URL: &str = "https://ui-avatars.com/api/";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub supabase_url: Url,
    pub anon_key: String,
    pub storage_bucket: String,
    pub avatar_url: String,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let anon_key = env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;
        let mut config = Self::new(&supabase_url, anon_key)?;

        if let Ok(bucket) = env::var("JOBBOARD_STORAGE_BUCKET") {
            config.storage_bucket = bucket;
        }
        if let Ok(avatar_url) = env::var("JOBBOARD_AVATAR_URL") {
            config.avatar_url = avatar_url;
        }
        let timeout_secs: u64 = env::var("JOBBOARD_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .context("JOBBOARD_HTTP_TIMEOUT_SECS must be an integer")?;
        config.http_timeout = Duration::from_secs(timeout_secs);

        Ok(config)
    }

    /// Builds a config with defaults for everything but the project URL and key.
    pub fn new(supabase_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let anon_key = anon_key.into();
        anyhow::ensure!(!anon_key.trim().is_empty(), "SUPABASE_ANON_KEY must not be empty");

        Ok(Self {
            supabase_url: normalize_base_url(supabase_url)
                .context("SUPABASE_URL must be a valid http(s) URL")?,
            anon_key,
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            avatar_url: DEFAULT_AVATAR_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    pub fn redacted_anon_key(&self) -> String {
        redact_key(&self.anon_key)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw)?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "unsupported scheme {}",
        url.scheme()
    );
    Ok(url)
}

fn redact_key(raw: &str) -> String {
    if raw.chars().count() <= 8 {
        return "***".to_string();
    }
    let prefix: String = raw.chars().take(4).collect();
    format!("{prefix}***")
}
