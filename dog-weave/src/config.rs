use std::time::Duration;

use crate::{WeaveError, WeaveResult, DEFAULT_CONTENT_TYPE};

/// Configuration for upload, resume and confirmation
#[derive(Debug, Clone)]
pub struct WeaveConfig {
    /// Wait after chunk completion and after each pending (202) status
    pub normal_backoff: Duration,

    /// Wait after a rate-limited (429) chunk or status response
    pub long_backoff: Duration,

    /// Ceiling on consecutive 429 retries of a single chunk.
    /// `None` retries until the network lets the chunk through.
    pub max_rate_limit_retries: Option<u32>,

    /// Ceiling on pending/rate-limited status polls.
    /// `None` polls until the network gives a final answer.
    pub max_status_polls: Option<u32>,

    /// Content type tagged on uploads that don't name one
    pub default_content_type: String,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            normal_backoff: Duration::from_millis(2_000),
            long_backoff: Duration::from_millis(5_000),
            max_rate_limit_retries: None,
            max_status_polls: None,
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl WeaveConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by any `{prefix}...` environment variables
    pub fn from_env(prefix: &str) -> WeaveResult<Self> {
        Self::default().apply_env_overrides(prefix, std::env::vars())
    }

    /// Apply `PREFIX__KEY=value` overrides.
    ///
    /// Keys are lowercased after stripping the prefix, so
    /// `DOGWEAVE__LONG_BACKOFF_MS=8000` sets `long_backoff_ms`. Unknown keys
    /// are ignored; malformed values are rejected.
    pub fn apply_env_overrides<I, K, V>(mut self, prefix: &str, vars: I) -> WeaveResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(stripped) = key.as_ref().strip_prefix(prefix) else {
                continue;
            };
            let normalized = stripped.trim_start_matches('_').to_lowercase().replace("__", ".");
            self.set(&normalized, value.as_ref())?;
        }
        Ok(self)
    }

    /// Set a single option by its config key
    pub fn set(&mut self, key: &str, value: &str) -> WeaveResult<()> {
        match key {
            "normal_backoff_ms" => self.normal_backoff = Duration::from_millis(parse(key, value)?),
            "long_backoff_ms" => self.long_backoff = Duration::from_millis(parse(key, value)?),
            "max_rate_limit_retries" => self.max_rate_limit_retries = parse_limit(key, value)?,
            "max_status_polls" => self.max_status_polls = parse_limit(key, value)?,
            "default_content_type" => {
                if value.trim().is_empty() {
                    return Err(WeaveError::config("default_content_type must not be empty"));
                }
                self.default_content_type = value.trim().to_string();
            }
            _ => tracing::debug!(key, "ignoring unknown weave config key"),
        }
        Ok(())
    }

    /// Set both backoff intervals
    pub fn with_backoff(mut self, normal: Duration, long: Duration) -> Self {
        self.normal_backoff = normal;
        self.long_backoff = long;
        self
    }

    /// Set the pending-status backoff
    pub fn with_normal_backoff(mut self, normal: Duration) -> Self {
        self.normal_backoff = normal;
        self
    }

    /// Set the rate-limit backoff
    pub fn with_long_backoff(mut self, long: Duration) -> Self {
        self.long_backoff = long;
        self
    }

    /// Bound the 429 chunk retry loop
    pub fn with_max_rate_limit_retries(mut self, max: u32) -> Self {
        self.max_rate_limit_retries = Some(max);
        self
    }

    /// Bound the pending-status polling loop
    pub fn with_max_status_polls(mut self, max: u32) -> Self {
        self.max_status_polls = Some(max);
        self
    }

    /// Set the default content type
    pub fn with_default_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.default_content_type = content_type.into();
        self
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> WeaveResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| WeaveError::config(format!("{key}: cannot parse {value:?}")))
}

// "none" or "unbounded" clears the ceiling
fn parse_limit(key: &str, value: &str) -> WeaveResult<Option<u32>> {
    match value.trim().to_lowercase().as_str() {
        "" | "none" | "unbounded" => Ok(None),
        _ => parse(key, value).map(Some),
    }
}
