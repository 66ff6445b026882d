use std::fmt;
use std::time::Duration;

use crate::error::{AdvisorError, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);
const DEFAULT_BACKOFF_JITTER: f64 = 0.1;

/// Settings for the advice generator and its HTTP backend.
///
/// Passed explicitly into constructors; nothing reads global settings.
#[derive(Clone)]
pub struct AdvisorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Fraction of each backoff delay that is randomized, in `[0, 1]`.
    pub backoff_jitter: f64,
}

impl AdvisorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_jitter: DEFAULT_BACKOFF_JITTER,
        }
    }

    /// Reads `GEMINI_API_KEY` (required) plus the optional `ADVICE_MODEL`,
    /// `ADVICE_TIMEOUT_SECS` and `ADVICE_MAX_ATTEMPTS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GEMINI_API_KEY")
            .ok_or_else(|| AdvisorError::Config("GEMINI_API_KEY must be set".to_string()))?;

        let mut config = Self::new(api_key);

        if let Some(model) = lookup("ADVICE_MODEL") {
            config = config.with_model(model);
        }
        if let Some(raw) = lookup("ADVICE_TIMEOUT_SECS") {
            let seconds = parse_number::<u64>("ADVICE_TIMEOUT_SECS", &raw)?;
            config = config.with_request_timeout(Duration::from_secs(seconds));
        }
        if let Some(raw) = lookup("ADVICE_MAX_ATTEMPTS") {
            config = config.with_max_attempts(parse_number("ADVICE_MAX_ATTEMPTS", &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration, jitter: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AdvisorError::Config("API key is empty".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(AdvisorError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(AdvisorError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            return Err(AdvisorError::Config(format!(
                "backoff_jitter {} must be between 0.0 and 1.0",
                self.backoff_jitter
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("backoff_jitter", &self.backoff_jitter)
            .finish()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AdvisorError::Config(format!("{} has invalid value '{}'", key, raw)))
}
