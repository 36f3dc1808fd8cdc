use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub mock: MockConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Live API root. Absent or blank selects the mock provider.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub use_mock: bool,
    /// Per-attempt HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upper bound on one logical call, retries and backoff included.
    #[serde(default = "default_call_deadline")]
    pub call_deadline_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl ProviderConfig {
    /// The configured base URL, if it is non-blank.
    pub fn live_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            use_mock: false,
            request_timeout_secs: default_request_timeout(),
            call_deadline_secs: default_call_deadline(),
            user_agent: default_user_agent(),
            webhook_secret: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound of the random delay added to `Retry-After` waits.
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    /// Longest provider-requested `Retry-After` wait that is honoured as sent.
    #[serde(default = "default_max_retry_after_ms")]
    pub max_retry_after_ms: u64,
    /// Also retry `update_booking` and `cancel_booking`. Only safe if the
    /// provider treats repeated identical mutations as no-ops.
    #[serde(default)]
    pub retry_mutations: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            max_retry_after_ms: default_max_retry_after_ms(),
            retry_mutations: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockConfig {
    #[serde(default = "default_units")]
    pub default_units: u32,
    #[serde(default = "default_room_type")]
    pub default_room_type: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_units: default_units(),
            default_room_type: default_room_type(),
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_call_deadline() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("reservation-bridge/", env!("CARGO_PKG_VERSION")).into()
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_max_retry_after_ms() -> u64 {
    60_000
}

fn default_max_jitter_ms() -> u64 {
    500
}

fn default_units() -> u32 {
    5
}

fn default_room_type() -> String {
    "RT-Standard".into()
}
