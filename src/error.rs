use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// 429, 5xx, or a network failure before any response arrived.
    #[error("Transient provider failure{}: {message}", status_suffix(.status))]
    Transient {
        status: Option<u16>,
        body: Value,
        message: String,
    },

    #[error("Provider rejected request (HTTP {status}): {body}")]
    Terminal { status: u16, body: Value },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },

    #[error("Provider response for {operation} is missing required field '{field}'")]
    NormalizationGap {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Provider call timed out after {}ms", millis(.after))]
    Timeout { after: Duration },

    #[error("Invalid request parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Webhook signature is missing or does not match")]
    InvalidSignature,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn millis(duration: &Duration) -> u128 {
    duration.as_millis()
}

impl ProviderError {
    /// Whether the retry policy may re-issue the request that produced this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    /// Upstream HTTP status, looking through `RetriesExhausted`.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } => *status,
            Self::Terminal { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Parsed upstream body, looking through `RetriesExhausted`.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Transient { body, .. } | Self::Terminal { body, .. } => Some(body),
            Self::RetriesExhausted { last, .. } => last.body(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
