use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-specific rate structure, forwarded without validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatePayload(pub Value);

/// Provider acknowledgement for a rate push, returned as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateAck(pub Value);

impl RateAck {
    /// `true` unless the provider explicitly answered `"accepted": false`.
    pub fn is_accepted(&self) -> bool {
        self.0
            .get("accepted")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

impl From<Value> for RatePayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
