use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Booking fields sent to the provider as-is (`propertyId`, `guest`, dates, ...).
pub type BookingRequest = Map<String, Value>;

/// Partial booking fields for `update_booking`.
pub type BookingPatch = Map<String, Value>;

/// Lifecycle state of a booking as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Updated,
    Cancelled,
    /// Returned, not raised, when an operation targets an unknown id.
    NotFound,
}

impl BookingStatus {
    /// Parse a provider status string, accepting the spellings seen across
    /// provider versions. Returns `None` for anything unrecognised.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "new" | "tentative" => Some(Self::Pending),
            "confirmed" | "booked" | "reserved" => Some(Self::Confirmed),
            "updated" | "modified" | "amended" => Some(Self::Updated),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            "not_found" | "notfound" | "not-found" => Some(Self::NotFound),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Updated => "updated",
            Self::Cancelled => "cancelled",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-agnostic booking returned by every booking operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub provider_booking_id: String,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Provider fields with no canonical counterpart.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Booking {
    /// The pseudo-booking returned when `id` is unknown to the provider.
    pub fn not_found(id: &str) -> Self {
        Self {
            provider_booking_id: id.to_string(),
            status: BookingStatus::NotFound,
            created_at: None,
            updated_at: None,
            cancelled_at: None,
            metadata: Map::new(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == BookingStatus::NotFound
    }
}

/// Per-call options for `create_booking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Sent as `Idempotency-Key` so the provider can deduplicate retried creates.
    pub idempotency_key: Option<String>,
}

impl CreateOptions {
    pub fn with_idempotency_key(key: impl Into<String>) -> Self {
        Self {
            idempotency_key: Some(key.into()),
        }
    }
}
