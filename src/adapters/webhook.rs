//! Signed provider callbacks.
//!
//! The provider reports out-of-band transitions (notably `confirmed`) by
//! POSTing the booking to us with an HMAC-SHA256 of the raw body in the
//! `X-Siteminder-Signature` header, hex encoded and optionally prefixed
//! with `sha256=`.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::adapters::normalizer::{self, BOOKING_STATUS, BookingOperation};
use crate::config::types::ProviderConfig;
use crate::domain::booking::{Booking, BookingStatus};
use crate::error::{ProviderError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Siteminder-Signature";
const SIGNATURE_PREFIX: &str = "sha256=";

/// A booking change pushed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingEvent {
    /// Event name as sent (`booking.confirmed`, ...), if any.
    pub event: Option<String>,
    pub booking: Booking,
}

pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ProviderError::Config("webhook secret must not be empty".into()));
        }
        Ok(Self { secret })
    }

    /// `None` when no webhook secret is configured.
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        config
            .webhook_secret
            .as_deref()
            .and_then(|secret| Self::new(secret).ok())
    }

    pub fn sign(&self, body: &[u8]) -> String {
        sign(&self.secret, body)
    }

    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        verify_signature(&self.secret, body, signature)
    }

    pub fn verify_and_parse(&self, body: &[u8], signature: Option<&str>) -> Result<BookingEvent> {
        self.verify(body, signature)?;
        parse_booking_event(body)
    }
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC pads or hashes the key to block size, so no length is rejected.
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check `signature` against the raw body in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> Result<()> {
    let signature = signature.map(str::trim).ok_or(ProviderError::InvalidSignature)?;
    let hex_digest = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or(signature);
    let expected = hex::decode(hex_digest).map_err(|_| ProviderError::InvalidSignature)?;

    let mut mac = mac_for(secret);
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| ProviderError::InvalidSignature)
}

/// Parse a callback body into a canonical booking.
///
/// Accepts `{"event": ..., "booking": {...}}` or a flat booking object. When
/// the booking carries no status, the event name's last segment is used
/// (`booking.cancelled` -> cancelled); failing that, `confirmed`.
pub fn parse_booking_event(body: &[u8]) -> Result<BookingEvent> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(mut obj) = value else {
        return Err(ProviderError::NormalizationGap {
            operation: BookingOperation::Event.name(),
            field: "booking",
        });
    };

    let event = ["event", "type", "eventType"]
        .iter()
        .find_map(|key| obj.remove(*key))
        .and_then(|v| v.as_str().map(str::to_string));

    let mut payload = match obj.remove("booking") {
        Some(Value::Object(booking)) => {
            let mut booking = booking;
            for (k, v) in obj {
                normalizer::insert_preserving(&mut booking, &k, v);
            }
            booking
        }
        _ => obj,
    };

    let has_status = std::iter::once(BOOKING_STATUS.canonical)
        .chain(BOOKING_STATUS.aliases.iter().copied())
        .any(|key| payload.contains_key(key));
    if !has_status
        && let Some(status) = event
            .as_deref()
            .and_then(|name| name.rsplit(|c| matches!(c, '.' | ':' | '/')).next())
            .and_then(BookingStatus::parse)
    {
        payload.insert(
            BOOKING_STATUS.canonical.to_string(),
            Value::String(status.as_str().to_string()),
        );
    }

    let booking =
        normalizer::normalize_booking(BookingOperation::Event, &Value::Object(payload), None)?;
    Ok(BookingEvent { event, booking })
}
