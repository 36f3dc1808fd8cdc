//! Maps provider JSON onto the canonical schema.
//!
//! Field aliases live in the tables below: supporting a new provider
//! spelling is a one-line change to a table, never to the call sites.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::domain::availability::{AvailabilityEntry, AvailabilityResult};
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::rates::RateAck;
use crate::error::{ProviderError, Result};

/// A canonical field and the alternate names providers use for it, in
/// order of preference.
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

impl FieldAlias {
    fn names(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.canonical).chain(self.aliases.iter().copied())
    }
}

pub const BOOKING_ID: FieldAlias = FieldAlias {
    canonical: "providerBookingId",
    aliases: &[
        "id",
        "bookingId",
        "booking_id",
        "provider_booking_id",
        "reservationId",
        "reservation_id",
    ],
};
pub const BOOKING_STATUS: FieldAlias = FieldAlias {
    canonical: "status",
    aliases: &["state", "bookingStatus", "booking_status"],
};
pub const CREATED_AT: FieldAlias = FieldAlias {
    canonical: "createdAt",
    aliases: &["created_at", "created"],
};
pub const UPDATED_AT: FieldAlias = FieldAlias {
    canonical: "updatedAt",
    aliases: &["updated_at", "modifiedAt", "modified_at"],
};
pub const CANCELLED_AT: FieldAlias = FieldAlias {
    canonical: "cancelledAt",
    aliases: &["cancelled_at", "canceledAt", "canceled_at"],
};

pub const AVAILABILITY_DATE: FieldAlias = FieldAlias {
    canonical: "date",
    aliases: &["day", "stayDate", "stay_date"],
};
pub const AVAILABILITY_ROOM_TYPE: FieldAlias = FieldAlias {
    canonical: "roomTypeId",
    aliases: &["room_type_id", "roomType", "room_type", "roomTypeCode"],
};
pub const AVAILABILITY_UNITS: FieldAlias = FieldAlias {
    canonical: "availableUnits",
    aliases: &["available_units", "available", "units", "inventory"],
};

/// Metadata key for a status string no alias matched.
pub const RAW_STATUS: &str = "rawStatus";

/// Envelope keys some provider versions wrap a single booking in.
const BOOKING_ENVELOPES: &[&str] = &["booking", "reservation", "data"];
/// Keys that may hold the availability list.
const AVAILABILITY_LISTS: &[&str] = &["availability", "data", "items"];

/// Which operation produced a booking response; decides the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOperation {
    Create,
    Update,
    Cancel,
    /// Booking carried by a provider webhook callback.
    Event,
}

impl BookingOperation {
    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "create_booking",
            Self::Update => "update_booking",
            Self::Cancel => "cancel_booking",
            Self::Event => "booking_event",
        }
    }

    pub fn default_status(self) -> BookingStatus {
        match self {
            Self::Create => BookingStatus::Pending,
            Self::Update => BookingStatus::Updated,
            Self::Cancel => BookingStatus::Cancelled,
            Self::Event => BookingStatus::Confirmed,
        }
    }
}

/// Normalize a booking-shaped response.
///
/// `known_id` is the id the request was addressed to (update/cancel); it is
/// used when the provider echoes no id of its own.
pub fn normalize_booking(
    operation: BookingOperation,
    body: &Value,
    known_id: Option<&str>,
) -> Result<Booking> {
    let mut fields = unwrap_booking(body);

    let provider_booking_id = take_field(&mut fields, BOOKING_ID)
        .and_then(|(key, value)| match value_to_id(&value) {
            Some(id) => Some(id),
            None => {
                fields.insert(key.to_string(), value);
                None
            }
        })
        .or_else(|| known_id.filter(|id| !id.is_empty()).map(str::to_string))
        .ok_or(ProviderError::NormalizationGap {
            operation: operation.name(),
            field: BOOKING_ID.canonical,
        })?;

    let status = match take_field(&mut fields, BOOKING_STATUS) {
        Some((key, value)) => match value.as_str().and_then(BookingStatus::parse) {
            Some(status) => status,
            None => {
                tracing::debug!(key, value = %value, "Unrecognised provider status");
                insert_preserving(&mut fields, RAW_STATUS, value);
                operation.default_status()
            }
        },
        None => operation.default_status(),
    };

    let mut created_at = take_timestamp(&mut fields, CREATED_AT);
    let mut updated_at = take_timestamp(&mut fields, UPDATED_AT);
    let mut cancelled_at = take_timestamp(&mut fields, CANCELLED_AT);

    if status != BookingStatus::NotFound {
        let now = Utc::now();
        let stamp = match operation {
            BookingOperation::Create => Some(&mut created_at),
            BookingOperation::Update => Some(&mut updated_at),
            BookingOperation::Cancel => Some(&mut cancelled_at),
            BookingOperation::Event => None,
        };
        if let Some(slot) = stamp {
            slot.get_or_insert(now);
        }
        if status == BookingStatus::Cancelled {
            cancelled_at.get_or_insert(now);
        }
    }

    Ok(Booking {
        provider_booking_id,
        status,
        created_at,
        updated_at,
        cancelled_at,
        metadata: collect_metadata(fields),
    })
}

/// Normalize an availability response into one entry per reported
/// (date, room type) pair, keeping the provider's order.
pub fn normalize_availability(body: &Value, default_room_type: &str) -> Result<AvailabilityResult> {
    let gap = ProviderError::NormalizationGap {
        operation: "get_availability",
        field: "availability",
    };
    let list = match body {
        Value::Array(items) => items,
        Value::Object(obj) => AVAILABILITY_LISTS
            .iter()
            .find_map(|key| match obj.get(*key) {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Object(inner)) => inner.get("availability").and_then(Value::as_array),
                _ => None,
            })
            .ok_or(gap)?,
        _ => return Err(gap),
    };

    let availability = list
        .iter()
        .map(|item| normalize_availability_entry(item, default_room_type))
        .collect::<Result<Vec<_>>>()?;
    Ok(AvailabilityResult { availability })
}

fn normalize_availability_entry(item: &Value, default_room_type: &str) -> Result<AvailabilityEntry> {
    let gap = |field| ProviderError::NormalizationGap {
        operation: "get_availability",
        field,
    };
    let Value::Object(obj) = item else {
        return Err(gap("availability"));
    };

    let date = first_present(obj, AVAILABILITY_DATE)
        .and_then(Value::as_str)
        .and_then(parse_date)
        .ok_or_else(|| gap(AVAILABILITY_DATE.canonical))?;

    let room_type_id = first_present(obj, AVAILABILITY_ROOM_TYPE)
        .and_then(value_to_id)
        .unwrap_or_else(|| default_room_type.to_string());

    let available_units = first_present(obj, AVAILABILITY_UNITS)
        .map_or(0, value_to_units);

    Ok(AvailabilityEntry {
        date,
        room_type_id,
        available_units,
    })
}

/// Rate acknowledgements are opaque; an empty body becomes `{}`.
pub fn normalize_rate_ack(body: Value) -> RateAck {
    match body {
        Value::Null => RateAck(Value::Object(Map::new())),
        other => RateAck(other),
    }
}

fn unwrap_booking(body: &Value) -> Map<String, Value> {
    let Value::Object(obj) = body else {
        return Map::new();
    };
    let has_id = BOOKING_ID.names().any(|name| obj.contains_key(name));
    if !has_id {
        for key in BOOKING_ENVELOPES {
            if let Some(Value::Object(inner)) = obj.get(*key) {
                let mut fields = inner.clone();
                // Siblings of the envelope are still provider data.
                for (k, v) in obj {
                    if k != key {
                        insert_preserving(&mut fields, k, v.clone());
                    }
                }
                return fields;
            }
        }
    }
    obj.clone()
}

/// Remove and return the first present name of `alias`. Other spellings
/// stay in `fields` and end up in metadata.
fn take_field(fields: &mut Map<String, Value>, alias: FieldAlias) -> Option<(&'static str, Value)> {
    alias
        .names()
        .find(|name| fields.get(*name).is_some_and(|v| !v.is_null()))
        .and_then(|name| fields.remove(name).map(|value| (name, value)))
}

fn first_present(obj: &Map<String, Value>, alias: FieldAlias) -> Option<&Value> {
    alias
        .names()
        .filter_map(|name| obj.get(name))
        .find(|v| !v.is_null())
}

fn take_timestamp(fields: &mut Map<String, Value>, alias: FieldAlias) -> Option<DateTime<Utc>> {
    let (key, value) = take_field(fields, alias)?;
    match parse_timestamp(&value) {
        Some(ts) => Some(ts),
        None => {
            tracing::debug!(key, value = %value, "Unparseable provider timestamp kept in metadata");
            fields.insert(key.to_string(), value);
            None
        }
    }
}

fn collect_metadata(mut fields: Map<String, Value>) -> Map<String, Value> {
    let mut metadata = match fields.remove("metadata") {
        Some(Value::Object(explicit)) => explicit,
        Some(Value::Null) | None => Map::new(),
        Some(other) => {
            let mut m = Map::new();
            m.insert("metadata".to_string(), other);
            m
        }
    };
    for (key, value) in fields {
        insert_preserving(&mut metadata, &key, value);
    }
    metadata
}

/// Insert without ever replacing a value: on a clash `value` goes under the
/// first free `key#2`, `key#3`, ... Returns the key used.
pub fn insert_preserving(map: &mut Map<String, Value>, key: &str, value: Value) -> String {
    let slot = if map.contains_key(key) {
        (2_u32..)
            .map(|n| format!("{key}#{n}"))
            .find(|candidate| !map.contains_key(candidate))
            .unwrap_or_else(|| format!("{key}#"))
    } else {
        key.to_string()
    };
    map.insert(slot.clone(), value);
    slot
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn value_to_units(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    raw.map_or(0, |n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
}

/// RFC 3339, naive ISO date-times (read as UTC), or unix epoch seconds / milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // Anything past year 5138 in seconds is taken as milliseconds.
            if raw.abs() >= 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}
