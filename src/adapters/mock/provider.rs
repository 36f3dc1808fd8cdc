use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::config::types::MockConfig;
use crate::domain::availability::{AvailabilityEntry, AvailabilityQuery, AvailabilityResult};
use crate::domain::booking::{Booking, BookingPatch, BookingRequest, BookingStatus, CreateOptions};
use crate::domain::rates::{RateAck, RatePayload};
use crate::error::Result;
use crate::ports::provider::ReservationProvider;

struct StoredBooking {
    booking: Booking,
    request: BookingRequest,
}

#[derive(Default)]
struct MockState {
    bookings: HashMap<String, StoredBooking>,
    /// Idempotency key -> provider booking id.
    idempotency: HashMap<String, String>,
    rates: Vec<RatePayload>,
}

/// In-memory provider used when no live API is configured.
pub struct MockProvider {
    state: RwLock<MockState>,
    config: MockConfig,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockProvider {
    pub fn new(config: MockConfig) -> Self {
        Self {
            state: RwLock::new(MockState::default()),
            config,
        }
    }

    /// Current stored view of a booking.
    pub fn booking(&self, provider_booking_id: &str) -> Option<Booking> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .bookings
            .get(provider_booking_id)
            .map(|stored| stored.booking.clone())
    }

    /// The booking fields as last sent (create merged with every update).
    pub fn stored_request(&self, provider_booking_id: &str) -> Option<BookingRequest> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .bookings
            .get(provider_booking_id)
            .map(|stored| stored.request.clone())
    }

    pub fn booking_count(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.bookings.len()
    }

    pub fn pushed_rates(&self) -> Vec<RatePayload> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.rates.clone()
    }
}

#[async_trait]
impl ReservationProvider for MockProvider {
    async fn create_booking(&self, data: &BookingRequest, opts: &CreateOptions) -> Result<Booking> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(key) = opts.idempotency_key.as_deref()
            && let Some(existing) = state
                .idempotency
                .get(key)
                .and_then(|id| state.bookings.get(id))
        {
            debug!(
                idempotency_key = key,
                provider_booking_id = %existing.booking.provider_booking_id,
                "Mock replayed idempotent create"
            );
            return Ok(existing.booking.clone());
        }

        let provider_booking_id = format!("mock-{}", Uuid::new_v4());
        let booking = Booking {
            provider_booking_id: provider_booking_id.clone(),
            status: BookingStatus::Pending,
            created_at: Some(Utc::now()),
            updated_at: None,
            cancelled_at: None,
            metadata: serde_json::Map::new(),
        };

        if let Some(key) = &opts.idempotency_key {
            state
                .idempotency
                .insert(key.clone(), provider_booking_id.clone());
        }
        state.bookings.insert(
            provider_booking_id.clone(),
            StoredBooking {
                booking: booking.clone(),
                request: data.clone(),
            },
        );
        debug!(provider_booking_id, "Mock booking created");
        Ok(booking)
    }

    async fn update_booking(
        &self,
        provider_booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<Booking> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = state.bookings.get_mut(provider_booking_id) else {
            return Ok(Booking::not_found(provider_booking_id));
        };

        if stored.booking.status.is_terminal() {
            debug!(provider_booking_id, "Mock update ignored for cancelled booking");
            return Ok(stored.booking.clone());
        }

        for (key, value) in patch {
            stored.request.insert(key.clone(), value.clone());
        }
        stored.booking.status = BookingStatus::Updated;
        stored.booking.updated_at = Some(Utc::now());
        Ok(stored.booking.clone())
    }

    async fn cancel_booking(
        &self,
        provider_booking_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(stored) = state.bookings.get_mut(provider_booking_id) else {
            return Ok(Booking::not_found(provider_booking_id));
        };

        if stored.booking.status != BookingStatus::Cancelled {
            stored.booking.status = BookingStatus::Cancelled;
            stored.booking.cancelled_at = Some(Utc::now());
            if let Some(reason) = reason {
                stored
                    .booking
                    .metadata
                    .insert("cancelReason".to_string(), Value::String(reason.to_string()));
            }
        }
        Ok(stored.booking.clone())
    }

    async fn get_availability(&self, query: &AvailabilityQuery) -> Result<AvailabilityResult> {
        query.validate()?;

        let default_room = [self.config.default_room_type.clone()];
        let room_types: &[String] = if query.room_type_ids.is_empty() {
            &default_room
        } else {
            &query.room_type_ids
        };

        let availability = query
            .dates()
            .flat_map(|date| {
                room_types.iter().map(move |room_type_id| AvailabilityEntry {
                    date,
                    room_type_id: room_type_id.clone(),
                    available_units: self.config.default_units,
                })
            })
            .collect();
        Ok(AvailabilityResult { availability })
    }

    async fn push_rates(&self, payload: &RatePayload) -> Result<RateAck> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.rates.push(payload.clone());
        Ok(RateAck(json!({"accepted": true})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> BookingRequest {
        let mut data = BookingRequest::new();
        data.insert("propertyId".into(), json!("P1"));
        data.insert("guest".into(), json!({"firstName": "T"}));
        data
    }

    #[tokio::test]
    async fn create_assigns_mock_prefixed_id() {
        let mock = MockProvider::default();
        let booking = mock
            .create_booking(&request(), &CreateOptions::default())
            .await
            .unwrap();
        assert!(booking.provider_booking_id.starts_with("mock-"));
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.created_at.is_some());
        assert_eq!(mock.booking_count(), 1);
    }

    #[tokio::test]
    async fn distinct_creates_get_distinct_ids() {
        let mock = MockProvider::default();
        let a = mock.create_booking(&request(), &CreateOptions::default()).await.unwrap();
        let b = mock.create_booking(&request(), &CreateOptions::default()).await.unwrap();
        assert_ne!(a.provider_booking_id, b.provider_booking_id);
    }

    #[tokio::test]
    async fn idempotency_key_replays_original_booking() {
        let mock = MockProvider::default();
        let opts = CreateOptions::with_idempotency_key("key-1");
        let first = mock.create_booking(&request(), &opts).await.unwrap();
        let second = mock.create_booking(&request(), &opts).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.booking_count(), 1);
    }

    #[tokio::test]
    async fn update_merges_patch() {
        let mock = MockProvider::default();
        let created = mock.create_booking(&request(), &CreateOptions::default()).await.unwrap();
        let mut patch = BookingPatch::new();
        patch.insert("nights".into(), json!(3));

        let updated = mock
            .update_booking(&created.provider_booking_id, &patch)
            .await
            .unwrap();
        assert_eq!(updated.status, BookingStatus::Updated);
        assert_eq!(updated.provider_booking_id, created.provider_booking_id);
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.created_at, created.created_at);

        let stored = mock.stored_request(&created.provider_booking_id).unwrap();
        assert_eq!(stored["nights"], 3);
        assert_eq!(stored["propertyId"], "P1");
    }

    #[tokio::test]
    async fn unknown_ids_report_not_found() {
        let mock = MockProvider::default();
        let updated = mock.update_booking("nope", &BookingPatch::new()).await.unwrap();
        let cancelled = mock.cancel_booking("nope", Some("test")).await.unwrap();
        assert_eq!(updated.status, BookingStatus::NotFound);
        assert_eq!(cancelled.status, BookingStatus::NotFound);
        assert_eq!(cancelled.provider_booking_id, "nope");
    }

    #[tokio::test]
    async fn cancel_is_terminal() {
        let mock = MockProvider::default();
        let created = mock.create_booking(&request(), &CreateOptions::default()).await.unwrap();
        let id = created.provider_booking_id;

        let cancelled = mock.cancel_booking(&id, Some("guest request")).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.metadata["cancelReason"], "guest request");
        let first_cancelled_at = cancelled.cancelled_at;
        assert!(first_cancelled_at.is_some());

        let mut patch = BookingPatch::new();
        patch.insert("nights".into(), json!(5));
        let after_update = mock.update_booking(&id, &patch).await.unwrap();
        assert_eq!(after_update.status, BookingStatus::Cancelled);
        assert!(mock.stored_request(&id).unwrap().get("nights").is_none());

        let again = mock.cancel_booking(&id, None).await.unwrap();
        assert_eq!(again.cancelled_at, first_cancelled_at);
    }

    #[tokio::test]
    async fn availability_uses_default_room_type() {
        let mock = MockProvider::default();
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 6, 4).unwrap();
        let result = mock
            .get_availability(&AvailabilityQuery::new("P1", start, end))
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.availability.iter().all(|e| e.room_type_id == "RT-Standard"));
        assert!(result.availability.iter().all(|e| e.available_units == 5));
        assert_eq!(result.availability[0].date, start);
    }

    #[tokio::test]
    async fn availability_is_date_major_in_query_order() {
        let mock = MockProvider::new(MockConfig {
            default_units: 2,
            ..Default::default()
        });
        let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();
        let query = AvailabilityQuery::new("P1", start, end).with_room_types(["B", "A"]);
        let result = mock.get_availability(&query).await.unwrap();
        let pairs: Vec<_> = result
            .availability
            .iter()
            .map(|e| (e.date.format("%d").to_string(), e.room_type_id.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("01".to_string(), "B"),
                ("01".to_string(), "A"),
                ("02".to_string(), "B"),
                ("02".to_string(), "A"),
            ]
        );
        assert!(result.availability.iter().all(|e| e.available_units == 2));
    }

    #[tokio::test]
    async fn availability_rejects_inverted_range() {
        let mock = MockProvider::default();
        let start = NaiveDate::from_ymd_opt(2026, 6, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(
            mock.get_availability(&AvailabilityQuery::new("P1", start, end))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn push_rates_accepts_and_records() {
        let mock = MockProvider::default();
        let payload = RatePayload(json!({"roomTypeId": "RT-1", "amount": 99}));
        let ack = mock.push_rates(&payload).await.unwrap();
        assert!(ack.is_accepted());
        assert_eq!(mock.pushed_rates(), vec![payload]);
    }
}
