use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::domain::availability::{AvailabilityEntry, AvailabilityQuery, AvailabilityResult};
use crate::domain::booking::{Booking, BookingPatch, BookingRequest, BookingStatus, CreateOptions};
use crate::domain::rates::{RateAck, RatePayload};
use crate::error::Result;
use crate::ports::provider::ReservationProvider;

type CreateFn = Box<dyn Fn(&BookingRequest, &CreateOptions) -> Result<Booking> + Send + Sync>;
type UpdateFn = Box<dyn Fn(&str, &BookingPatch) -> Result<Booking> + Send + Sync>;
type CancelFn = Box<dyn Fn(&str, Option<&str>) -> Result<Booking> + Send + Sync>;
type AvailabilityFn = Box<dyn Fn(&AvailabilityQuery) -> Result<AvailabilityResult> + Send + Sync>;
type RatesFn = Box<dyn Fn(&RatePayload) -> Result<RateAck> + Send + Sync>;

/// Scriptable provider: each operation runs a closure, optionally after a delay.
#[allow(clippy::struct_field_names)]
pub struct StubProvider {
    create_fn: Mutex<CreateFn>,
    update_fn: Mutex<UpdateFn>,
    cancel_fn: Mutex<CancelFn>,
    availability_fn: Mutex<AvailabilityFn>,
    rates_fn: Mutex<RatesFn>,
    delay: Duration,
    calls: AtomicU32,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    pub fn new() -> Self {
        Self {
            create_fn: Mutex::new(Box::new(|_, _| Ok(make_booking("stub-1", BookingStatus::Pending)))),
            update_fn: Mutex::new(Box::new(|id, _| Ok(make_booking(id, BookingStatus::Updated)))),
            cancel_fn: Mutex::new(Box::new(|id, _| Ok(make_booking(id, BookingStatus::Cancelled)))),
            availability_fn: Mutex::new(Box::new(|q| Ok(make_availability(q, 1)))),
            rates_fn: Mutex::new(Box::new(|_| Ok(RateAck(json!({"accepted": true}))))),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn with_create(
        self,
        f: impl Fn(&BookingRequest, &CreateOptions) -> Result<Booking> + Send + Sync + 'static,
    ) -> Self {
        *self.create_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_update(
        self,
        f: impl Fn(&str, &BookingPatch) -> Result<Booking> + Send + Sync + 'static,
    ) -> Self {
        *self.update_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_cancel(
        self,
        f: impl Fn(&str, Option<&str>) -> Result<Booking> + Send + Sync + 'static,
    ) -> Self {
        *self.cancel_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_availability(
        self,
        f: impl Fn(&AvailabilityQuery) -> Result<AvailabilityResult> + Send + Sync + 'static,
    ) -> Self {
        *self.availability_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_rates(
        self,
        f: impl Fn(&RatePayload) -> Result<RateAck> + Send + Sync + 'static,
    ) -> Self {
        *self.rates_fn.lock().unwrap() = Box::new(f);
        self
    }

    /// Sleep this long before answering any operation.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl ReservationProvider for StubProvider {
    async fn create_booking(&self, data: &BookingRequest, opts: &CreateOptions) -> Result<Booking> {
        self.enter().await;
        let f = self.create_fn.lock().unwrap();
        f(data, opts)
    }

    async fn update_booking(
        &self,
        provider_booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<Booking> {
        self.enter().await;
        let f = self.update_fn.lock().unwrap();
        f(provider_booking_id, patch)
    }

    async fn cancel_booking(
        &self,
        provider_booking_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking> {
        self.enter().await;
        let f = self.cancel_fn.lock().unwrap();
        f(provider_booking_id, reason)
    }

    async fn get_availability(&self, query: &AvailabilityQuery) -> Result<AvailabilityResult> {
        self.enter().await;
        let f = self.availability_fn.lock().unwrap();
        f(query)
    }

    async fn push_rates(&self, payload: &RatePayload) -> Result<RateAck> {
        self.enter().await;
        let f = self.rates_fn.lock().unwrap();
        f(payload)
    }
}

// --- Factory functions ---

pub fn make_booking(id: &str, status: BookingStatus) -> Booking {
    let now = Utc::now();
    Booking {
        provider_booking_id: id.to_string(),
        status,
        created_at: Some(now),
        updated_at: (status == BookingStatus::Updated).then_some(now),
        cancelled_at: (status == BookingStatus::Cancelled).then_some(now),
        metadata: serde_json::Map::new(),
    }
}

pub fn make_request(property_id: &str) -> BookingRequest {
    let mut data = BookingRequest::new();
    data.insert("propertyId".into(), json!(property_id));
    data.insert("guest".into(), json!({"firstName": "T"}));
    data
}

pub fn make_availability(query: &AvailabilityQuery, units: u32) -> AvailabilityResult {
    AvailabilityResult {
        availability: query
            .dates()
            .map(|date| AvailabilityEntry {
                date,
                room_type_id: "RT-Standard".into(),
                available_units: units,
            })
            .collect(),
    }
}
