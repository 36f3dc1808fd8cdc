use async_trait::async_trait;

use crate::domain::availability::{AvailabilityQuery, AvailabilityResult};
use crate::domain::booking::{Booking, BookingPatch, BookingRequest, CreateOptions};
use crate::domain::rates::{RateAck, RatePayload};
use crate::error::Result;

/// The five canonical operations every backing provider implements.
///
/// Unknown booking ids yield `Ok` with `BookingStatus::NotFound` rather than an error.
#[async_trait]
pub trait ReservationProvider: Send + Sync {
    async fn create_booking(&self, data: &BookingRequest, opts: &CreateOptions) -> Result<Booking>;
    async fn update_booking(
        &self,
        provider_booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<Booking>;
    async fn cancel_booking(
        &self,
        provider_booking_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking>;
    async fn get_availability(&self, query: &AvailabilityQuery) -> Result<AvailabilityResult>;
    async fn push_rates(&self, payload: &RatePayload) -> Result<RateAck>;
}
