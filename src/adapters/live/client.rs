use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::adapters::live::retry::{AttemptFailure, Classification, RetryPolicy, classify};
use crate::adapters::live::transport::{HttpTransport, ProviderRequest, RawResponse};
use crate::adapters::normalizer::{self, BookingOperation};
use crate::config::types::{MockConfig, ProviderConfig, RetryConfig};
use crate::domain::availability::{AvailabilityQuery, AvailabilityResult};
use crate::domain::booking::{Booking, BookingPatch, BookingRequest, CreateOptions};
use crate::domain::rates::{RateAck, RatePayload};
use crate::error::{ProviderError, Result};
use crate::ports::provider::ReservationProvider;

/// Provider backed by the live HTTP API.
pub struct HttpProvider {
    transport: HttpTransport,
    policy: RetryPolicy,
    /// Applied to update/cancel; single-attempt unless `retry_mutations` is set.
    mutation_policy: RetryPolicy,
    default_room_type: String,
}

impl HttpProvider {
    pub fn new(provider: &ProviderConfig, retry: &RetryConfig, mock: &MockConfig) -> Result<Self> {
        let base_url = provider.live_base_url().ok_or_else(|| {
            ProviderError::Config("live provider requires a non-empty base_url".into())
        })?;
        let transport = HttpTransport::new(
            base_url,
            provider.api_key.clone(),
            Duration::from_secs(provider.request_timeout_secs),
            &provider.user_agent,
        )?;
        let policy = RetryPolicy::from_config(retry);
        let mutation_policy = if retry.retry_mutations {
            policy.clone()
        } else {
            policy.without_retries()
        };

        info!(
            base_url = %transport.base_url(),
            max_retries = policy.max_retries(),
            retry_mutations = retry.retry_mutations,
            "Live provider configured"
        );

        Ok(Self {
            transport,
            policy,
            mutation_policy,
            default_room_type: mock.default_room_type.clone(),
        })
    }

    /// Issue `request` under `policy` and return the success body.
    async fn exchange(
        &self,
        operation: &'static str,
        policy: &RetryPolicy,
        request: &ProviderRequest<'_>,
    ) -> Result<Value> {
        policy
            .run(operation, |attempt| async move {
                debug!(operation, attempt, "Provider attempt");
                let response = self.transport.send(request).await?;
                into_outcome(response)
            })
            .await
    }

    /// Like `exchange`, but a 404 becomes `None` so callers can report `not_found`.
    async fn exchange_addressed(
        &self,
        operation: &'static str,
        policy: &RetryPolicy,
        request: &ProviderRequest<'_>,
    ) -> Result<Option<Value>> {
        match self.exchange(operation, policy, request).await {
            Ok(body) => Ok(Some(body)),
            Err(ProviderError::Terminal { status: 404, .. }) => {
                debug!(operation, "Provider reported unknown booking (404)");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn into_outcome(response: RawResponse) -> std::result::Result<Value, AttemptFailure> {
    let RawResponse {
        status,
        retry_after,
        body,
    } = response;
    match classify(status) {
        Classification::Success => Ok(body),
        Classification::Transient => Err(AttemptFailure {
            error: ProviderError::Transient {
                status: Some(status),
                body,
                message: format!("provider answered HTTP {status}"),
            },
            retry_after,
        }),
        Classification::Terminal => Err(ProviderError::Terminal { status, body }.into()),
    }
}

#[async_trait]
impl ReservationProvider for HttpProvider {
    async fn create_booking(&self, data: &BookingRequest, opts: &CreateOptions) -> Result<Booking> {
        let body = Value::Object(data.clone());
        let request = ProviderRequest::new(Method::POST, vec!["bookings"])
            .json(&body)
            .idempotency_key(opts.idempotency_key.as_deref());

        let response = self
            .exchange(BookingOperation::Create.name(), &self.policy, &request)
            .await?;
        normalizer::normalize_booking(BookingOperation::Create, &response, None)
    }

    async fn update_booking(
        &self,
        provider_booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<Booking> {
        let body = Value::Object(patch.clone());
        let request =
            ProviderRequest::new(Method::PUT, vec!["bookings", provider_booking_id]).json(&body);

        match self
            .exchange_addressed(BookingOperation::Update.name(), &self.mutation_policy, &request)
            .await?
        {
            Some(response) => normalizer::normalize_booking(
                BookingOperation::Update,
                &response,
                Some(provider_booking_id),
            ),
            None => Ok(Booking::not_found(provider_booking_id)),
        }
    }

    async fn cancel_booking(
        &self,
        provider_booking_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking> {
        let mut fields = Map::new();
        if let Some(reason) = reason {
            fields.insert("reason".to_string(), Value::String(reason.to_string()));
        }
        let body = Value::Object(fields);
        let request =
            ProviderRequest::new(Method::POST, vec!["bookings", provider_booking_id, "cancel"])
                .json(&body);

        match self
            .exchange_addressed(BookingOperation::Cancel.name(), &self.mutation_policy, &request)
            .await?
        {
            Some(response) => normalizer::normalize_booking(
                BookingOperation::Cancel,
                &response,
                Some(provider_booking_id),
            ),
            None => Ok(Booking::not_found(provider_booking_id)),
        }
    }

    async fn get_availability(&self, query: &AvailabilityQuery) -> Result<AvailabilityResult> {
        query.validate()?;

        let mut request = ProviderRequest::new(Method::GET, vec!["availability"])
            .query("propertyId", query.property_id.clone())
            .query("startDate", query.start_date.format("%Y-%m-%d").to_string())
            .query("endDate", query.end_date.format("%Y-%m-%d").to_string());
        if !query.room_type_ids.is_empty() {
            request = request.query("roomTypeIds", query.room_type_ids.join(","));
        }

        let response = self
            .exchange("get_availability", &self.policy, &request)
            .await?;
        normalizer::normalize_availability(&response, &self.default_room_type)
    }

    async fn push_rates(&self, payload: &RatePayload) -> Result<RateAck> {
        let request = ProviderRequest::new(Method::POST, vec!["rates"]).json(&payload.0);
        let response = self.exchange("push_rates", &self.policy, &request).await?;
        Ok(normalizer::normalize_rate_ack(response))
    }
}
