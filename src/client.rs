use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::live::client::HttpProvider;
use crate::adapters::mock::MockProvider;
use crate::config::types::{Config, ProviderConfig};
use crate::domain::availability::{AvailabilityQuery, AvailabilityResult};
use crate::domain::booking::{Booking, BookingPatch, BookingRequest, CreateOptions};
use crate::domain::rates::{RateAck, RatePayload};
use crate::error::{ProviderError, Result};
use crate::ports::provider::ReservationProvider;

/// Which backing implementation a client was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Mock,
    Live,
}

impl ProviderMode {
    /// Mock when forced, or when no live base URL is configured.
    pub fn select(config: &ProviderConfig) -> Self {
        if config.use_mock || config.live_base_url().is_none() {
            Self::Mock
        } else {
            Self::Live
        }
    }
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Mode-agnostic entry point for the five provider operations.
///
/// The backing provider is fixed at construction. Every call is bounded by
/// the deadline, which also cuts short any pending retry backoff.
#[derive(Clone)]
pub struct ProviderClient {
    provider: Arc<dyn ReservationProvider>,
    mode: ProviderMode,
    deadline: Option<Duration>,
}

impl ProviderClient {
    pub fn new(
        provider: Arc<dyn ReservationProvider>,
        mode: ProviderMode,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            mode,
            deadline,
        }
    }

    /// Build the provider `config` selects. `call_deadline_secs: 0` disables the deadline.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mode = ProviderMode::select(&config.provider);
        let provider: Arc<dyn ReservationProvider> = match mode {
            ProviderMode::Mock => {
                if config.provider.use_mock {
                    info!("Mock mode forced by configuration");
                } else {
                    info!("No provider base URL configured, using mock provider");
                }
                Arc::new(MockProvider::new(config.mock.clone()))
            }
            ProviderMode::Live => Arc::new(HttpProvider::new(
                &config.provider,
                &config.retry,
                &config.mock,
            )?),
        };
        let deadline = (config.provider.call_deadline_secs > 0)
            .then(|| Duration::from_secs(config.provider.call_deadline_secs));
        Ok(Self::new(provider, mode, deadline))
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// A client sharing this provider with a different per-call deadline.
    #[must_use]
    pub fn with_deadline(&self, deadline: Duration) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            mode: self.mode,
            deadline: Some(deadline),
        }
    }

    async fn bounded<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>> + Send,
    {
        debug!(operation, mode = %self.mode, "Provider call");
        let result = match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout { after: deadline }),
            },
            None => call.await,
        };
        if let Err(e) = &result {
            warn!(operation, mode = %self.mode, error = %e, "Provider call failed");
        }
        result
    }
}

#[async_trait]
impl ReservationProvider for ProviderClient {
    async fn create_booking(&self, data: &BookingRequest, opts: &CreateOptions) -> Result<Booking> {
        let booking = self
            .bounded("create_booking", self.provider.create_booking(data, opts))
            .await?;
        info!(
            provider_booking_id = %booking.provider_booking_id,
            status = %booking.status,
            idempotent = opts.idempotency_key.is_some(),
            "Booking created"
        );
        Ok(booking)
    }

    async fn update_booking(
        &self,
        provider_booking_id: &str,
        patch: &BookingPatch,
    ) -> Result<Booking> {
        self.bounded(
            "update_booking",
            self.provider.update_booking(provider_booking_id, patch),
        )
        .await
    }

    async fn cancel_booking(
        &self,
        provider_booking_id: &str,
        reason: Option<&str>,
    ) -> Result<Booking> {
        self.bounded(
            "cancel_booking",
            self.provider.cancel_booking(provider_booking_id, reason),
        )
        .await
    }

    async fn get_availability(&self, query: &AvailabilityQuery) -> Result<AvailabilityResult> {
        self.bounded("get_availability", self.provider.get_availability(query))
            .await
    }

    async fn push_rates(&self, payload: &RatePayload) -> Result<RateAck> {
        self.bounded("push_rates", self.provider.push_rates(payload))
            .await
    }
}
