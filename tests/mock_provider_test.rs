use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;

use reservation_bridge::adapters::mock::MockProvider;
use reservation_bridge::client::{ProviderClient, ProviderMode};
use reservation_bridge::config::types::{Config, MockConfig};
use reservation_bridge::domain::availability::AvailabilityQuery;
use reservation_bridge::domain::booking::{BookingPatch, BookingRequest, BookingStatus, CreateOptions};
use reservation_bridge::domain::rates::RatePayload;
use reservation_bridge::ports::provider::ReservationProvider;

fn request() -> BookingRequest {
    let mut data = BookingRequest::new();
    data.insert("propertyId".into(), json!("P1"));
    data.insert("guest".into(), json!({"firstName": "T"}));
    data
}

fn mock_client() -> ProviderClient {
    let client = ProviderClient::from_config(&Config::default()).unwrap();
    assert_eq!(client.mode(), ProviderMode::Mock);
    client
}

#[tokio::test]
async fn full_booking_lifecycle() {
    let client = mock_client();

    let created = client
        .create_booking(&request(), &CreateOptions::default())
        .await
        .unwrap();
    assert!(created.provider_booking_id.starts_with("mock-"));
    assert_eq!(created.status, BookingStatus::Pending);
    let id = created.provider_booking_id.clone();

    let mut patch = BookingPatch::new();
    patch.insert("nights".into(), json!(3));
    let updated = client.update_booking(&id, &patch).await.unwrap();
    assert_eq!(updated.status, BookingStatus::Updated);
    assert_eq!(updated.provider_booking_id, id);

    let cancelled = client.cancel_booking(&id, Some("test")).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let after = client.update_booking(&id, &patch).await.unwrap();
    assert_eq!(after.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn idempotent_create_returns_same_booking() {
    let client = mock_client();
    let opts = CreateOptions::with_idempotency_key("retry-safe-1");
    let first = client.create_booking(&request(), &opts).await.unwrap();
    let second = client.create_booking(&request(), &opts).await.unwrap();
    assert_eq!(first.provider_booking_id, second.provider_booking_id);

    let other = client
        .create_booking(&request(), &CreateOptions::with_idempotency_key("retry-safe-2"))
        .await
        .unwrap();
    assert_ne!(first.provider_booking_id, other.provider_booking_id);
}

#[tokio::test]
async fn three_day_availability_window() {
    let client = mock_client();
    let start = NaiveDate::from_ymd_opt(2026, 7, 10).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 7, 13).unwrap();
    let result = client
        .get_availability(&AvailabilityQuery::new("P1", start, end))
        .await
        .unwrap();

    let dates: Vec<_> = result.availability.iter().map(|e| e.date).collect();
    assert_eq!(
        dates,
        vec![
            start,
            NaiveDate::from_ymd_opt(2026, 7, 11).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 12).unwrap(),
        ]
    );
    assert!(result
        .availability
        .iter()
        .all(|e| e.room_type_id == "RT-Standard" && e.available_units == 5));
}

#[tokio::test]
async fn empty_range_yields_no_entries() {
    let client = mock_client();
    let day = NaiveDate::from_ymd_opt(2026, 7, 10).unwrap();
    let result = client
        .get_availability(&AvailabilityQuery::new("P1", day, day))
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn configured_mock_defaults_apply() {
    let mut config = Config::default();
    config.provider.use_mock = true;
    config.provider.base_url = Some("https://api.example.com".into());
    config.mock = MockConfig {
        default_units: 9,
        default_room_type: "RT-Suite".into(),
    };
    let client = ProviderClient::from_config(&config).unwrap();
    assert_eq!(client.mode(), ProviderMode::Mock);

    let start = NaiveDate::from_ymd_opt(2026, 7, 10).unwrap();
    let end = NaiveDate::from_ymd_opt(2026, 7, 11).unwrap();
    let result = client
        .get_availability(&AvailabilityQuery::new("P1", start, end))
        .await
        .unwrap();
    assert_eq!(result.units_for(start, "RT-Suite"), Some(9));
}

#[tokio::test]
async fn rates_are_accepted_and_recorded() {
    let mock = Arc::new(MockProvider::default());
    let client = ProviderClient::new(
        Arc::clone(&mock) as Arc<dyn ReservationProvider>,
        ProviderMode::Mock,
        None,
    );

    let payload = RatePayload(json!({"roomTypeId": "RT-1", "amount": 120, "currency": "EUR"}));
    let ack = client.push_rates(&payload).await.unwrap();
    assert_eq!(ack.0, json!({"accepted": true}));
    assert_eq!(mock.pushed_rates(), vec![payload]);
}

#[tokio::test]
async fn concurrent_creates_are_all_stored() {
    let mock = Arc::new(MockProvider::default());
    let mut handles = Vec::new();
    for _ in 0..16 {
        let mock = Arc::clone(&mock);
        handles.push(tokio::spawn(async move {
            mock.create_booking(&request(), &CreateOptions::default())
                .await
                .unwrap()
        }));
    }
    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().provider_booking_id);
    }
    assert_eq!(ids.len(), 16);
    assert_eq!(mock.booking_count(), 16);
}
