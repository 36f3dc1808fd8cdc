use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, Utc};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use reservation_bridge::client::ProviderClient;
use reservation_bridge::config::load_config_with_env;
use reservation_bridge::domain::availability::AvailabilityQuery;
use reservation_bridge::domain::booking::{BookingPatch, BookingRequest, CreateOptions};
use reservation_bridge::ports::provider::ReservationProvider;

fn find_config_path() -> PathBuf {
    if let Some(path) = std::env::args_os().nth(1) {
        return PathBuf::from(path);
    }

    let candidates = [
        PathBuf::from("config.yaml"),
        exe_dir().join("config.yaml"),
    ];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config_path = find_config_path();
    let config = load_config_with_env(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    let client = ProviderClient::from_config(&config)?;

    tracing::info!(mode = %client.mode(), "Running booking lifecycle check");

    let mut request = BookingRequest::new();
    request.insert("propertyId".into(), json!("P1"));
    request.insert("guest".into(), json!({"firstName": "Test", "lastName": "Guest"}));
    request.insert("nights".into(), json!(2));

    let opts = CreateOptions::with_idempotency_key(Uuid::new_v4().to_string());
    let created = client.create_booking(&request, &opts).await?;
    println!("{}", serde_json::to_string_pretty(&created)?);

    let mut patch = BookingPatch::new();
    patch.insert("nights".into(), json!(3));
    let updated = client
        .update_booking(&created.provider_booking_id, &patch)
        .await?;
    println!("{}", serde_json::to_string_pretty(&updated)?);

    let cancelled = client
        .cancel_booking(&created.provider_booking_id, Some("lifecycle check"))
        .await?;
    println!("{}", serde_json::to_string_pretty(&cancelled)?);

    let today = Utc::now().date_naive();
    let end = today
        .checked_add_days(Days::new(3))
        .context("date range overflow")?;
    let availability = client
        .get_availability(&AvailabilityQuery::new("P1", today, end))
        .await?;
    println!("{}", serde_json::to_string_pretty(&availability)?);

    Ok(())
}
