//! Concurrent download of the quarterly full-index archives

pub mod endpoints;
pub mod fetch;

pub use endpoints::{current_endpoints, generate_endpoints};
pub use fetch::{extract_entry, fetch_index_file, TARGET_ENTRY};

use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::IndexError;
use crate::models::{Endpoint, FetchOutcome};

/// Fetch every quarter in the configured year range into the save directory.
///
/// Per-endpoint failures are logged and returned in the outcomes; only
/// setup problems (directory creation, HTTP client) are returned as errors.
pub async fn download_index_files(config: &Config) -> Result<Vec<FetchOutcome>, IndexError> {
    info!("Started downloading from year: {}", config.start_year);
    info!(
        "Downloaded files will be saved to: {}",
        config.save_directory.display()
    );

    tokio::fs::create_dir_all(&config.save_directory).await?;

    let client = Client::builder()
        .user_agent(&config.http.user_agent)
        .timeout(config.http_timeout())
        .build()?;

    let endpoints = current_endpoints(&config.base_url, config.start_year, config.end_year);
    info!("Found {} quarterly index archives to fetch", endpoints.len());

    let save_dir = Arc::new(config.save_directory.clone());
    let outcomes = fan_out(endpoints, config.max_concurrent_downloads, move |endpoint| {
        let client = client.clone();
        let save_dir = save_dir.clone();
        async move { fetch_index_file(&client, &endpoint, &save_dir).await }
    })
    .await;

    Ok(outcomes)
}

/// Run `worker` once per endpoint concurrently and collect one outcome each,
/// in arrival order.
///
/// At most `max_concurrent` workers run at once; 0 launches all of them
/// immediately. A worker that panics is reported as a failed outcome.
pub async fn fan_out<F, Fut>(
    endpoints: Vec<Endpoint>,
    max_concurrent: usize,
    worker: F,
) -> Vec<FetchOutcome>
where
    F: Fn(Endpoint) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = FetchOutcome> + Send + 'static,
{
    let total = endpoints.len();
    if total == 0 {
        return Vec::new();
    }

    let limiter = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));
    let capacity = if max_concurrent > 0 {
        max_concurrent.min(total)
    } else {
        total
    };
    let (tx, mut rx) = mpsc::channel::<FetchOutcome>(capacity);

    for endpoint in endpoints {
        let tx = tx.clone();
        let worker = worker.clone();
        let limiter = limiter.clone();
        tokio::spawn(async move {
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };
            let locator = endpoint.locator.clone();
            let outcome = match tokio::spawn(worker(endpoint)).await {
                Ok(outcome) => outcome,
                Err(e) => FetchOutcome::failed(locator, IndexError::Join(e)),
            };
            // Receiver only goes away if the coordinator itself was dropped
            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    let mut outcomes = Vec::with_capacity(total);
    while outcomes.len() < total {
        let Some(outcome) = rx.recv().await else {
            break;
        };
        if outcome.is_success() {
            info!("{}", outcome);
        } else {
            warn!("{}", outcome);
        }
        outcomes.push(outcome);
    }

    if outcomes.len() < total {
        error!("Collected {} of {} fetch outcomes", outcomes.len(), total);
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        "Fetched {} index archives ({} succeeded, {} failed)",
        outcomes.len(),
        outcomes.len() - failed,
        failed
    );

    outcomes
}
