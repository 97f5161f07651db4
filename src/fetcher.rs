use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::metrics::{FETCH_FAILURE, FETCH_LATENCY, FETCH_SUCCESS};
use crate::registry::Registry;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("fetch slots closed")]
    SlotsClosed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchOutcome {
    Success { elapsed: Duration },
    Failure,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

// Single-attempt fetches sharing a fixed pool of slots.
//
// Cloning is cheap and every clone shares the same slot pool, so the cap
// holds across the scheduler and on-demand lookups alike.
#[derive(Clone)]
pub struct FetchExecutor {
    client: reqwest::Client,
    registry: Arc<Registry>,
    slots: Arc<Semaphore>,
    max_in_flight: usize,
}

impl FetchExecutor {
    pub fn new(client: reqwest::Client, registry: Arc<Registry>, max_in_flight: usize) -> Self {
        Self {
            client,
            registry,
            slots: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.slots.available_permits()
    }

    // Fetch once and record the outcome. Never returns an error: failures are
    // logged and counted against the entry.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.attempt(url).await {
            Ok(elapsed) => {
                let secs = elapsed.as_secs_f64();
                self.registry.record_fetch_success(url, secs);
                FETCH_SUCCESS.inc();
                FETCH_LATENCY.observe(secs);
                tracing::debug!(%url, elapsed_secs = secs, "fetched url");
                FetchOutcome::Success { elapsed }
            }
            Err(e) => {
                self.registry.record_fetch_failure(url);
                FETCH_FAILURE.inc();
                tracing::warn!(%url, error = %e, "failed to fetch url");
                FetchOutcome::Failure
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<Duration, FetchError> {
        // held until this function returns, on every path
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| FetchError::SlotsClosed)?;

        let start = Instant::now();
        self.client.get(url).send().await?;
        Ok(start.elapsed())
    }
}
