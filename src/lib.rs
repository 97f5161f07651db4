pub mod config;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod snapshot;
pub mod state;
pub mod telemetry;
