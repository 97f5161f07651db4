use std::sync::Arc;

use crate::fetcher::FetchExecutor;
use crate::rate_limit::Throttle;
use crate::registry::Registry;

// app's shared state
pub struct AppState {
    pub registry: Arc<Registry>,
    pub throttle: Arc<Throttle>,
    pub fetcher: FetchExecutor, // shares its slot pool with the scheduler
    pub refresh_on_lookup: bool, // background fetch on GET /url
}
