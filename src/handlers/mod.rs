mod health;
mod metrics;
mod throttle;
mod url;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use throttle::throttle;
pub use url::{get_url, list_urls, submit_url};

// Upper bound on GET /urls results
pub const LIST_LIMIT: usize = 50;
