use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Per-client admission control: one admitted request per interval.
//
// Keyed by client address. A denied request leaves the stored timestamp
// alone, so a client that keeps hammering stays denied until it backs off.
pub struct Throttle {
    last_admitted: DashMap<String, Instant>,
    interval: Duration,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_admitted: DashMap::new(),
            interval,
        }
    }

    pub fn admit(&self, client: &str) -> bool {
        self.admit_at(client, Instant::now())
    }

    pub(crate) fn admit_at(&self, client: &str, now: Instant) -> bool {
        match self.last_admitted.entry(client.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(mut slot) => {
                if now.saturating_duration_since(*slot.get()) >= self.interval {
                    slot.insert(now);
                    return true;
                }
                false
            }
        }
    }

    // Drop records that can no longer deny anything
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let before = self.last_admitted.len();
        self.last_admitted
            .retain(|_, last| now.saturating_duration_since(*last) < self.interval);
        before.saturating_sub(self.last_admitted.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.last_admitted.len()
    }
}

// Background eviction loop
pub async fn sweeper(throttle: Arc<Throttle>, every: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);

    loop {
        interval.tick().await;
        let removed = throttle.sweep();
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = throttle.tracked_clients(),
                "swept throttle records"
            );
        }
    }
}
