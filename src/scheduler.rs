use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval_at};

use crate::fetcher::FetchExecutor;
use crate::registry::Registry;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

// Periodically re-fetches the busiest URLs
pub struct FetchScheduler {
    registry: Arc<Registry>,
    executor: FetchExecutor,
    top_n: usize,
    every: Duration,
}

impl FetchScheduler {
    pub fn new(
        registry: Arc<Registry>,
        executor: FetchExecutor,
        top_n: usize,
        every: Duration,
    ) -> Self {
        Self {
            registry,
            executor,
            top_n,
            every,
        }
    }

    // URLs with the highest visit counts, busiest first
    pub fn select(&self) -> Vec<String> {
        let mut entries = self.registry.list_all();
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries.truncate(self.top_n);
        entries.into_iter().map(|e| e.url).collect()
    }

    // One round: select, dispatch everything, wait for every fetch to finish.
    // The executor's slots bound how many of them hit the network at once.
    pub async fn run_round(&self) -> RoundReport {
        let urls = self.select();
        let mut report = RoundReport {
            selected: urls.len(),
            ..RoundReport::default()
        };

        let mut round = JoinSet::new();
        for url in urls {
            let executor = self.executor.clone();
            round.spawn(async move { executor.fetch(&url).await });
        }

        while let Some(res) = round.join_next().await {
            match res {
                Ok(outcome) if outcome.is_success() => report.succeeded += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "fetch task aborted");
                    report.failed += 1;
                }
            }
        }

        report
    }

    // Runs until the process exits. Rounds never overlap: the next tick is
    // only awaited once the current round has drained.
    pub async fn run(self) {
        let mut ticker = interval_at(tokio::time::Instant::now() + self.every, self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.every.as_secs(),
            top_n = self.top_n,
            max_in_flight = self.executor.max_in_flight(),
            "fetch scheduler started"
        );

        loop {
            ticker.tick().await;
            tracing::info!("running background fetch");
            let report = self.run_round().await;
            tracing::info!(
                selected = report.selected,
                succeeded = report.succeeded,
                failed = report.failed,
                "background fetch completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::build_client;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scheduler(registry: Arc<Registry>, max: usize) -> FetchScheduler {
        let client = build_client(Duration::from_secs(5)).unwrap();
        let executor = FetchExecutor::new(client, Arc::clone(&registry), max);
        FetchScheduler::new(registry, executor, 10, Duration::from_secs(60))
    }

    fn submit(registry: &Registry, url: &str, times: u64) {
        for _ in 0..times {
            registry.upsert(url);
        }
    }

    #[test]
    fn select_takes_top_ten_by_count() {
        let registry = Arc::new(Registry::new());
        for i in 1..=15 {
            submit(&registry, &format!("http://{i}.test"), i);
        }

        let selected = scheduler(Arc::clone(&registry), 3).select();
        assert_eq!(selected.len(), 10);
        assert_eq!(selected[0], "http://15.test");
        for i in 6..=15 {
            assert!(selected.contains(&format!("http://{i}.test")));
        }
    }

    #[test]
    fn select_with_few_entries_takes_all() {
        let registry = Arc::new(Registry::new());
        submit(&registry, "http://a.test", 1);
        submit(&registry, "http://b.test", 2);

        let selected = scheduler(registry, 3).select();
        assert_eq!(selected, vec!["http://b.test", "http://a.test"]);
    }

    #[tokio::test]
    async fn empty_registry_round_is_a_noop() {
        let registry = Arc::new(Registry::new());
        let report = scheduler(registry, 3).run_round().await;
        assert_eq!(report, RoundReport::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn round_fetches_busiest_ten_exactly_once() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(50)))
            .expect(10)
            .mount(&mock_server)
            .await;

        let registry = Arc::new(Registry::new());
        let url_for = |i: u64| format!("{}/page/{i}", mock_server.uri());
        for i in 1..=15 {
            submit(&registry, &url_for(i), i);
        }

        let sched = scheduler(Arc::clone(&registry), 3);
        let report = sched.run_round().await;
        assert_eq!(
            report,
            RoundReport {
                selected: 10,
                succeeded: 10,
                failed: 0
            }
        );

        // the round only returns after every fetch has recorded its outcome
        for i in 1..=15 {
            let entry = registry.get(&url_for(i)).unwrap();
            if i > 5 {
                assert_eq!(entry.success_count, 1, "url {i}");
                assert!(entry.last_fetched.is_some());
            } else {
                assert_eq!(entry.success_count, 0, "url {i}");
                assert!(entry.last_fetched.is_none());
            }
        }
        assert_eq!(sched.executor.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn round_never_exceeds_the_slot_cap() {
        let delay = Duration::from_millis(200);
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .expect(10)
            .mount(&mock_server)
            .await;

        let registry = Arc::new(Registry::new());
        for i in 1..=10 {
            submit(&registry, &format!("{}/slot/{i}", mock_server.uri()), i);
        }
        let sched = scheduler(Arc::clone(&registry), 3);

        let peak = AtomicUsize::new(0);
        let done = AtomicBool::new(false);
        let start = Instant::now();

        let round = async {
            let report = sched.run_round().await;
            done.store(true, Ordering::SeqCst);
            report
        };
        let sampler = async {
            while !done.load(Ordering::SeqCst) {
                peak.fetch_max(sched.executor.in_flight(), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        let (report, ()) = tokio::join!(round, sampler);

        assert_eq!(report.succeeded, 10);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak > 0 && peak <= 3, "peak in flight was {peak}");
        // ten fetches through three slots need four waves
        assert!(start.elapsed() >= delay * 4);
        assert_eq!(sched.executor.in_flight(), 0);
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_round() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let registry = Arc::new(Registry::new());
        let good = mock_server.uri();
        let bad = "http://127.0.0.1:1/".to_string();
        submit(&registry, &good, 2);
        submit(&registry, &bad, 3);

        let report = scheduler(Arc::clone(&registry), 1).run_round().await;
        assert_eq!(report.selected, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(registry.get(&bad).unwrap().failure_count, 1);
        assert_eq!(registry.get(&good).unwrap().success_count, 1);
    }
}
