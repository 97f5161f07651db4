use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;

use crate::models::UrlEntry;

// Every tracked URL and its statistics.
//
// All mutations run while the entry's shard guard is held, so concurrent
// increments on the same key never get lost. Guards are never returned to
// callers; reads hand out clones.
#[derive(Default)]
pub struct Registry {
    entries: DashMap<String, UrlEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Count one submission, creating the entry on first sight
    pub fn upsert(&self, url: &str) -> UrlEntry {
        let entry = self
            .entries
            .entry(url.to_string())
            .and_modify(|e| e.count += 1)
            .or_insert_with(|| UrlEntry::new(url));
        entry.value().clone()
    }

    pub fn get(&self, url: &str) -> Option<UrlEntry> {
        self.entries.get(url).map(|e| e.value().clone())
    }

    pub fn list_all(&self) -> Vec<UrlEntry> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    pub fn record_fetch_success(&self, url: &str, duration_secs: f64) {
        if let Some(mut entry) = self.entries.get_mut(url) {
            entry.last_fetched = Some(Utc::now());
            entry.fetch_time = duration_secs;
            entry.success_count += 1;
        }
    }

    pub fn record_fetch_failure(&self, url: &str) {
        if let Some(mut entry) = self.entries.get_mut(url) {
            entry.failure_count += 1;
        }
    }

    // Hydrate from a snapshot, before any traffic is served
    pub fn load_snapshot(&self, entries: HashMap<String, UrlEntry>) {
        for (url, entry) in entries {
            self.entries.insert(url, entry);
        }
    }

    pub fn snapshot(&self) -> HashMap<String, UrlEntry> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
