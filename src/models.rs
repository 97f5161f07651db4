use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Statistics for one tracked URL, also the on-disk snapshot format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub url: String,
    pub count: u64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub last_fetched: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fetch_time: f64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    pub created_at: DateTime<Utc>,
}

impl UrlEntry {
    // First sighting of a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            count: 1,
            last_fetched: None,
            fetch_time: 0.0,
            success_count: 0,
            failure_count: 0,
            created_at: Utc::now(),
        }
    }
}

// Older snapshots wrote "" for a URL that was never fetched
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

// POST /api/v1/url body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubmitUrl {
    pub url: String,
}

// GET /api/v1/url query
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

// GET /api/v1/urls query
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    // ascending by count
    Smallest,
    // newest first
    Newest,
}

impl SortOrder {
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("smallest") => SortOrder::Smallest,
            _ => SortOrder::Newest,
        }
    }

    pub fn sort(self, entries: &mut [UrlEntry]) {
        match self {
            SortOrder::Smallest => entries.sort_by(|a, b| a.count.cmp(&b.count)),
            SortOrder::Newest => entries.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}
