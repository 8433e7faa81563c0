//! HTTP client for the upstream Citizen Sense data API.
//!
//! The upstream serves two collections, both wrapped in a `{ "data": [...] }`
//! envelope: the stream registry (`/streams`) and per-stream reading pages
//! (`/collections/stream/{id}`), the latter ordered newest first.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Errors raised while talking to the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),
}

/// Page length requested from the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// `limit=off`, the upstream's unlimited response.
    Off,
    /// A concrete page length.
    Size(u32),
}

impl fmt::Display for PageLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLimit::Off => f.write_str("off"),
            PageLimit::Size(size) => write!(f, "{size}"),
        }
    }
}

/// Response envelope wrapping every upstream collection.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Vec<T>,
}

/// One record in the upstream streams collection.
///
/// Scalar fields stay as raw JSON values: the upstream serves numbers,
/// numeric strings, empty strings, and sentinels interchangeably, and the
/// synchronizers normalize them through `shared::convert`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    pub id: String,
    pub created_at: Option<Value>,
    pub description: Option<String>,
    pub device_number: Option<String>,
    pub entries_number: Option<Value>,
    pub last_entry_at: Option<LastEntryRecord>,
    pub location: Option<LocationRecord>,
    pub public_key: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub updated_at: Option<Value>,
}

/// Nested `lastEntryAt` object on a stream record.
#[derive(Debug, Clone, Deserialize)]
pub struct LastEntryRecord {
    pub timestamp: Option<Value>,
}

/// Nested `location` object on a stream record.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

/// One record in an upstream reading collection page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub id: String,
    pub created_at: Option<Value>,
    pub humidity: Option<Value>,
    pub pm1: Option<Value>,
    #[serde(rename = "pm2.5")]
    pub pm2_5: Option<Value>,
    pub pm10: Option<Value>,
    pub stream_id: Option<String>,
    pub temperature: Option<Value>,
}

/// Upstream API surface the synchronizers consume.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Fetch the full list of dustbox streams.
    async fn fetch_streams(&self) -> Result<Vec<StreamRecord>, UpstreamError>;

    /// Fetch one page of a stream's readings, newest first.
    async fn fetch_readings(
        &self,
        stream_id: &str,
        page: Option<u32>,
        limit: PageLimit,
    ) -> Result<Vec<ReadingRecord>, UpstreamError>;
}

/// reqwest-backed client for the upstream API.
pub struct UpstreamClient {
    http: Client,
    base_url: String,
}

impl UpstreamClient {
    /// Create a new client against the configured base URL.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl UpstreamApi for UpstreamClient {
    async fn fetch_streams(&self) -> Result<Vec<StreamRecord>, UpstreamError> {
        self.fetch_data("/streams", &[("limit", PageLimit::Off.to_string())])
            .await
    }

    async fn fetch_readings(
        &self,
        stream_id: &str,
        page: Option<u32>,
        limit: PageLimit,
    ) -> Result<Vec<ReadingRecord>, UpstreamError> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        query.push(("limit", limit.to_string()));

        self.fetch_data(&format!("/collections/stream/{stream_id}"), &query)
            .await
    }
}
