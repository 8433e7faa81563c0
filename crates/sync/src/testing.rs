//! In-memory doubles and fixtures for exercising the synchronizers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::json;

use domain::models::{Dustbox, DustboxReading};

use crate::store::{DustboxStore, ReadingStore};
use crate::upstream::{PageLimit, ReadingRecord, StreamRecord, UpstreamApi, UpstreamError};

/// Millisecond timestamp used by fixtures, 2020-04-29T09:58:14Z.
pub const FIXTURE_MILLIS: f64 = 1_588_154_294_000.0;

/// In-memory dustbox and reading store with injectable upsert failures.
#[derive(Default)]
pub struct MemoryStore {
    pub dustboxes: Mutex<BTreeMap<String, Dustbox>>,
    pub readings: Mutex<BTreeMap<String, DustboxReading>>,
    failing_ids: Mutex<HashSet<String>>,
    upsert_log: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upsert of the given upstream ID fail.
    pub fn fail_on(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn seed_dustbox(&self, dustbox: Dustbox) {
        self.dustboxes
            .lock()
            .unwrap()
            .insert(dustbox.id.clone(), dustbox);
    }

    pub fn seed_reading(&self, reading: DustboxReading) {
        self.readings
            .lock()
            .unwrap()
            .insert(reading.id.clone(), reading);
    }

    /// Upstream IDs in upsert order, across both tables.
    pub fn upserts(&self) -> Vec<String> {
        self.upsert_log.lock().unwrap().clone()
    }

    fn check_failure(&self, id: &str) -> Result<(), sqlx::Error> {
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(sqlx::Error::Protocol(format!("injected failure for {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DustboxStore for MemoryStore {
    async fn list(&self, ids: Option<&[String]>) -> Result<Vec<Dustbox>, sqlx::Error> {
        let dustboxes = self.dustboxes.lock().unwrap();
        Ok(dustboxes
            .values()
            .filter(|dustbox| ids.map_or(true, |ids| ids.contains(&dustbox.id)))
            .cloned()
            .collect())
    }

    async fn upsert(&self, dustbox: &Dustbox) -> Result<(), sqlx::Error> {
        self.check_failure(&dustbox.id)?;
        self.upsert_log.lock().unwrap().push(dustbox.id.clone());
        self.dustboxes
            .lock()
            .unwrap()
            .insert(dustbox.id.clone(), dustbox.clone());
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn find(&self, id: &str) -> Result<Option<DustboxReading>, sqlx::Error> {
        Ok(self.readings.lock().unwrap().get(id).cloned())
    }

    async fn upsert(&self, reading: &DustboxReading) -> Result<(), sqlx::Error> {
        self.check_failure(&reading.id)?;
        self.upsert_log.lock().unwrap().push(reading.id.clone());
        self.readings
            .lock()
            .unwrap()
            .insert(reading.id.clone(), reading.clone());
        Ok(())
    }
}

/// A recorded readings request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingsRequest {
    pub stream_id: String,
    pub page: Option<u32>,
    pub limit: PageLimit,
}

/// Scripted upstream serving canned stream and reading pages.
#[derive(Default)]
pub struct ScriptedUpstream {
    streams: Vec<StreamRecord>,
    pages: HashMap<String, Vec<Vec<ReadingRecord>>>,
    failing_pages: HashSet<(String, u32)>,
    requests: Mutex<Vec<ReadingsRequest>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_streams(mut self, streams: Vec<StreamRecord>) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_pages(mut self, stream_id: &str, pages: Vec<Vec<ReadingRecord>>) -> Self {
        self.pages.insert(stream_id.to_string(), pages);
        self
    }

    /// Make fetching the given page of the given stream fail.
    pub fn failing_page(mut self, stream_id: &str, page: u32) -> Self {
        self.failing_pages.insert((stream_id.to_string(), page));
        self
    }

    /// Readings requests observed so far, in order.
    pub fn readings_requests(&self) -> Vec<ReadingsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamApi for ScriptedUpstream {
    async fn fetch_streams(&self) -> Result<Vec<StreamRecord>, UpstreamError> {
        Ok(self.streams.clone())
    }

    async fn fetch_readings(
        &self,
        stream_id: &str,
        page: Option<u32>,
        limit: PageLimit,
    ) -> Result<Vec<ReadingRecord>, UpstreamError> {
        self.requests.lock().unwrap().push(ReadingsRequest {
            stream_id: stream_id.to_string(),
            page,
            limit,
        });

        if let Some(page) = page {
            if self.failing_pages.contains(&(stream_id.to_string(), page)) {
                return Err(UpstreamError::Status(StatusCode::BAD_GATEWAY));
            }
        }

        let pages = self.pages.get(stream_id);
        match limit {
            PageLimit::Off => Ok(pages.map(|pages| pages.concat()).unwrap_or_default()),
            PageLimit::Size(_) => {
                let index = page.unwrap_or(0) as usize;
                Ok(pages
                    .and_then(|pages| pages.get(index))
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }
}

/// A fully populated upstream stream record.
pub fn stream_record(id: &str) -> StreamRecord {
    serde_json::from_value(json!({
        "id": id,
        "createdAt": FIXTURE_MILLIS,
        "description": format!("Monitor {id}"),
        "deviceNumber": "DB-0042",
        "entriesNumber": 128,
        "lastEntryAt": { "timestamp": FIXTURE_MILLIS },
        "location": { "latitude": "52.2552717", "longitude": "-0.6989764" },
        "publicKey": "pk-test",
        "slug": format!("monitor-{id}"),
        "title": format!("Monitor {id}"),
        "updatedAt": FIXTURE_MILLIS
    }))
    .unwrap()
}

/// A fully populated upstream reading record.
pub fn reading_record(id: &str, stream_id: &str, millis: f64) -> ReadingRecord {
    serde_json::from_value(json!({
        "id": id,
        "createdAt": millis,
        "humidity": 48.2,
        "pm1": 3.1,
        "pm2.5": 12.5,
        "pm10": 21.0,
        "streamId": stream_id,
        "temperature": 11.5
    }))
    .unwrap()
}

/// A minimal stored dustbox.
pub fn dustbox(id: &str) -> Dustbox {
    Dustbox {
        id: id.to_string(),
        created_at: Utc.with_ymd_and_hms(2020, 4, 29, 9, 58, 14).unwrap(),
        description: String::new(),
        device_number: None,
        entries_number: 0,
        last_entry_at: None,
        location: None,
        public_key: String::new(),
        slug: String::new(),
        title: String::new(),
        updated_at: None,
    }
}

/// A minimal stored reading.
pub fn reading(id: &str, dustbox_id: &str) -> DustboxReading {
    DustboxReading {
        id: id.to_string(),
        created_at: Utc.with_ymd_and_hms(2021, 1, 5, 16, 30, 0).unwrap(),
        humidity: None,
        pm1: None,
        pm2_5: None,
        pm10: None,
        temperature: None,
        dustbox_id: dustbox_id.to_string(),
    }
}
