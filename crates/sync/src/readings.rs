//! Reading synchronizer: incremental, resumable pull of per-dustbox
//! reading history.

use std::collections::HashSet;

use tracing::{error, info, warn};

use domain::models::{Dustbox, DustboxReading};
use shared::convert::{convert_float, convert_timestamp};

use crate::error::{MapError, RecordError, RecordKind, SyncError};
use crate::options::SyncOptions;
use crate::store::{DustboxStore, ReadingStore};
use crate::upstream::{PageLimit, ReadingRecord, UpstreamApi};

/// Why a dustbox's sync loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An already-stored reading was encountered; everything older is
    /// assumed present.
    UpToDate,
    /// The upstream returned an empty page; history exhausted.
    Exhausted,
    /// The per-dustbox reading cap bounded the run.
    PageCeiling,
    /// A page fetch failed; the dustbox was abandoned for this run.
    Aborted,
    /// Full-backfill mode fetched the entire history in one response.
    Backfilled,
}

/// Counters for one dustbox's sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DustboxSyncOutcome {
    pub dustbox_id: String,
    pub stop: StopReason,
    pub pages_fetched: u32,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DustboxSyncOutcome {
    fn new(dustbox_id: &str) -> Self {
        Self {
            dustbox_id: dustbox_id.to_string(),
            stop: StopReason::Exhausted,
            pages_fetched: 0,
            synced: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Counters for the whole reading phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadingSyncReport {
    pub dustboxes: usize,
    pub synced: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl ReadingSyncReport {
    fn absorb(&mut self, outcome: &DustboxSyncOutcome) {
        self.dustboxes += 1;
        self.synced += outcome.synced;
        self.failed += outcome.failed;
        if outcome.stop == StopReason::Aborted {
            self.aborted += 1;
        }
    }
}

/// Pages through each known dustbox's reading history, newest first,
/// upserting records that are not yet stored.
pub struct ReadingSynchronizer<'a, A, D, R> {
    api: &'a A,
    dustboxes: &'a D,
    readings: &'a R,
    options: &'a SyncOptions,
}

impl<'a, A, D, R> ReadingSynchronizer<'a, A, D, R>
where
    A: UpstreamApi,
    D: DustboxStore,
    R: ReadingStore,
{
    pub fn new(api: &'a A, dustboxes: &'a D, readings: &'a R, options: &'a SyncOptions) -> Self {
        Self {
            api,
            dustboxes,
            readings,
            options,
        }
    }

    /// Syncs readings for every known dustbox, sequentially.
    pub async fn sync_all(&self) -> Result<ReadingSyncReport, SyncError> {
        let dustboxes = self
            .dustboxes
            .list(self.options.dustbox_ids.as_deref())
            .await?;

        let mut report = ReadingSyncReport::default();
        for dustbox in &dustboxes {
            let outcome = self.sync_dustbox(dustbox).await?;
            report.absorb(&outcome);
        }

        Ok(report)
    }

    /// Syncs one dustbox's readings.
    ///
    /// Incremental mode stops at the first reading that is already stored,
    /// on the assumption that the upstream response is ordered by reading
    /// date, so having a reading implies having everything older. That
    /// holds only while no earlier run bailed partway through; a bailed run
    /// followed by a normal one can leave a silent gap, and full-backfill
    /// mode exists to repair it.
    pub async fn sync_dustbox(&self, dustbox: &Dustbox) -> Result<DustboxSyncOutcome, SyncError> {
        if self.options.full_backfill {
            self.backfill_dustbox(dustbox).await
        } else {
            self.page_dustbox(dustbox).await
        }
    }

    async fn page_dustbox(&self, dustbox: &Dustbox) -> Result<DustboxSyncOutcome, SyncError> {
        let mut outcome = DustboxSyncOutcome::new(&dustbox.id);
        let mut visited = HashSet::new();
        let mut page = self.options.start_page(&dustbox.id);
        let ceiling = self.options.page_ceiling();

        loop {
            if let Some(ceiling) = ceiling {
                if outcome.pages_fetched >= ceiling {
                    outcome.stop = StopReason::PageCeiling;
                    break;
                }
            }

            info!(dustbox = %dustbox.id, page, "Syncing readings page");
            let records = match self
                .api
                .fetch_readings(
                    &dustbox.id,
                    Some(page),
                    PageLimit::Size(self.options.page_size),
                )
                .await
            {
                Ok(records) => records,
                Err(err) => {
                    error!(dustbox = %dustbox.id, page, error = %err, "Failed to fetch readings page");
                    if self.options.bail_on_error {
                        return Err(SyncError::Upstream(err));
                    }
                    outcome.stop = StopReason::Aborted;
                    break;
                }
            };
            outcome.pages_fetched += 1;

            if records.is_empty() {
                info!(dustbox = %dustbox.id, "Synced all readings");
                outcome.stop = StopReason::Exhausted;
                break;
            }

            let mut caught_up = false;
            for record in &records {
                // Pagination alignment can repeat a record across adjacent
                // pages; skip anything already handled this run.
                if visited.contains(&record.id) {
                    outcome.skipped += 1;
                    continue;
                }

                match self.readings.find(&record.id).await {
                    Ok(Some(_)) => {
                        info!(dustbox = %dustbox.id, "Dustbox is up to date");
                        caught_up = true;
                        break;
                    }
                    Ok(None) => match self.sync_record(record).await {
                        Ok(()) => {
                            visited.insert(record.id.clone());
                            outcome.synced += 1;
                        }
                        Err(err) => {
                            outcome.failed += 1;
                            self.handle_record_failure(&record.id, err)?;
                        }
                    },
                    Err(err) => {
                        outcome.failed += 1;
                        self.handle_record_failure(&record.id, RecordError::Store(err))?;
                    }
                }
            }

            if caught_up {
                outcome.stop = StopReason::UpToDate;
                break;
            }

            page += 1;
        }

        Ok(outcome)
    }

    async fn backfill_dustbox(&self, dustbox: &Dustbox) -> Result<DustboxSyncOutcome, SyncError> {
        let mut outcome = DustboxSyncOutcome::new(&dustbox.id);

        info!(dustbox = %dustbox.id, "Backfilling full reading history");
        let records = match self
            .api
            .fetch_readings(&dustbox.id, None, PageLimit::Off)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                error!(dustbox = %dustbox.id, error = %err, "Failed to fetch reading history");
                if self.options.bail_on_error {
                    return Err(SyncError::Upstream(err));
                }
                outcome.stop = StopReason::Aborted;
                return Ok(outcome);
            }
        };
        outcome.pages_fetched = 1;

        let mut visited = HashSet::new();
        for record in &records {
            if visited.contains(&record.id) {
                outcome.skipped += 1;
                continue;
            }

            match self.sync_record(record).await {
                Ok(()) => {
                    visited.insert(record.id.clone());
                    outcome.synced += 1;
                }
                Err(err) => {
                    outcome.failed += 1;
                    self.handle_record_failure(&record.id, err)?;
                }
            }
        }

        outcome.stop = StopReason::Backfilled;
        Ok(outcome)
    }

    async fn sync_record(&self, record: &ReadingRecord) -> Result<(), RecordError> {
        let reading = map_reading_record(record)?;
        self.readings.upsert(&reading).await?;
        Ok(())
    }

    fn handle_record_failure(&self, id: &str, err: RecordError) -> Result<(), SyncError> {
        warn!(reading = %id, error = %err, "Failed to sync dustbox reading");
        if self.options.bail_on_error {
            return Err(SyncError::Bailed {
                kind: RecordKind::Reading,
                id: id.to_string(),
                source: err,
            });
        }
        Ok(())
    }
}

/// Maps one upstream reading record into a dustbox reading.
pub fn map_reading_record(record: &ReadingRecord) -> Result<DustboxReading, MapError> {
    if record.id.is_empty() {
        return Err(MapError::MissingField("id"));
    }

    Ok(DustboxReading {
        id: record.id.clone(),
        created_at: convert_timestamp(record.created_at.as_ref())?
            .ok_or(MapError::MissingField("createdAt"))?,
        humidity: convert_float(record.humidity.as_ref())?,
        pm1: convert_float(record.pm1.as_ref())?,
        pm2_5: convert_float(record.pm2_5.as_ref())?,
        pm10: convert_float(record.pm10.as_ref())?,
        temperature: convert_float(record.temperature.as_ref())?,
        dustbox_id: record
            .stream_id
            .clone()
            .ok_or(MapError::MissingField("streamId"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        dustbox, reading, reading_record, MemoryStore, ScriptedUpstream, FIXTURE_MILLIS,
    };
    use serde_json::json;

    /// Newest-first reading records for one dustbox, split into pages.
    fn pages_of(ids: &[&str], stream_id: &str, page_size: usize) -> Vec<Vec<crate::upstream::ReadingRecord>> {
        ids.chunks(page_size)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, id)| {
                        reading_record(id, stream_id, FIXTURE_MILLIS - offset as f64)
                    })
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pages_until_history_exhausted() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        let api = ScriptedUpstream::new()
            .with_pages("db-1", pages_of(&["r-3", "r-2", "r-1"], "db-1", 2));
        let options = SyncOptions {
            page_size: 2,
            ..Default::default()
        };

        let report = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_all()
            .await
            .unwrap();

        assert_eq!(report.synced, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(store.readings.lock().unwrap().len(), 3);

        // Two data pages plus the empty page that ends the loop.
        let requests = api.readings_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].page, Some(0));
        assert_eq!(requests[2].page, Some(2));
    }

    #[tokio::test]
    async fn test_early_stop_on_stored_reading() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        // r-1 and r-2 are already stored from a previous run.
        store.seed_reading(reading("r-1", "db-1"));
        store.seed_reading(reading("r-2", "db-1"));

        // Upstream history, newest first: two new readings then the old ones.
        let api = ScriptedUpstream::new().with_pages(
            "db-1",
            pages_of(&["r-4", "r-3", "r-2", "r-1"], "db-1", 2),
        );
        let options = SyncOptions {
            page_size: 2,
            ..Default::default()
        };
        let synchronizer = ReadingSynchronizer::new(&api, &store, &store, &options);

        let outcome = synchronizer.sync_dustbox(&dustbox("db-1")).await.unwrap();

        assert_eq!(outcome.stop, StopReason::UpToDate);
        assert_eq!(outcome.synced, 2);
        // Only the pages covering the new readings were fetched.
        assert_eq!(outcome.pages_fetched, 2);
        // The stored readings were not re-upserted.
        assert_eq!(store.upserts(), vec!["r-4".to_string(), "r-3".to_string()]);
    }

    #[tokio::test]
    async fn test_pagination_overlap_upserts_once() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        // r-2 appears at the end of page 0 and again at the start of page 1.
        let api = ScriptedUpstream::new().with_pages(
            "db-1",
            vec![
                vec![
                    reading_record("r-3", "db-1", FIXTURE_MILLIS),
                    reading_record("r-2", "db-1", FIXTURE_MILLIS - 1.0),
                ],
                vec![
                    reading_record("r-2", "db-1", FIXTURE_MILLIS - 1.0),
                    reading_record("r-1", "db-1", FIXTURE_MILLIS - 2.0),
                ],
            ],
        );
        let options = SyncOptions {
            page_size: 2,
            ..Default::default()
        };

        let outcome = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_dustbox(&dustbox("db-1"))
            .await
            .unwrap();

        assert_eq!(outcome.synced, 3);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            store.upserts(),
            vec!["r-3".to_string(), "r-2".to_string(), "r-1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_page_ceiling_bounds_the_run() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        let api = ScriptedUpstream::new().with_pages(
            "db-1",
            pages_of(&["r-6", "r-5", "r-4", "r-3", "r-2", "r-1"], "db-1", 2),
        );
        let options = SyncOptions {
            page_size: 2,
            max_readings_per_device: Some(4),
            ..Default::default()
        };

        let outcome = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_dustbox(&dustbox("db-1"))
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::PageCeiling);
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.synced, 4);
    }

    #[tokio::test]
    async fn test_start_page_offset_is_honored() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        let api = ScriptedUpstream::new()
            .with_pages("db-1", pages_of(&["r-6", "r-5", "r-4", "r-3", "r-2", "r-1"], "db-1", 2));
        let mut options = SyncOptions {
            page_size: 2,
            ..Default::default()
        };
        options.start_pages.insert("db-1".to_string(), 2);

        let outcome = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_dustbox(&dustbox("db-1"))
            .await
            .unwrap();

        let requests = api.readings_requests();
        assert_eq!(requests[0].page, Some(2));
        assert_eq!(outcome.synced, 2);
    }

    #[tokio::test]
    async fn test_allowlist_restricts_the_run() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        store.seed_dustbox(dustbox("db-2"));
        let api = ScriptedUpstream::new()
            .with_pages("db-1", pages_of(&["r-1"], "db-1", 50))
            .with_pages("db-2", pages_of(&["r-2"], "db-2", 50));
        let options = SyncOptions {
            dustbox_ids: Some(vec!["db-2".to_string()]),
            ..Default::default()
        };

        let report = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_all()
            .await
            .unwrap();

        assert_eq!(report.dustboxes, 1);
        assert_eq!(store.upserts(), vec!["r-2".to_string()]);
    }

    #[tokio::test]
    async fn test_full_backfill_overwrites_stored_readings() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        // Already stored, with no measurements.
        store.seed_reading(reading("r-1", "db-1"));

        let api = ScriptedUpstream::new()
            .with_pages("db-1", pages_of(&["r-2", "r-1"], "db-1", 2));
        let options = SyncOptions {
            full_backfill: true,
            ..Default::default()
        };

        let outcome = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_dustbox(&dustbox("db-1"))
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Backfilled);
        assert_eq!(outcome.synced, 2);

        // One unlimited request, no paging.
        let requests = api.readings_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].page, None);
        assert_eq!(requests[0].limit, PageLimit::Off);

        // The stored reading's measurements were overwritten.
        let readings = store.readings.lock().unwrap();
        assert_eq!(readings.get("r-1").unwrap().pm2_5, Some(12.5));
    }

    #[tokio::test]
    async fn test_record_failure_skips_and_continues() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        store.fail_on("r-2");
        let api = ScriptedUpstream::new()
            .with_pages("db-1", pages_of(&["r-3", "r-2", "r-1"], "db-1", 50));
        let options = SyncOptions::default();

        let outcome = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_dustbox(&dustbox("db-1"))
            .await
            .unwrap();

        assert_eq!(outcome.synced, 2);
        assert_eq!(outcome.failed, 1);
        assert!(store.readings.lock().unwrap().contains_key("r-1"));
    }

    #[tokio::test]
    async fn test_bail_stops_run_and_remaining_dustboxes() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        store.seed_dustbox(dustbox("db-2"));
        store.fail_on("r-1");
        let api = ScriptedUpstream::new()
            .with_pages("db-1", pages_of(&["r-1"], "db-1", 50))
            .with_pages("db-2", pages_of(&["r-9"], "db-2", 50));
        let options = SyncOptions {
            bail_on_error: true,
            ..Default::default()
        };

        let err = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_all()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Bailed {
                kind: RecordKind::Reading,
                ..
            }
        ));
        // db-2 was never touched.
        let requests = api.readings_requests();
        assert!(requests.iter().all(|request| request.stream_id == "db-1"));
        assert!(store.upserts().is_empty());
    }

    #[tokio::test]
    async fn test_page_fetch_failure_aborts_dustbox_and_moves_on() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        store.seed_dustbox(dustbox("db-2"));
        let api = ScriptedUpstream::new()
            .failing_page("db-1", 0)
            .with_pages("db-2", pages_of(&["r-9"], "db-2", 50));
        let options = SyncOptions::default();

        let report = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_all()
            .await
            .unwrap();

        assert_eq!(report.aborted, 1);
        assert_eq!(report.synced, 1);
        assert!(store.readings.lock().unwrap().contains_key("r-9"));
    }

    #[tokio::test]
    async fn test_page_fetch_failure_propagates_when_bailing() {
        let store = MemoryStore::new();
        store.seed_dustbox(dustbox("db-1"));
        let api = ScriptedUpstream::new().failing_page("db-1", 0);
        let options = SyncOptions {
            bail_on_error: true,
            ..Default::default()
        };

        let err = ReadingSynchronizer::new(&api, &store, &store, &options)
            .sync_all()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Upstream(_)));
    }

    #[test]
    fn test_map_reading_record_fields() {
        let record = reading_record("r-1", "db-1", FIXTURE_MILLIS);
        let reading = map_reading_record(&record).unwrap();

        assert_eq!(reading.id, "r-1");
        assert_eq!(reading.dustbox_id, "db-1");
        assert_eq!(reading.humidity, Some(48.2));
        assert_eq!(reading.pm1, Some(3.1));
        assert_eq!(reading.pm2_5, Some(12.5));
        assert_eq!(reading.pm10, Some(21.0));
        assert_eq!(reading.temperature, Some(11.5));
    }

    #[test]
    fn test_map_empty_measurements_stay_absent() {
        let record: ReadingRecord = serde_json::from_value(json!({
            "id": "r-1",
            "createdAt": FIXTURE_MILLIS,
            "humidity": "",
            "pm1": null,
            "streamId": "db-1"
        }))
        .unwrap();

        let reading = map_reading_record(&record).unwrap();
        assert_eq!(reading.humidity, None);
        assert_eq!(reading.pm1, None);
        assert_eq!(reading.pm2_5, None);
    }

    #[test]
    fn test_map_missing_stream_id_is_an_error() {
        let record: ReadingRecord = serde_json::from_value(json!({
            "id": "r-1",
            "createdAt": FIXTURE_MILLIS
        }))
        .unwrap();

        assert_eq!(
            map_reading_record(&record),
            Err(MapError::MissingField("streamId"))
        );
    }
}
