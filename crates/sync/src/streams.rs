//! Stream synchronizer: upserts the upstream dustbox registry into the
//! local store.

use tracing::{info, warn};

use domain::models::Dustbox;
use shared::convert::{convert_count, convert_point, convert_timestamp};

use crate::error::{MapError, RecordError, RecordKind, SyncError};
use crate::options::SyncOptions;
use crate::store::DustboxStore;
use crate::upstream::{StreamRecord, UpstreamApi};

/// Counters for one stream sync run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamSyncReport {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Fetches the upstream's full stream list and upserts every record.
pub struct StreamSynchronizer<'a, A, S> {
    api: &'a A,
    dustboxes: &'a S,
    options: &'a SyncOptions,
}

impl<'a, A, S> StreamSynchronizer<'a, A, S>
where
    A: UpstreamApi,
    S: DustboxStore,
{
    pub fn new(api: &'a A, dustboxes: &'a S, options: &'a SyncOptions) -> Self {
        Self {
            api,
            dustboxes,
            options,
        }
    }

    /// Syncs every upstream stream into the local dustbox registry.
    ///
    /// Idempotent: running twice against identical upstream data leaves the
    /// store unchanged. A failure fetching the stream list aborts the run;
    /// record-level failures are logged and skipped unless the run is
    /// configured to bail.
    pub async fn sync(&self) -> Result<StreamSyncReport, SyncError> {
        let records = self.api.fetch_streams().await?;
        info!(count = records.len(), "Fetched dustbox streams");

        let mut report = StreamSyncReport {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            match self.sync_record(&record).await {
                Ok(()) => report.synced += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(dustbox = %record.id, error = %err, "Failed to sync dustbox stream");
                    if self.options.bail_on_error {
                        return Err(SyncError::Bailed {
                            kind: RecordKind::Stream,
                            id: record.id,
                            source: err,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    async fn sync_record(&self, record: &StreamRecord) -> Result<(), RecordError> {
        let dustbox = map_stream_record(record)?;
        self.dustboxes.upsert(&dustbox).await?;
        Ok(())
    }
}

/// Maps one upstream stream record into a dustbox.
pub fn map_stream_record(record: &StreamRecord) -> Result<Dustbox, MapError> {
    if record.id.is_empty() {
        return Err(MapError::MissingField("id"));
    }

    let created_at = convert_timestamp(record.created_at.as_ref())?
        .ok_or(MapError::MissingField("createdAt"))?;
    let last_entry_at = convert_timestamp(
        record
            .last_entry_at
            .as_ref()
            .and_then(|entry| entry.timestamp.as_ref()),
    )?;
    let location = record.location.as_ref().and_then(|location| {
        convert_point(location.longitude.as_ref(), location.latitude.as_ref())
    });

    Ok(Dustbox {
        id: record.id.clone(),
        created_at,
        description: record.description.clone().unwrap_or_default(),
        device_number: record.device_number.clone(),
        entries_number: convert_count(record.entries_number.as_ref())?,
        last_entry_at,
        location,
        public_key: record.public_key.clone().unwrap_or_default(),
        slug: record.slug.clone().unwrap_or_default(),
        title: record.title.clone().unwrap_or_default(),
        updated_at: convert_timestamp(record.updated_at.as_ref())?,
    })
}
