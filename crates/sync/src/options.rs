//! Options controlling one sync run.

use std::collections::HashMap;

/// Page length requested from the upstream when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Options assembled from the command line for a single run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fetch entire reading histories unconditionally instead of stopping
    /// at the first already-stored reading.
    pub full_backfill: bool,

    /// Escalate the first record-level failure into a run-fatal error.
    pub bail_on_error: bool,

    /// Page length requested from the upstream in incremental mode.
    pub page_size: u32,

    /// Optional per-dustbox cap on fetched readings.
    pub max_readings_per_device: Option<u32>,

    /// Page offsets to start individual dustboxes at.
    pub start_pages: HashMap<String, u32>,

    /// Restrict the run to these dustbox IDs. `None` means every dustbox.
    pub dustbox_ids: Option<Vec<String>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            full_backfill: false,
            bail_on_error: false,
            page_size: DEFAULT_PAGE_SIZE,
            max_readings_per_device: None,
            start_pages: HashMap::new(),
            dustbox_ids: None,
        }
    }
}

impl SyncOptions {
    /// Page-count ceiling derived from the per-dustbox reading cap.
    ///
    /// Uses ceiling division so a cap smaller than one page still fetches a
    /// page.
    pub fn page_ceiling(&self) -> Option<u32> {
        self.max_readings_per_device
            .map(|max| max.div_ceil(self.page_size.max(1)))
    }

    /// Page a dustbox's incremental sync starts at.
    pub fn start_page(&self, dustbox_id: &str) -> u32 {
        self.start_pages.get(dustbox_id).copied().unwrap_or(0)
    }
}
