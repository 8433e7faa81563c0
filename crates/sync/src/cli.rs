//! Command-line surface of the sync binary.

use clap::Parser;

use crate::options::{SyncOptions, DEFAULT_PAGE_SIZE};

/// Sync dustbox streams and readings from the Citizen Sense API.
#[derive(Debug, Parser)]
#[command(name = "airsift-sync", version, about)]
pub struct Cli {
    /// Fetch every dustbox's entire reading history instead of stopping at
    /// the first already-stored reading. Use to backfill after a bailed run.
    #[arg(long)]
    pub all: bool,

    /// Abort the run with a non-zero exit status on the first record-level
    /// failure.
    #[arg(long)]
    pub bail: bool,

    /// Number of readings requested per page in incremental mode.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: u32,

    /// Upper bound on readings fetched per dustbox in one run.
    #[arg(long, value_name = "N")]
    pub max_readings: Option<u32>,

    /// Start a dustbox at a page offset, formatted as <dustbox-id>=<page>.
    /// May be given multiple times.
    #[arg(long, value_name = "ID=PAGE", value_parser = parse_page_arg)]
    pub page: Vec<(String, u32)>,

    /// Restrict the run to these dustbox IDs.
    #[arg(value_name = "DUSTBOX_ID")]
    pub dustboxes: Vec<String>,
}

fn parse_page_arg(arg: &str) -> Result<(String, u32), String> {
    let (id, page) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected <dustbox-id>=<page>, got `{arg}`"))?;
    if id.is_empty() {
        return Err(format!("missing dustbox ID in `{arg}`"));
    }
    let page = page
        .parse()
        .map_err(|_| format!("`{page}` is not a valid page number"))?;
    Ok((id.to_string(), page))
}

impl Cli {
    /// Assembles the run options for the synchronizers.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            full_backfill: self.all,
            bail_on_error: self.bail,
            page_size: self.page_size,
            max_readings_per_device: self.max_readings,
            start_pages: self.page.iter().cloned().collect(),
            dustbox_ids: if self.dustboxes.is_empty() {
                None
            } else {
                Some(self.dustboxes.clone())
            },
        }
    }
}
