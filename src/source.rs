// Source reader: one best-effort fetch of the published sheet as CSV text.
//
// The first line of the export is the header row; the "last updated" label
// lives in a fixed cell of that row, not in a data row.
use crate::error::{DashboardError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Column of the first row that carries the last-updated label.
pub const LAST_UPDATED_COLUMN: usize = 1;

#[derive(Debug, Clone)]
pub enum SourceTarget {
    Remote(String),
    Local(PathBuf),
}

impl std::fmt::Display for SourceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTarget::Remote(url) => write!(f, "{}", url),
            SourceTarget::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The sheet exactly as provided: raw header cells, raw data rows and the
/// metadata label.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    pub last_updated: String,
}

pub fn fetch(target: &SourceTarget, timeout: Duration) -> Result<SourceTable> {
    info!("Reading source from {}", target);
    let text = match target {
        SourceTarget::Remote(url) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()?;
            client.get(url).send()?.error_for_status()?.text()?
        }
        SourceTarget::Local(path) => std::fs::read_to_string(path)?,
    };
    debug!("Fetched {} bytes", text.len());
    parse_table(&text)
}

/// Split CSV text into header row, data rows and the last-updated label.
pub fn parse_table(text: &str) -> Result<SourceTable> {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.is_empty() {
        return Err(DashboardError::NotTabular("empty payload".to_string()));
    }
    if trimmed.starts_with('<') {
        return Err(DashboardError::NotTabular(
            "received markup instead of CSV".to_string(),
        ));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(trimmed.as_bytes());
    let mut records = rdr.records();
    let headers = match records.next() {
        Some(r) => r?,
        None => return Err(DashboardError::NotTabular("no header row".to_string())),
    };
    let last_updated = headers
        .get(LAST_UPDATED_COLUMN)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let rows = records.collect::<std::result::Result<Vec<_>, _>>()?;
    info!("Source has {} columns and {} data rows", headers.len(), rows.len());
    Ok(SourceTable {
        headers,
        rows,
        last_updated,
    })
}
