use crate::source::SourceTarget;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SHEET_ID: &str = "119rDrAyWfXNEp70WdmgvA7OMEbbNX1wZ";
pub const DEFAULT_SHEET_NAME: &str = "Dados";

#[derive(Parser, Debug, Clone)]
#[command(name = "tecab_monitor")]
#[command(about = "Terminal movement dashboard over a published spreadsheet")]
pub struct Args {
    /// Id of the published spreadsheet
    #[arg(long, default_value = DEFAULT_SHEET_ID)]
    pub sheet_id: String,

    /// Sheet (tab) holding the movement data
    #[arg(long, default_value = DEFAULT_SHEET_NAME)]
    pub sheet_name: String,

    /// Full CSV export URL; overrides --sheet-id/--sheet-name
    #[arg(long)]
    pub url: Option<String>,

    /// Read a local CSV file instead of fetching
    #[arg(long, conflicts_with = "url")]
    pub file: Option<PathBuf>,

    /// Timeout for the single fetch, in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Directory for CSV/JSON exports
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Rows shown per console table
    #[arg(long, default_value = "12")]
    pub preview_rows: usize,

    /// Render the dashboard once with default filters and exit
    #[arg(long)]
    pub once: bool,
}

impl Args {
    pub fn sheet_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet={}",
            self.sheet_id, self.sheet_name
        )
    }

    pub fn target(&self) -> SourceTarget {
        match (&self.file, &self.url) {
            (Some(path), _) => SourceTarget::Local(path.clone()),
            (None, Some(url)) => SourceTarget::Remote(url.clone()),
            (None, None) => SourceTarget::Remote(self.sheet_url()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
