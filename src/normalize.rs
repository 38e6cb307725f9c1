use crate::error::{DashboardError, Result};
use crate::source::{self, SourceTable, SourceTarget};
use crate::types::{Direction, MovementRecord, OperationType, RawRow, YearMonth};
use crate::util::{parse_code, parse_volume};
use csv::StringRecord;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const REFERENCE_MONTH: &str = "reference_month";
pub const TERMINAL_NAME: &str = "terminal_name";
pub const PRODUCT_DESCRIPTION: &str = "descricao_do_produto";
pub const OPERATION_DIRECTION: &str = "sentido_da_operacao";
pub const OPERATION_TYPE: &str = "tipo_da_operacao";
pub const VOLUME_M3: &str = "volume_m3";

const REQUIRED_COLUMNS: [&str; 5] = [
    REFERENCE_MONTH,
    PRODUCT_DESCRIPTION,
    OPERATION_DIRECTION,
    OPERATION_TYPE,
    VOLUME_M3,
];

// The sheet export folds its title rows into the first two headers.
static HEADER_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Atualizado em: mes_de_referencia", REFERENCE_MONTH),
        (
            "Histórico dos volumes mensais movimentados no terminal  Em atendimento ao artigo 26, III, d, da Resolução ANP nº 881, de 8 de julho de 2022 nome_do_terminal",
            TERMINAL_NAME,
        ),
        ("mes_de_referencia", REFERENCE_MONTH),
        ("nome_do_terminal", TERMINAL_NAME),
    ])
});

/// Counters describing what the normalizer did with the raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub malformed_rows: usize,
    pub dropped_volume: usize,
    pub missing_month: usize,
    pub unknown_direction: usize,
    pub unknown_operation_type: usize,
}

/// The normalized record set plus the metadata that came with it. Immutable
/// once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<MovementRecord>,
    pub last_updated: String,
    pub report: LoadReport,
}

impl Dataset {
    pub fn load(target: &SourceTarget, timeout: Duration) -> Result<Self> {
        let table = source::fetch(target, timeout)?;
        Self::from_table(&table)
    }

    pub fn from_table(table: &SourceTable) -> Result<Self> {
        let (records, report) = normalize_table(table)?;
        Ok(Self {
            records,
            last_updated: table.last_updated.clone(),
            report,
        })
    }
}

/// Step 1: canonical names for the known headers; everything else is kept.
pub fn rename_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|h| {
            let h = h.trim();
            HEADER_ALIASES.get(h).copied().unwrap_or(h)
        })
        .collect()
}

/// Step 2.
pub fn map_direction(cell: Option<&str>) -> Direction {
    Direction::from_code(parse_code(cell))
}

/// Step 3.
pub fn parse_reference_month(cell: Option<&str>) -> Option<YearMonth> {
    YearMonth::parse(cell?)
}

/// Step 5.
pub fn map_operation_type(cell: Option<&str>) -> OperationType {
    OperationType::from_code(parse_code(cell))
}

/// Apply steps 2-5 to one row. Returns `None` when the volume cannot be
/// parsed; the row is dropped and counted.
pub fn normalize_row(row: RawRow, report: &mut LoadReport) -> Option<MovementRecord> {
    let operation_direction = map_direction(row.operation_direction.as_deref());
    let reference_month = parse_reference_month(row.reference_month.as_deref());
    let volume_m3 = match parse_volume(row.volume_m3.as_deref()) {
        Some(v) => v,
        None => {
            report.dropped_volume += 1;
            debug!("Dropping row with unparseable volume {:?}", row.volume_m3);
            return None;
        }
    };
    let operation_type = map_operation_type(row.operation_type.as_deref());

    if reference_month.is_none() {
        report.missing_month += 1;
    }
    if !operation_direction.is_known() {
        report.unknown_direction += 1;
    }
    if !operation_type.is_known() {
        report.unknown_operation_type += 1;
    }

    Some(MovementRecord {
        reference_month,
        terminal_name: row.terminal_name.unwrap_or_default().trim().to_string(),
        product_description: row.product_description.unwrap_or_default().trim().to_string(),
        operation_direction,
        operation_type,
        volume_m3,
    })
}

pub fn normalize_table(table: &SourceTable) -> Result<(Vec<MovementRecord>, LoadReport)> {
    let headers = rename_headers(&table.headers);
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(DashboardError::MissingColumn(required.to_string()));
        }
    }
    // two aliases landing on one name would make every row undecodable
    for column in REQUIRED_COLUMNS.iter().chain([&TERMINAL_NAME]) {
        if headers.iter().filter(|h| h == column).count() > 1 {
            return Err(DashboardError::InvalidInput(format!(
                "column '{}' appears more than once after renaming headers",
                column
            )));
        }
    }

    let mut report = LoadReport::default();
    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        report.total_rows += 1;
        let raw: RawRow = match row.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                report.malformed_rows += 1;
                debug!("Skipping malformed row: {}", e);
                continue;
            }
        };
        if let Some(record) = normalize_row(raw, &mut report) {
            records.push(record);
        }
    }
    report.kept_rows = records.len();

    info!(
        "Normalized {} of {} rows ({} without a reference month)",
        report.kept_rows, report.total_rows, report.missing_month
    );
    if report.dropped_volume > 0 || report.malformed_rows > 0 {
        warn!(
            "Dropped {} rows with unparseable volume and {} malformed rows",
            report.dropped_volume, report.malformed_rows
        );
    }
    Ok((records, report))
}
