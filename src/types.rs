use crate::error::DashboardError;
use crate::util::fmt_volume;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

/// Substring that puts a product description in the ethanol subset.
pub const ETHANOL_MARKER: &str = "ETANOL";

/// One data row as it comes out of the sheet, after the header rename.
///
/// Every field is kept as text; coercion happens in the normalizer so a bad
/// cell never fails the whole row.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    pub reference_month: Option<String>,
    pub terminal_name: Option<String>,
    #[serde(rename = "descricao_do_produto")]
    pub product_description: Option<String>,
    #[serde(rename = "sentido_da_operacao")]
    pub operation_direction: Option<String>,
    #[serde(rename = "tipo_da_operacao")]
    pub operation_type: Option<String>,
    pub volume_m3: Option<String>,
}

/// Calendar month with year+month granularity.
///
/// Backed by the first day of the month so ordering and month arithmetic come
/// from `chrono`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Parse a strict `YYYY-MM` string. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return None;
        }
        if !bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit())
        {
            return None;
        }
        NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
            .ok()
            .map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The calendar month immediately before this one.
    pub fn previous(&self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(Self)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for YearMonth {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            DashboardError::InvalidInput(format!("expected a YYYY-MM month, got '{}'", s.trim()))
        })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Direction of a terminal operation, decoded from the sheet's integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Direction {
    Reception,
    Delivery,
    Unknown,
}

impl Direction {
    pub const KNOWN: [Direction; 2] = [Direction::Reception, Direction::Delivery];

    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Direction::Reception,
            Some(2) => Direction::Delivery,
            _ => Direction::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Reception => "Reception",
            Direction::Delivery => "Delivery",
            Direction::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Direction::Unknown
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::KNOWN
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DashboardError::InvalidInput(format!("unknown direction '{}'", s.trim()))
            })
    }
}

/// Logistics mode of a movement, decoded from the sheet's integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OperationType {
    #[serde(rename = "With storage")]
    WithStorage,
    #[serde(rename = "Without storage")]
    WithoutStorage,
    Transshipment,
    Refueling,
    Other,
    Unknown,
}

impl OperationType {
    pub const KNOWN: [OperationType; 5] = [
        OperationType::WithStorage,
        OperationType::WithoutStorage,
        OperationType::Transshipment,
        OperationType::Refueling,
        OperationType::Other,
    ];

    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => OperationType::WithStorage,
            Some(2) => OperationType::WithoutStorage,
            Some(3) => OperationType::Transshipment,
            Some(4) => OperationType::Refueling,
            Some(9) => OperationType::Other,
            _ => OperationType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationType::WithStorage => "With storage",
            OperationType::WithoutStorage => "Without storage",
            OperationType::Transshipment => "Transshipment",
            OperationType::Refueling => "Refueling",
            OperationType::Other => "Other",
            OperationType::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != OperationType::Unknown
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OperationType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::KNOWN
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DashboardError::InvalidInput(format!("unknown operation type '{}'", s.trim()))
            })
    }
}

/// Product partition used by the ethanol charts and the other-products summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductGroup {
    Ethanol,
    Other,
}

impl ProductGroup {
    pub fn of(product_description: &str) -> Self {
        if product_description.contains(ETHANOL_MARKER) {
            ProductGroup::Ethanol
        } else {
            ProductGroup::Other
        }
    }
}

/// One normalized row of terminal activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementRecord {
    pub reference_month: Option<YearMonth>,
    pub terminal_name: String,
    pub product_description: String,
    pub operation_direction: Direction,
    pub operation_type: OperationType,
    pub volume_m3: f64,
}

impl MovementRecord {
    pub fn product_group(&self) -> ProductGroup {
        ProductGroup::of(&self.product_description)
    }
}

/// Inclusive month window chosen with the period control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl DateRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }
}

/// Inclusive `[min, max]` bounds on `volume_m3`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRange {
    pub min: f64,
    pub max: f64,
}

impl VolumeRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    pub fn contains(&self, volume: f64) -> bool {
        self.min <= volume && volume <= self.max
    }
}

impl Default for VolumeRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthVolume {
    #[serde(rename = "reference_month")]
    #[tabled(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "volume_m3")]
    #[tabled(rename = "Volume (m3)")]
    #[tabled(display_with = "fmt_volume")]
    pub volume_m3: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct CategoryVolume {
    #[serde(rename = "category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "volume_m3")]
    #[tabled(rename = "Volume (m3)")]
    #[tabled(display_with = "fmt_volume")]
    pub volume_m3: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthCategoryVolume {
    #[serde(rename = "reference_month")]
    #[tabled(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "category")]
    #[tabled(rename = "Operation type")]
    pub category: String,
    #[serde(rename = "volume_m3")]
    #[tabled(rename = "Volume (m3)")]
    #[tabled(display_with = "fmt_volume")]
    pub volume_m3: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct OtherProductsRow {
    #[serde(rename = "reference_month")]
    #[tabled(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "product_description")]
    #[tabled(rename = "Product")]
    pub product_description: String,
    #[serde(rename = "operation_direction")]
    #[tabled(rename = "Direction")]
    pub direction: Direction,
    #[serde(rename = "volume_m3")]
    #[tabled(rename = "Volume (m3)")]
    #[tabled(display_with = "fmt_volume")]
    pub volume_m3: f64,
}
