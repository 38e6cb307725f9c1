use crate::types::{
    CategoryVolume, DateRange, Direction, MonthCategoryVolume, MonthVolume, MovementRecord,
    OperationType, OtherProductsRow, ProductGroup, VolumeRange, YearMonth,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Product preselected in the operation-type panel.
pub const DEFAULT_PRODUCT: &str = "ETANOL";

/// Dropdown/range predicates for the operation-type panel. `None` matches
/// every value of that field.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub product: Option<String>,
    pub operation_type: Option<OperationType>,
    pub direction: Option<Direction>,
    pub volume_range: VolumeRange,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            product: Some(DEFAULT_PRODUCT.to_string()),
            operation_type: Some(OperationType::WithStorage),
            direction: Some(Direction::Reception),
            volume_range: VolumeRange::unbounded(),
        }
    }
}

impl Selection {
    pub fn matches(&self, r: &MovementRecord) -> bool {
        if let Some(product) = &self.product {
            if r.product_description != *product {
                return false;
            }
        }
        if let Some(op) = self.operation_type {
            if r.operation_type != op {
                return false;
            }
        }
        if let Some(dir) = self.direction {
            if r.operation_direction != dir {
                return false;
            }
        }
        self.volume_range.contains(r.volume_m3)
    }
}

fn sum_by_month<'a, I>(records: I) -> Vec<MonthVolume>
where
    I: IntoIterator<Item = &'a MovementRecord>,
{
    let mut map: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for r in records {
        // rows without a month never enter month-keyed views
        if let Some(month) = r.reference_month {
            *map.entry(month).or_insert(0.0) += r.volume_m3;
        }
    }
    map.into_iter()
        .map(|(month, volume_m3)| MonthVolume { month, volume_m3 })
        .collect()
}

fn is_ethanol_in(r: &MovementRecord, direction: Direction) -> bool {
    r.product_group() == ProductGroup::Ethanol && r.operation_direction == direction
}

/// Ethanol volume per month for one direction, oldest month first.
pub fn ethanol_by_month(data: &[MovementRecord], direction: Direction) -> Vec<MonthVolume> {
    sum_by_month(data.iter().filter(|r| is_ethanol_in(r, direction)))
}

/// Same as [`ethanol_by_month`], bounded to an inclusive month window.
pub fn ethanol_by_month_in(
    data: &[MovementRecord],
    direction: Direction,
    period: &DateRange,
) -> Vec<MonthVolume> {
    ethanol_by_month(data, direction)
        .into_iter()
        .filter(|row| period.contains(row.month))
        .collect()
}

/// Non-ethanol volume by (month, product, direction), most recent month first.
pub fn other_products_summary(data: &[MovementRecord]) -> Vec<OtherProductsRow> {
    let mut map: BTreeMap<(YearMonth, String, Direction), f64> = BTreeMap::new();
    for r in data.iter().filter(|r| r.product_group() == ProductGroup::Other) {
        let Some(month) = r.reference_month else {
            continue;
        };
        let key = (month, r.product_description.clone(), r.operation_direction);
        *map.entry(key).or_insert(0.0) += r.volume_m3;
    }
    let mut rows: Vec<OtherProductsRow> = map
        .into_iter()
        .map(|((month, product_description, direction), volume_m3)| OtherProductsRow {
            month,
            product_description,
            direction,
            volume_m3,
        })
        .collect();
    // stable: product/direction order from the map survives within a month
    rows.sort_by(|a, b| b.month.cmp(&a.month));
    rows
}

/// Records matching every predicate of the selection, optionally bounded to a
/// month window. No match is an empty result.
pub fn filter_by_selection(
    data: &[MovementRecord],
    selection: &Selection,
    window: Option<&DateRange>,
) -> Vec<MovementRecord> {
    data.iter()
        .filter(|r| selection.matches(r))
        .filter(|r| match window {
            Some(period) => r.reference_month.is_some_and(|m| period.contains(m)),
            None => true,
        })
        .cloned()
        .collect()
}

pub fn group_by_month(records: &[MovementRecord]) -> Vec<MonthVolume> {
    sum_by_month(records)
}

/// Volume per product, largest first.
pub fn group_by_product(records: &[MovementRecord]) -> Vec<CategoryVolume> {
    let mut map: HashMap<&str, f64> = HashMap::new();
    for r in records {
        *map.entry(r.product_description.as_str()).or_insert(0.0) += r.volume_m3;
    }
    let mut rows: Vec<CategoryVolume> = map
        .into_iter()
        .map(|(category, volume_m3)| CategoryVolume {
            category: category.to_string(),
            volume_m3,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.volume_m3
            .partial_cmp(&a.volume_m3)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

/// Volume per (month, operation type), oldest month first.
pub fn group_by_month_and_type(records: &[MovementRecord]) -> Vec<MonthCategoryVolume> {
    let mut map: BTreeMap<(YearMonth, OperationType), f64> = BTreeMap::new();
    for r in records {
        if let Some(month) = r.reference_month {
            *map.entry((month, r.operation_type)).or_insert(0.0) += r.volume_m3;
        }
    }
    map.into_iter()
        .map(|((month, op), volume_m3)| MonthCategoryVolume {
            month,
            category: op.label().to_string(),
            volume_m3,
        })
        .collect()
}

fn unique_in_order<T, I>(values: I) -> Vec<T>
where
    T: Eq + std::hash::Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Observed product descriptions in first-seen order, blanks excluded.
pub fn product_options(data: &[MovementRecord]) -> Vec<String> {
    unique_in_order(
        data.iter()
            .filter(|r| !r.product_description.is_empty())
            .map(|r| r.product_description.clone()),
    )
}

pub fn operation_type_options(data: &[MovementRecord]) -> Vec<OperationType> {
    unique_in_order(
        data.iter()
            .map(|r| r.operation_type)
            .filter(OperationType::is_known),
    )
}

pub fn direction_options(data: &[MovementRecord]) -> Vec<Direction> {
    unique_in_order(
        data.iter()
            .map(|r| r.operation_direction)
            .filter(Direction::is_known),
    )
}

/// Smallest and largest volume in the data, for range-control defaults.
pub fn volume_bounds(data: &[MovementRecord]) -> Option<VolumeRange> {
    data.iter().map(|r| r.volume_m3).fold(None, |acc, v| match acc {
        None => Some(VolumeRange::new(v, v)),
        Some(range) => Some(VolumeRange::new(range.min.min(v), range.max.max(v))),
    })
}

/// First and last month present, for period-control defaults.
pub fn month_bounds(data: &[MovementRecord]) -> Option<DateRange> {
    let first = data.iter().filter_map(|r| r.reference_month).min()?;
    let last = data.iter().filter_map(|r| r.reference_month).max()?;
    Some(DateRange::new(first, last))
}
