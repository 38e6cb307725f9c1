// Filter state, events and the pure reducer behind the interactive panels.
//
// The reducer maps (immutable records, current filters, event) to the next
// filters plus the views that event invalidates. `Dashboard` is the session
// that owns the data and keeps the latest outputs; it holds the only piece
// of state carried between reactions, the filtered record slot.
use crate::aggregate::{
    ethanol_by_month_in, filter_by_selection, group_by_month, group_by_month_and_type,
    group_by_product, month_bounds, other_products_summary, Selection,
};
use crate::kpi::{compute_kpis, KpiSummary};
use crate::normalize::Dataset;
use crate::types::{
    CategoryVolume, DateRange, Direction, MonthCategoryVolume, MonthVolume, MovementRecord,
    OperationType, OtherProductsRow, VolumeRange,
};
use tracing::debug;

pub const NOT_LOADED_MESSAGE: &str = "Loading...";
pub const NO_DATA_MESSAGE: &str = "No data matches the selected filters.";
pub const SELECT_PERIOD_MESSAGE: &str = "Select a valid period.";

/// What a chart or table slot currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    NotLoaded,
    SelectPeriod,
    NoData,
    Ready(T),
}

impl<T> Panel<Vec<T>> {
    fn from_rows(rows: Vec<T>) -> Self {
        if rows.is_empty() {
            Panel::NoData
        } else {
            Panel::Ready(rows)
        }
    }
}

impl<T> Panel<T> {
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Panel::NotLoaded => Some(NOT_LOADED_MESSAGE),
            Panel::SelectPeriod => Some(SELECT_PERIOD_MESSAGE),
            Panel::NoData => Some(NO_DATA_MESSAGE),
            Panel::Ready(_) => None,
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub selection: Selection,
    pub period: Option<DateRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterEvent {
    ProductChanged(Option<String>),
    OperationTypeChanged(Option<OperationType>),
    DirectionChanged(Option<Direction>),
    VolumeRangeChanged(VolumeRange),
    PeriodChanged(Option<DateRange>),
}

/// Outputs fed by the filtered record set.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionViews {
    pub filtered: Vec<MovementRecord>,
    pub by_month: Panel<Vec<MonthVolume>>,
    pub by_product: Panel<Vec<CategoryVolume>>,
    pub by_month_and_type: Panel<Vec<MonthCategoryVolume>>,
}

/// The two ethanol time series, bounded by the period control.
#[derive(Debug, Clone, PartialEq)]
pub struct EthanolViews {
    pub received: Panel<Vec<MonthVolume>>,
    pub delivered: Panel<Vec<MonthVolume>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Selection(SelectionViews),
    Ethanol(EthanolViews),
}

pub fn selection_views(data: &[MovementRecord], selection: &Selection) -> SelectionViews {
    let filtered = filter_by_selection(data, selection, None);
    SelectionViews {
        by_month: Panel::from_rows(group_by_month(&filtered)),
        by_product: Panel::from_rows(group_by_product(&filtered)),
        by_month_and_type: Panel::from_rows(group_by_month_and_type(&filtered)),
        filtered,
    }
}

pub fn ethanol_views(data: &[MovementRecord], period: Option<&DateRange>) -> EthanolViews {
    match period {
        Some(p) if p.is_valid() => EthanolViews {
            received: Panel::from_rows(ethanol_by_month_in(data, Direction::Reception, p)),
            delivered: Panel::from_rows(ethanol_by_month_in(data, Direction::Delivery, p)),
        },
        _ => EthanolViews {
            received: Panel::SelectPeriod,
            delivered: Panel::SelectPeriod,
        },
    }
}

/// Apply one control change. Dropdown and range events recompute the
/// filtered set and its consumers; the period event only touches the
/// ethanol series and leaves the selection alone.
pub fn reduce(
    data: &[MovementRecord],
    state: &FilterState,
    event: FilterEvent,
) -> (FilterState, Derived) {
    debug!("Reducing {:?}", event);
    let mut next = state.clone();
    match event {
        FilterEvent::PeriodChanged(period) => {
            next.period = period;
            let views = ethanol_views(data, next.period.as_ref());
            return (next, Derived::Ethanol(views));
        }
        FilterEvent::ProductChanged(product) => next.selection.product = product,
        FilterEvent::OperationTypeChanged(op) => next.selection.operation_type = op,
        FilterEvent::DirectionChanged(dir) => next.selection.direction = dir,
        FilterEvent::VolumeRangeChanged(range) => next.selection.volume_range = range,
    }
    let views = selection_views(data, &next.selection);
    (next, Derived::Selection(views))
}

/// One interactive session over a loaded dataset.
#[derive(Debug)]
pub struct Dashboard {
    data: Dataset,
    kpis: KpiSummary,
    other_products: Vec<OtherProductsRow>,
    state: FilterState,
    filtered: Option<Vec<MovementRecord>>,
    pub by_month: Panel<Vec<MonthVolume>>,
    pub by_product: Panel<Vec<CategoryVolume>>,
    pub by_month_and_type: Panel<Vec<MonthCategoryVolume>>,
    pub ethanol_received: Panel<Vec<MonthVolume>>,
    pub ethanol_delivered: Panel<Vec<MonthVolume>>,
}

impl Dashboard {
    /// KPIs and the other-products summary are fixed for the life of the load;
    /// every filter-driven panel starts as not loaded.
    pub fn new(data: Dataset) -> Self {
        let kpis = compute_kpis(&data.records);
        let other_products = other_products_summary(&data.records);
        Self {
            data,
            kpis,
            other_products,
            state: FilterState::default(),
            filtered: None,
            by_month: Panel::NotLoaded,
            by_product: Panel::NotLoaded,
            by_month_and_type: Panel::NotLoaded,
            ethanol_received: Panel::NotLoaded,
            ethanol_delivered: Panel::NotLoaded,
        }
    }

    /// Render the initial filters: default selection and the full month span.
    pub fn start(&mut self) {
        let period = month_bounds(&self.data.records);
        self.dispatch(FilterEvent::PeriodChanged(period));
        let selection = self.state.selection.clone();
        self.dispatch(FilterEvent::ProductChanged(selection.product));
    }

    pub fn dispatch(&mut self, event: FilterEvent) {
        let (next, derived) = reduce(&self.data.records, &self.state, event);
        self.state = next;
        match derived {
            Derived::Selection(views) => {
                self.filtered = Some(views.filtered);
                self.by_month = views.by_month;
                self.by_product = views.by_product;
                self.by_month_and_type = views.by_month_and_type;
            }
            Derived::Ethanol(views) => {
                self.ethanol_received = views.received;
                self.ethanol_delivered = views.delivered;
            }
        }
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn kpis(&self) -> &KpiSummary {
        &self.kpis
    }

    pub fn other_products(&self) -> &[OtherProductsRow] {
        &self.other_products
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Latest filtered record set, `None` before the first selection event.
    pub fn filtered(&self) -> Option<&[MovementRecord]> {
        self.filtered.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::sample;
    use crate::normalize::LoadReport;
    use crate::types::YearMonth;

    fn dataset() -> Dataset {
        Dataset {
            records: sample(),
            last_updated: "01/03/2024".to_string(),
            report: LoadReport::default(),
        }
    }

    fn month(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn new_session_is_not_loaded() {
        let dash = Dashboard::new(dataset());
        assert_eq!(dash.by_month, Panel::NotLoaded);
        assert_eq!(dash.ethanol_received, Panel::NotLoaded);
        assert!(dash.filtered().is_none());
        assert_eq!(dash.kpis().latest_month_label, "2024-02");
        assert!(!dash.other_products().is_empty());
    }

    #[test]
    fn start_renders_defaults() {
        let mut dash = Dashboard::new(dataset());
        dash.start();
        assert_eq!(dash.filtered().map(|f| f.len()), Some(3));
        let by_month = dash.by_month.ready().unwrap();
        assert_eq!(by_month.len(), 2);
        assert_eq!(dash.ethanol_received.ready().unwrap().len(), 2);
        assert_eq!(
            dash.state().period,
            Some(DateRange::new(month(2024, 1), month(2024, 2)))
        );
    }

    #[test]
    fn each_control_keeps_the_others() {
        let data = sample();
        let state = FilterState::default();
        let direction = FilterEvent::DirectionChanged(Some(Direction::Delivery));
        let (state, _) = reduce(&data, &state, direction);
        let range = FilterEvent::VolumeRangeChanged(VolumeRange::new(0.0, 500.0));
        let (state, _) = reduce(&data, &state, range);
        assert_eq!(state.selection.direction, Some(Direction::Delivery));
        assert_eq!(state.selection.product.as_deref(), Some("ETANOL"));
        assert_eq!(state.selection.volume_range, VolumeRange::new(0.0, 500.0));

        let (after_period, derived) = reduce(
            &data,
            &state,
            FilterEvent::PeriodChanged(Some(DateRange::new(month(2024, 1), month(2024, 1)))),
        );
        assert_eq!(after_period.selection, state.selection);
        assert!(matches!(derived, Derived::Ethanol(_)));
    }

    #[test]
    fn selection_event_fans_out_from_filtered_set() {
        let data = sample();
        let (_, derived) = reduce(
            &data,
            &FilterState::default(),
            FilterEvent::OperationTypeChanged(None),
        );
        let Derived::Selection(views) = derived else {
            panic!("expected selection views");
        };
        // ETANOL receptions of any operation type
        assert_eq!(views.filtered.len(), 3);
        let total: f64 = views.by_product.ready().unwrap().iter().map(|c| c.volume_m3).sum();
        assert_eq!(total, 1000.0 + 1500.0 + 999.0);
        // the undated row is left out of month-keyed views
        let monthly: f64 = views.by_month.ready().unwrap().iter().map(|m| m.volume_m3).sum();
        assert_eq!(monthly, 2500.0);
        assert_eq!(views.by_month_and_type.ready().unwrap().len(), 2);
    }

    #[test]
    fn empty_match_shows_no_data() {
        let mut dash = Dashboard::new(dataset());
        dash.start();
        dash.dispatch(FilterEvent::ProductChanged(Some("QUEROSENE".to_string())));
        assert_eq!(dash.by_month, Panel::NoData);
        assert_eq!(dash.by_product, Panel::NoData);
        assert_eq!(dash.by_month_and_type, Panel::NoData);
        assert_eq!(dash.by_month.placeholder(), Some(NO_DATA_MESSAGE));
        assert_eq!(dash.filtered().map(|f| f.len()), Some(0));
        // ethanol series untouched
        assert!(dash.ethanol_received.ready().is_some());
    }

    #[test]
    fn filtered_slot_is_overwritten() {
        let mut dash = Dashboard::new(dataset());
        dash.start();
        dash.dispatch(FilterEvent::ProductChanged(Some("GASOLINA A".to_string())));
        dash.dispatch(FilterEvent::OperationTypeChanged(Some(OperationType::Refueling)));
        dash.dispatch(FilterEvent::DirectionChanged(Some(Direction::Delivery)));
        let filtered = dash.filtered().unwrap();
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|r| r.product_description == "GASOLINA A"));
    }

    #[test]
    fn null_or_backwards_period_asks_for_a_period() {
        let mut dash = Dashboard::new(dataset());
        dash.start();
        let selection_before = dash.by_month.clone();

        dash.dispatch(FilterEvent::PeriodChanged(None));
        assert_eq!(dash.ethanol_received, Panel::SelectPeriod);
        assert_eq!(dash.ethanol_delivered, Panel::SelectPeriod);
        assert_ne!(dash.ethanol_received, Panel::NotLoaded);
        assert_eq!(dash.ethanol_received.placeholder(), Some(SELECT_PERIOD_MESSAGE));

        dash.dispatch(FilterEvent::PeriodChanged(Some(DateRange::new(
            month(2024, 2),
            month(2024, 1),
        ))));
        assert_eq!(dash.ethanol_delivered, Panel::SelectPeriod);
        // the general filter outputs are not recomputed by the period control
        assert_eq!(dash.by_month, selection_before);
    }

    #[test]
    fn period_with_no_ethanol_shows_no_data() {
        let mut dash = Dashboard::new(dataset());
        dash.dispatch(FilterEvent::PeriodChanged(Some(DateRange::new(
            month(2020, 1),
            month(2020, 12),
        ))));
        assert_eq!(dash.ethanol_received, Panel::NoData);
        // selection panels never ran
        assert_eq!(dash.by_month, Panel::NotLoaded);
    }
}
