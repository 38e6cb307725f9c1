use crate::types::{Direction, MovementRecord, ProductGroup, YearMonth};
use crate::util::growth_pct;
use serde::Serialize;

/// Headline month-over-month figures, computed once per data load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_volume: f64,
    pub growth_total: f64,
    #[serde(rename = "etanol_recepcao")]
    pub ethanol_reception: f64,
    #[serde(rename = "growth_recepcao")]
    pub growth_reception: f64,
    #[serde(rename = "etanol_entrega")]
    pub ethanol_delivery: f64,
    #[serde(rename = "growth_entrega")]
    pub growth_delivery: f64,
    pub latest_month_label: String,
    #[serde(skip)]
    pub latest_month: Option<YearMonth>,
}

#[derive(Debug, Default, Clone, Copy)]
struct MonthTotals {
    total: f64,
    reception: f64,
    delivery: f64,
}

fn totals_for(data: &[MovementRecord], month: Option<YearMonth>) -> MonthTotals {
    let mut acc = MonthTotals::default();
    let Some(month) = month else {
        return acc;
    };
    for r in data.iter().filter(|r| r.reference_month == Some(month)) {
        acc.total += r.volume_m3;
        if r.product_group() == ProductGroup::Ethanol {
            match r.operation_direction {
                Direction::Reception => acc.reception += r.volume_m3,
                Direction::Delivery => acc.delivery += r.volume_m3,
                Direction::Unknown => {}
            }
        }
    }
    acc
}

/// Latest month against the calendar month right before it. A missing or
/// empty previous month yields zero growth.
pub fn compute_kpis(data: &[MovementRecord]) -> KpiSummary {
    let latest_month = data.iter().filter_map(|r| r.reference_month).max();
    let previous_month = latest_month.and_then(|m| m.previous());

    let latest = totals_for(data, latest_month);
    let previous = totals_for(data, previous_month);

    KpiSummary {
        total_volume: latest.total,
        growth_total: growth_pct(latest.total, previous.total),
        ethanol_reception: latest.reception,
        growth_reception: growth_pct(latest.reception, previous.reception),
        ethanol_delivery: latest.delivery,
        growth_delivery: growth_pct(latest.delivery, previous.delivery),
        latest_month_label: latest_month.map(|m| m.to_string()).unwrap_or_default(),
        latest_month,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{record, sample};
    use crate::types::OperationType;

    #[test]
    fn reception_growth_for_two_months() {
        use Direction::Reception;
        use OperationType::WithStorage;
        let data = vec![
            record(Some((2024, 3)), "ETANOL", Reception, WithStorage, 1000.0),
            record(Some((2024, 4)), "ETANOL", Reception, WithStorage, 1500.0),
        ];
        let kpis = compute_kpis(&data);
        assert_eq!(kpis.latest_month_label, "2024-04");
        assert_eq!(kpis.ethanol_reception, 1500.0);
        assert!((kpis.growth_reception - 50.0).abs() < 1e-9);
        assert!((kpis.growth_total - 50.0).abs() < 1e-9);
        assert_eq!(kpis.ethanol_delivery, 0.0);
        assert_eq!(kpis.growth_delivery, 0.0);
    }

    #[test]
    fn kpis_over_sample() {
        let kpis = compute_kpis(&sample());
        assert_eq!(kpis.latest_month, YearMonth::new(2024, 2));
        // Feb: 1500 + 600 + 120 + 80 + 50 + 7
        assert_eq!(kpis.total_volume, 2357.0);
        assert_eq!(kpis.ethanol_reception, 1500.0);
        assert_eq!(kpis.ethanol_delivery, 600.0);
        // Jan ethanol reception: 1000 + 250
        assert!((kpis.growth_reception - 20.0).abs() < 1e-9);
        assert!((kpis.growth_delivery - 50.0).abs() < 1e-9);
    }

    #[test]
    fn previous_month_is_calendar_not_last_present() {
        // gap: 2023-11 then 2024-01, so the previous month (2023-12) is empty
        let data = vec![
            record(Some((2023, 11)), "ETANOL", Direction::Delivery, OperationType::Other, 10.0),
            record(Some((2024, 1)), "ETANOL", Direction::Delivery, OperationType::Other, 30.0),
        ];
        let kpis = compute_kpis(&data);
        assert_eq!(kpis.ethanol_delivery, 30.0);
        assert_eq!(kpis.growth_delivery, 0.0);
        assert_eq!(kpis.growth_total, 0.0);
    }

    #[test]
    fn no_months_means_zeroed_kpis() {
        let data = vec![record(None, "ETANOL", Direction::Reception, OperationType::Other, 10.0)];
        let kpis = compute_kpis(&data);
        assert_eq!(kpis.latest_month, None);
        assert_eq!(kpis.latest_month_label, "");
        assert_eq!(kpis.total_volume, 0.0);
        assert_eq!(kpis.growth_total, 0.0);
        assert_eq!(compute_kpis(&[]).total_volume, 0.0);
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let kpis = compute_kpis(&sample());
        let json = serde_json::to_value(&kpis).unwrap();
        for key in [
            "total_volume",
            "growth_total",
            "etanol_recepcao",
            "growth_recepcao",
            "etanol_entrega",
            "growth_entrega",
            "latest_month_label",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("latest_month").is_none());
    }
}
