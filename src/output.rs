use crate::error::Result;
use crate::kpi::KpiSummary;
use crate::normalize::LoadReport;
use crate::util::{format_int, format_number, format_pct};
use crate::view::{Dashboard, Panel};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("... {} more rows", format_int(rows.len() - max_rows));
    }
    println!();
}

/// Print a panel, or its placeholder message when it has nothing to show.
pub fn render_panel<T>(title: &str, panel: &Panel<Vec<T>>, max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    match panel.ready() {
        Some(rows) => preview_table_rows(rows, max_rows),
        None => println!("[{}]\n", panel.placeholder().unwrap_or_default()),
    }
}

pub fn render_kpis(kpis: &KpiSummary) {
    let month = if kpis.latest_month_label.is_empty() {
        "n/a"
    } else {
        kpis.latest_month_label.as_str()
    };
    println!("Indicators for {} (vs. previous month)", month);
    println!(
        "  Total volume:       {} m3 ({})",
        format_number(kpis.total_volume, 2),
        format_pct(kpis.growth_total)
    );
    println!(
        "  Ethanol received:   {} m3 ({})",
        format_number(kpis.ethanol_reception, 2),
        format_pct(kpis.growth_reception)
    );
    println!(
        "  Ethanol delivered:  {} m3 ({})\n",
        format_number(kpis.ethanol_delivery, 2),
        format_pct(kpis.growth_delivery)
    );
}

pub fn render_load_report(report: &LoadReport) {
    println!(
        "Processing dataset... ({} rows read, {} kept)",
        format_int(report.total_rows),
        format_int(report.kept_rows)
    );
    if report.dropped_volume > 0 || report.malformed_rows > 0 {
        println!(
            "Note: {} rows skipped due to unparseable volume, {} malformed.",
            format_int(report.dropped_volume),
            format_int(report.malformed_rows)
        );
    }
    if report.missing_month > 0 {
        println!(
            "Info: {} rows have no valid reference month.",
            format_int(report.missing_month)
        );
    }
    if report.unknown_direction > 0 || report.unknown_operation_type > 0 {
        println!(
            "Info: {} unmapped directions, {} unmapped operation types.",
            format_int(report.unknown_direction),
            format_int(report.unknown_operation_type)
        );
    }
    println!();
}

fn export_panel<T: Serialize>(
    dir: &Path,
    name: &str,
    panel: &Panel<Vec<T>>,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    if let Panel::Ready(rows) = panel {
        let path = dir.join(name);
        write_csv(&path, rows)?;
        written.push(path);
    }
    Ok(())
}

/// Write every table currently shown plus the KPI record. Panels showing a
/// placeholder are skipped.
pub fn export_dashboard(dir: &Path, dash: &Dashboard) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    export_panel(dir, "ethanol_received.csv", &dash.ethanol_received, &mut written)?;
    export_panel(dir, "ethanol_delivered.csv", &dash.ethanol_delivered, &mut written)?;
    export_panel(dir, "selection_by_month.csv", &dash.by_month, &mut written)?;
    export_panel(dir, "selection_by_product.csv", &dash.by_product, &mut written)?;
    export_panel(
        dir,
        "selection_by_month_and_type.csv",
        &dash.by_month_and_type,
        &mut written,
    )?;

    if let Some(filtered) = dash.filtered() {
        let path = dir.join("filtered_records.csv");
        write_csv(&path, filtered)?;
        written.push(path);
    }

    let path = dir.join("other_products_summary.csv");
    write_csv(&path, dash.other_products())?;
    written.push(path);

    let path = dir.join("kpis.json");
    write_json(&path, dash.kpis())?;
    written.push(path);

    info!("Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::sample;
    use crate::normalize::Dataset;
    use crate::view::FilterEvent;

    fn dashboard() -> Dashboard {
        Dashboard::new(Dataset {
            records: sample(),
            last_updated: String::new(),
            report: LoadReport::default(),
        })
    }

    #[test]
    fn export_writes_ready_panels_and_kpis() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard();
        dash.start();
        let written = export_dashboard(dir.path(), &dash).unwrap();
        assert_eq!(written.len(), 8);

        let kpis: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("kpis.json")).unwrap())
                .unwrap();
        assert_eq!(kpis["latest_month_label"], "2024-02");

        let summary_path = dir.path().join("other_products_summary.csv");
        let summary = std::fs::read_to_string(summary_path).unwrap();
        let mut lines = summary.lines();
        assert_eq!(
            lines.next(),
            Some("reference_month,product_description,operation_direction,volume_m3")
        );
        assert!(lines.next().unwrap().starts_with("2024-02,"));
    }

    #[test]
    fn placeholder_panels_are_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let mut dash = dashboard();
        dash.dispatch(FilterEvent::PeriodChanged(None));
        let written = export_dashboard(dir.path(), &dash).unwrap();
        // summary and KPI record only
        assert_eq!(written.len(), 2);
        assert!(!dir.path().join("ethanol_received.csv").exists());
    }
}
