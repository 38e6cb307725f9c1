// Entry point and interactive console flow.
//
// The sheet is fetched and normalized once at startup; after that every
// menu choice is a filter event applied to the in-memory dashboard:
// - [1] prints KPIs, the ethanol series, the selection panels and the
//   other-products summary,
// - [2]-[6] change one control each,
// - [7] exports the current tables.
mod aggregate;
mod config;
mod error;
mod kpi;
mod normalize;
mod output;
mod source;
mod types;
mod util;
mod view;

use aggregate::{
    direction_options, month_bounds, operation_type_options, product_options, volume_bounds,
    Selection,
};
use anyhow::Context;
use clap::Parser;
use config::Args;
use normalize::Dataset;
use std::fmt::Display;
use std::io::{self, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::{DateRange, VolumeRange, YearMonth};
use util::{format_number, parse_volume};
use view::{Dashboard, FilterEvent};

/// Print a prompt and read one trimmed line. `None` once stdin is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Numbered picker over dropdown options. `[0]` selects every value.
///
/// Returns `None` when the input is not a listed number.
fn pick_option<T: Display + Clone>(title: &str, options: &[T]) -> Option<Option<T>> {
    println!("{}", title);
    println!("[0] All");
    for (i, opt) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, opt);
    }
    let choice = read_line("Enter choice: ")?;
    match choice.parse::<usize>() {
        Ok(0) => Some(None),
        Ok(n) if n <= options.len() => Some(Some(options[n - 1].clone())),
        _ => {
            println!("Invalid choice.\n");
            None
        }
    }
}

fn describe_selection(selection: &Selection) -> String {
    fn or_all<T: Display>(v: &Option<T>) -> String {
        v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "All".to_string())
    }
    let range = &selection.volume_range;
    let bound = |v: f64| {
        if v.is_finite() {
            format_number(v, 2)
        } else {
            "*".to_string()
        }
    };
    format!(
        "{} - {} ({}), volume {}..{} m3",
        or_all(&selection.product),
        or_all(&selection.operation_type),
        or_all(&selection.direction),
        bound(range.min),
        bound(range.max)
    )
}

fn render_dashboard(dash: &Dashboard, rows: usize) {
    println!("TECAB MONITORING - SINDALCOOL");
    if !dash.data().last_updated.is_empty() {
        println!("Last updated: {}", dash.data().last_updated);
    }
    println!();
    output::render_kpis(dash.kpis());

    let period = match dash.state().period {
        Some(p) => format!("{} to {}", p.start, p.end),
        None => "no period".to_string(),
    };
    output::render_panel(
        &format!("Ethanol received at the port ({})", period),
        &dash.ethanol_received,
        rows,
    );
    output::render_panel(
        &format!("Ethanol delivered at the port ({})", period),
        &dash.ethanol_delivered,
        rows,
    );

    let selection = describe_selection(&dash.state().selection);
    println!("Operation type analysis: {}\n", selection);
    output::render_panel("Volume by month", &dash.by_month, rows);
    output::render_panel("Volume by product", &dash.by_product, rows);
    output::render_panel("Volume by month and operation type", &dash.by_month_and_type, rows);

    println!("Monthly summary of other products\n");
    output::preview_table_rows(dash.other_products(), rows);
}

fn prompt_volume_range(dash: &Dashboard) -> Option<FilterEvent> {
    if let Some(bounds) = volume_bounds(&dash.data().records) {
        println!(
            "Volumes in data: {} to {} m3 (blank = no bound)",
            format_number(bounds.min, 2),
            format_number(bounds.max, 2)
        );
    }
    let min = read_line("Minimum volume: ")?;
    let max = read_line("Maximum volume: ")?;
    let parse_bound = |s: &str, unbounded: f64| {
        if s.is_empty() {
            Some(unbounded)
        } else {
            parse_volume(Some(s))
        }
    };
    match (
        parse_bound(&min, f64::NEG_INFINITY),
        parse_bound(&max, f64::INFINITY),
    ) {
        (Some(min), Some(max)) => Some(FilterEvent::VolumeRangeChanged(VolumeRange::new(min, max))),
        _ => {
            println!("Invalid volume.\n");
            None
        }
    }
}

fn prompt_period(dash: &Dashboard) -> Option<FilterEvent> {
    if let Some(bounds) = month_bounds(&dash.data().records) {
        println!("Months in data: {} to {}", bounds.start, bounds.end);
    }
    let start = read_line("Start month (YYYY-MM, blank clears the period): ")?;
    if start.is_empty() {
        return Some(FilterEvent::PeriodChanged(None));
    }
    let end = read_line("End month (YYYY-MM): ")?;
    match (start.parse::<YearMonth>(), end.parse::<YearMonth>()) {
        (Ok(start), Ok(end)) => Some(FilterEvent::PeriodChanged(Some(DateRange::new(start, end)))),
        (Err(e), _) | (_, Err(e)) => {
            println!("{}\n", e);
            None
        }
    }
}

fn run_menu(dash: &mut Dashboard, args: &Args) {
    loop {
        println!("Select an option:");
        println!("[1] Show dashboard");
        println!("[2] Select product");
        println!("[3] Select operation type");
        println!("[4] Select operation direction");
        println!("[5] Set volume range");
        println!("[6] Set period");
        println!("[7] Export tables");
        println!("[0] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else {
            break;
        };
        println!();
        let event = match choice.as_str() {
            "1" => {
                render_dashboard(dash, args.preview_rows);
                None
            }
            "2" => pick_option("Select the product:", &product_options(&dash.data().records))
                .map(FilterEvent::ProductChanged),
            "3" => pick_option(
                "Select the operation type:",
                &operation_type_options(&dash.data().records),
            )
            .map(FilterEvent::OperationTypeChanged),
            "4" => pick_option(
                "Select the operation direction:",
                &direction_options(&dash.data().records),
            )
            .map(FilterEvent::DirectionChanged),
            "5" => prompt_volume_range(dash),
            "6" => prompt_period(dash),
            "7" => {
                match output::export_dashboard(&args.export_dir, dash) {
                    Ok(files) => {
                        for f in files {
                            println!("Exported {}", f.display());
                        }
                        println!();
                    }
                    Err(e) => error!("Export failed: {}", e),
                }
                None
            }
            "0" => break,
            _ => {
                println!("Invalid choice. Please enter 0-7.\n");
                None
            }
        };
        if let Some(event) = event {
            dash.dispatch(event);
            println!("Filters: {}\n", describe_selection(&dash.state().selection));
        }
    }
    println!("Exiting the program.");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let target = args.target();
    let dataset = Dataset::load(&target, args.timeout())
        .with_context(|| format!("failed to load movement data from {}", target))?;
    output::render_load_report(&dataset.report);

    let mut dash = Dashboard::new(dataset);
    dash.start();
    info!("Dashboard ready");

    if args.once {
        render_dashboard(&dash, args.preview_rows);
        return Ok(());
    }
    run_menu(&mut dash, &args);
    Ok(())
}
