// Entry point and interactive menu.
//
// - Option [1] loads the forecast and execution tables once.
// - Options [2]-[6] render one dashboard view each, printing Markdown
//   previews and writing the view as JSON under the output directory.
// - The execution view can also export its filtered table as CSV.
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use pm_dashboard::reports::{
    department_deep_dive, execution_comparison, executive_overview, operational_insights,
    workload_calendar, CalendarFilter, DepartmentSelection, ExecutionFilter, WorkloadMetric,
};
use pm_dashboard::types::{ComplexityLevel, IntervalCategory, PerformanceTier};
use pm_dashboard::util::{
    display_one_decimal, display_opt_hours, display_rate, display_signed_pct,
    display_two_decimals, format_int, parse_date_safe, MISSING,
};
use pm_dashboard::{logging, output, DashboardConfig, Dataset};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing::error;

// Loaded once, read-only afterwards; every view borrows it.
static DATASET: OnceCell<Dataset> = OnceCell::new();

const PREVIEW_ROWS: usize = 10;

fn prompt(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Empty input means "no restriction".
fn prompt_optional(label: &str) -> Option<String> {
    let s = prompt(label);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Comma-separated list; empty input means "all".
fn prompt_list(label: &str) -> Option<Vec<String>> {
    prompt_optional(label).map(|s| {
        s.split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    })
}

/// Blank or unparseable input leaves the bound open.
fn prompt_date(label: &str) -> Option<NaiveDate> {
    parse_date_safe(prompt_optional(label).as_deref())
}

fn prompt_yes_no(label: &str) -> bool {
    loop {
        match prompt(&format!("{} (Y/N)", label)).to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Pick from a numbered list by index or by name.
fn choose(label: &str, options: &[String]) -> Option<String> {
    for (i, o) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, o);
    }
    let answer = prompt_optional(label)?;
    if let Ok(n) = answer.parse::<usize>() {
        return options.get(n.checked_sub(1)?).cloned();
    }
    options.iter().find(|o| o.eq_ignore_ascii_case(&answer)).cloned()
}

fn dataset() -> Option<&'static Dataset> {
    let ds = DATASET.get();
    if ds.is_none() {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
    }
    ds
}

fn save_json<T: serde::Serialize>(cfg: &DashboardConfig, name: &str, value: &T) {
    let path = cfg.output_dir.join(name);
    match output::write_json(&path, value) {
        Ok(()) => println!("(Full view exported to {})\n", path.display()),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn handle_load(cfg: &DashboardConfig) {
    if DATASET.get().is_some() {
        println!("Data already loaded.\n");
        return;
    }
    match Dataset::load(cfg) {
        Ok(ds) => {
            let f = &ds.forecast_report;
            println!(
                "Forecast: {} rows loaded of {} ({} skipped, {} with imputed hours)",
                format_int(f.loaded_rows),
                format_int(f.total_rows),
                format_int(f.parse_errors),
                format_int(f.imputed_total_hours)
            );
            let e = &ds.execution_report;
            println!(
                "Execution: {} groupings loaded ({} skipped)",
                format_int(ds.execution().len()),
                format_int(e.parse_errors)
            );
            for (dept, col) in ds.locations().iter() {
                println!("  {} tracks location by {}", dept, col);
            }
            println!();
            let _ = DATASET.set(ds);
        }
        Err(e) => {
            error!(error = %e, "load failed");
            eprintln!("Failed to load data: {}\n", e);
        }
    }
}

fn handle_executive(cfg: &DashboardConfig, ds: &Dataset) {
    let view = executive_overview(ds);
    if view.is_empty() {
        println!("No forecast rows to summarise.\n");
        return;
    }
    let k = &view.kpis;
    println!("\nExecutive Overview");
    println!("  Total planned hours: {}", display_opt_hours(&k.total_planned_hours));
    println!("  Total PMs:           {}", format_int(k.distinct_pms));
    println!("  Avg complexity:      {}", display_two_decimals(&k.mean_complexity));
    println!("  Departments:         {}", k.departments);
    output::preview_table("Department Comparison", None, &view.departments, PREVIEW_ROWS);
    output::preview_table(
        "Monthly Labor Hours by Department",
        None,
        &view.monthly_by_department,
        PREVIEW_ROWS,
    );
    output::preview_table("Scope Type Distribution", None, &view.scope_distribution, PREVIEW_ROWS);
    output::preview_table("Top 10 Job Types", None, &view.top_job_types, PREVIEW_ROWS);
    save_json(cfg, "executive_overview.json", &view);
}

fn handle_department(cfg: &DashboardConfig, ds: &Dataset) {
    println!("\nDepartments:");
    let Some(department) = choose("Department", &ds.departments()) else {
        println!("Unknown department.\n");
        return;
    };
    let mut sel = DepartmentSelection::new(department);
    sel.crafts = prompt_list("Crafts, comma separated (blank for all)");
    sel.month = prompt_optional("Detail month YYYY-MM (blank for all)");
    if prompt_yes_no("Stack intervals by laborers instead of hours?") {
        sel.metric = WorkloadMetric::Laborers;
    }

    let view = department_deep_dive(ds, &sel);
    if view.is_empty() {
        println!("No rows for {}.\n", sel.department);
        return;
    }
    let k = &view.kpis;
    println!("\nDepartment Deep Dive: {}", view.department);
    println!("  Total hours:   {}", display_opt_hours(&k.total_hours));
    println!("  Total PMs:     {}", format_int(k.pm_count));
    println!("  Avg complexity: {}", display_two_decimals(&k.mean_complexity));
    println!("  Primary craft: {}", k.primary_craft.as_deref().unwrap_or(MISSING));
    println!("  Avg hrs/PM:    {}", display_one_decimal(&k.hours_per_pm));

    output::preview_table(
        "Monthly Labor Hours by Craft",
        None,
        &view.monthly_by_craft,
        PREVIEW_ROWS,
    );
    let note = format!("{} uses {} for location tracking", view.department, view.location_column);
    output::preview_table("Zone/Line Analysis", Some(&note), &view.locations, PREVIEW_ROWS);
    output::preview_table("Job Type Mix", None, &view.job_types, PREVIEW_ROWS);
    output::preview_table("Complexity Levels", None, &view.complexity_levels, PREVIEW_ROWS);
    output::preview_table("Top 10 Most Complex PMs", None, &view.top_complex_pms, PREVIEW_ROWS);
    output::preview_table("Interval Complexity", None, &view.interval_complexity, PREVIEW_ROWS);
    output::preview_table(
        "Monthly Workload by Interval",
        None,
        &view.monthly_by_interval,
        PREVIEW_ROWS,
    );
    output::preview_table(
        "Potential Bottleneck Months",
        None,
        &view.bottleneck_months,
        PREVIEW_ROWS,
    );
    output::preview_table("Interval Breakdown", None, &view.interval_breakdown, PREVIEW_ROWS);
    output::preview_table("Detail Rows", None, &view.detail, PREVIEW_ROWS);
    save_json(cfg, "department_deep_dive.json", &view);
}

fn handle_calendar(cfg: &DashboardConfig, ds: &Dataset) {
    let complexity = prompt_optional("Complexity level (Low/Medium/High/Very High, blank for all)")
        .and_then(|s| ComplexityLevel::parse_label(&s));
    let filter = CalendarFilter {
        department: prompt_optional("Department (blank for all)"),
        craft: prompt_optional("Craft (blank for all)"),
        complexity,
        start: prompt_date("Start date YYYY-MM-DD (blank for none)"),
        end: prompt_date("End date YYYY-MM-DD (blank for none)"),
    };

    let view = workload_calendar(ds, &filter);
    if view.is_empty() {
        println!("No PMs match the selected filters.\n");
        return;
    }
    let k = &view.kpis;
    println!("\nWorkload Calendar");
    println!("  Total planned hours: {}", display_opt_hours(&k.total_planned_hours));
    println!("  Total PMs:           {}", format_int(k.pm_count));
    println!("  Peak month:          {}", k.peak_month.as_deref().unwrap_or(MISSING));
    output::preview_table("Monthly Labor Hours", None, &view.monthly, 12);
    output::preview_table("Weekly Labor Hours", Some("first 52 weeks"), &view.weekly, PREVIEW_ROWS);
    output::preview_pivot("Department Workload Calendar", &view.department_by_month, "Department");
    output::preview_table("Top 3 Busiest Months", None, view.busiest_months(), 3);
    save_json(cfg, "workload_calendar.json", &view);
}

fn handle_insights(cfg: &DashboardConfig, ds: &Dataset) {
    let view = operational_insights(ds);
    if view.is_empty() {
        println!("No forecast rows to analyse.\n");
        return;
    }
    output::preview_table("Maintenance Interval Patterns", None, &view.intervals, PREVIEW_ROWS);
    output::preview_pivot(
        "Craft Utilization Across Departments",
        &view.craft_by_department,
        "Craft",
    );
    output::preview_table(
        "Overall Scope Distribution",
        None,
        &view.scope_distribution,
        PREVIEW_ROWS,
    );
    output::preview_table("Department Asset-Focus Ranking", None, &view.asset_focus, PREVIEW_ROWS);
    output::preview_table(
        "Average Complexity by Department",
        None,
        &view.complexity_by_department,
        PREVIEW_ROWS,
    );
    output::preview_table("Complexity Levels", None, &view.complexity_levels, PREVIEW_ROWS);
    output::preview_table("Job Type Summary", Some("top 15 by hours"), &view.job_types, 15);
    save_json(cfg, "operational_insights.json", &view);
}

fn handle_execution(cfg: &DashboardConfig, ds: &Dataset) {
    if ds.execution().is_empty() {
        println!("No execution data loaded.\n");
        return;
    }
    println!("\nDepartments with execution data: {}", ds.execution_departments().join(", "));
    let intervals = prompt_list("Intervals, comma separated (blank for all)").map(|v| {
        v.iter()
            .filter_map(|s| {
                IntervalCategory::ALL
                    .into_iter()
                    .find(|i| i.label().eq_ignore_ascii_case(s))
            })
            .collect()
    });
    let tiers = prompt_list("Tiers, comma separated (blank for all)")
        .map(|v| v.iter().filter_map(|s| PerformanceTier::parse_label(s)).collect());
    let filter = ExecutionFilter {
        departments: prompt_list("Departments, comma separated (blank for all)"),
        intervals,
        job_types: prompt_list("Job types, comma separated (blank for all)"),
        crafts: prompt_list("Crafts, comma separated (blank for all)"),
        tiers,
        start: prompt_date("Start date YYYY-MM-DD (blank for none)"),
        end: prompt_date("End date YYYY-MM-DD (blank for none)"),
    };

    let view = execution_comparison(ds, &filter);
    if view.is_empty() {
        println!("No groupings match the selected filters.\n");
        return;
    }
    let k = &view.kpis;
    println!("\nExecution Comparison");
    println!("  Groupings:        {}", format_int(k.groupings));
    println!("  Avg completion:   {}", display_rate(&k.mean_completion_rate));
    println!("  Avg on-time:      {}", display_rate(&k.mean_on_time_rate));
    println!("  Avg deviation:    {}", display_signed_pct(&k.mean_hour_deviation_pct));
    println!(
        "  Planned / actual: {} / {} hrs",
        display_opt_hours(&k.planned_hours),
        display_opt_hours(&k.actual_hours)
    );
    output::preview_table("Department Performance", None, &view.departments, PREVIEW_ROWS);
    output::preview_table("Performance Tiers", None, &view.tiers, PREVIEW_ROWS);
    output::preview_table("Monthly Trend", None, &view.monthly_trend, 12);
    output::preview_table("Top 10 Hour Overruns", None, &view.top_overruns, PREVIEW_ROWS);
    save_json(cfg, "execution_comparison.json", &view);

    if prompt_yes_no("Export filtered table as CSV?") {
        match output::export_execution_csv(&cfg.output_dir, &view.export) {
            Ok(path) => println!("Exported {} rows to {}\n", view.export.len(), path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
}

fn main() -> ExitCode {
    logging::init();

    let arg = std::env::args().nth(1);
    let cfg = match DashboardConfig::load(arg.as_deref().map(Path::new)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    loop {
        println!("PM Planning Dashboard");
        println!("[1] Load data");
        println!("[2] Executive Overview");
        println!("[3] Department Deep Dive");
        println!("[4] Workload Calendar");
        println!("[5] Operational Insights");
        println!("[6] Execution Comparison");
        println!("[0] Exit\n");
        match prompt("Enter choice").as_str() {
            "1" => handle_load(&cfg),
            "2" => {
                if let Some(ds) = dataset() {
                    handle_executive(&cfg, ds);
                }
            }
            "3" => {
                if let Some(ds) = dataset() {
                    handle_department(&cfg, ds);
                }
            }
            "4" => {
                if let Some(ds) = dataset() {
                    handle_calendar(&cfg, ds);
                }
            }
            "5" => {
                if let Some(ds) = dataset() {
                    handle_insights(&cfg, ds);
                }
            }
            "6" => {
                if let Some(ds) = dataset() {
                    handle_execution(&cfg, ds);
                }
            }
            "0" => {
                println!("Exiting the program.");
                return ExitCode::SUCCESS;
            }
            _ => println!("Invalid choice. Please enter 0-6.\n"),
        }
    }
}
