//! Report rendering: plain text for the terminal, pretty JSON for tooling.

use crate::aggregate::{AggregationTable, GroupSum};
use crate::cli::OutputFormat;
use crate::pages::{
    CategoryReport, DashboardReport, DeepVisualsReport, ExplorerReport, OverviewReport,
    PageReport, RowTable,
};
use crate::statistics::GroupDistribution;
use color_eyre::Result;
use std::fmt::Write;

pub fn render(report: &PageReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(render_text(report)),
    }
}

pub fn render_text(report: &PageReport) -> String {
    let mut out = String::new();
    match report {
        PageReport::Overview(r) => overview(&mut out, r),
        PageReport::Dashboard(r) => dashboard(&mut out, r),
        PageReport::Category(r) => category(&mut out, r),
        PageReport::Explorer(r) => explorer(&mut out, r),
        PageReport::DeepVisuals(r) => deep_visuals(&mut out, r),
    }
    if !report.warnings().is_empty() {
        heading(&mut out, "Warnings");
        for w in report.warnings() {
            let _ = writeln!(out, "  ! {}", w);
        }
    }
    out
}

/// Formats with `,` thousands separators and `decimals` fractional digits.
pub fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn opt_number(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| thousands(v, decimals))
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}\n{}", title, "-".repeat(title.chars().count()));
}

fn metric(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<22} {}", label, value);
}

fn group_sums(out: &mut String, title: &str, sums: &Option<Vec<GroupSum>>) {
    let Some(sums) = sums else { return };
    heading(out, title);
    if sums.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return;
    }
    let total: f64 = sums.iter().map(|s| s.sum).sum();
    let width = sums.iter().map(|s| s.group.chars().count()).max().unwrap_or(0);
    for s in sums {
        let share = if total != 0.0 {
            format!(" ({:.1}%)", s.sum / total * 100.0)
        } else {
            String::new()
        };
        let _ = writeln!(out, "  {:<width$}  {:>12}{}", s.group, thousands(s.sum, 0), share);
    }
}

fn aggregation(out: &mut String, title: &str, table: &Option<AggregationTable>) {
    let Some(table) = table else { return };
    heading(out, title);
    if table.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return;
    }
    let _ = writeln!(
        out,
        "  {:<12}{}",
        table.group_columns.join(" / "),
        table
            .value_labels
            .iter()
            .map(|l| format!("  {:>20}", l))
            .collect::<String>()
    );
    for row in &table.rows {
        let values: String = row
            .values
            .iter()
            .map(|v| format!("  {:>20}", opt_number(*v, 0)))
            .collect();
        let _ = writeln!(out, "  {:<12}{}", row.key.join(" / "), values);
    }
}

fn rows(out: &mut String, title: &str, table: &RowTable) {
    heading(out, title);
    let cell = |v: &Option<String>| v.clone().unwrap_or_else(|| "null".to_string());
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &table.rows {
        for (w, v) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell(v).chars().count());
        }
    }
    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    let _ = writeln!(out, "  {}", line(table.columns.clone()));
    for row in &table.rows {
        let _ = writeln!(out, "  {}", line(row.iter().map(cell).collect()));
    }
    if table.is_truncated() {
        let _ = writeln!(
            out,
            "  ... {} of {} rows shown",
            table.rows.len(),
            thousands(table.total_rows as f64, 0)
        );
    }
}

fn distributions(out: &mut String, title: &str, dists: &Option<Vec<GroupDistribution>>) {
    let Some(dists) = dists else { return };
    heading(out, title);
    let _ = writeln!(
        out,
        "  {:<16} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "group", "n", "min", "q1", "median", "q3", "max"
    );
    for d in dists {
        let _ = writeln!(
            out,
            "  {:<16} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            d.group,
            d.count,
            opt_number(d.min, 1),
            opt_number(d.q1, 1),
            opt_number(d.median, 1),
            opt_number(d.q3, 1),
            opt_number(d.max, 1)
        );
    }
}

fn overview(out: &mut String, r: &OverviewReport) {
    let _ = writeln!(out, "Data loaded");
    if let Some(source) = &r.source {
        metric(out, "Source", source);
    }
    metric(out, "Rows", &thousands(r.rows as f64, 0));
    metric(out, "Columns", &r.columns.len().to_string());
    heading(out, "Schema");
    for c in &r.columns {
        let _ = writeln!(out, "  {:<24} {}", c.name, c.dtype);
    }
    rows(out, "First rows", &r.preview);
}

fn dashboard(out: &mut String, r: &DashboardReport) {
    let _ = writeln!(out, "Inventory dashboard");
    metric(
        out,
        "Rows",
        &format!(
            "{} of {}",
            thousands(r.filtered_rows as f64, 0),
            thousands(r.total_rows as f64, 0)
        ),
    );
    let m = &r.metrics;
    metric(out, "Total units sold", &format!("{} EA", opt_number(m.total_units, 0)));
    metric(
        out,
        "Mean inventory",
        &format!("{} EA", opt_number(m.mean_inventory.map(|v| v as f64), 0)),
    );
    metric(
        out,
        "Stockout risk rows",
        &m.stockout_rows.map_or_else(|| "n/a".to_string(), |n| n.to_string()),
    );
    metric(out, "Mean price", &format!("${:.2}", m.mean_price));
    aggregation(out, "Daily trend", &r.trend);
    group_sums(out, "Units sold by category", &r.units_by_category);
    rows(out, "Filtered data", &r.filtered);
    if let Some(stockout) = &r.stockout {
        rows(out, "Restock needed", stockout);
    }
}

fn category(out: &mut String, r: &CategoryReport) {
    let _ = writeln!(
        out,
        "Category analysis: {}",
        r.selected.as_deref().unwrap_or("(none)")
    );
    metric(out, "Categories", &r.categories.join(", "));
    let m = &r.metrics;
    metric(out, "Total units sold", &format!("{} EA", opt_number(m.total_units, 0)));
    metric(
        out,
        "Mean inventory",
        &format!("{} EA", opt_number(m.mean_inventory.map(|v| v as f64), 0)),
    );
    metric(out, "Revenue", &format!("${}", thousands(m.revenue, 2)));
    metric(out, "Records", &thousands(m.records as f64, 0));
    aggregation(out, "Daily units sold", &r.trend);
    group_sums(out, "Units sold by region", &r.units_by_region);
    rows(out, "Records", &r.records);
}

fn explorer(out: &mut String, r: &ExplorerReport) {
    let _ = writeln!(out, "Explorer");
    let pct = r
        .matched_pct
        .map_or_else(String::new, |p| format!(" ({:.1}% of total)", p));
    metric(
        out,
        "Matching rows",
        &format!("{}{}", thousands(r.matched_rows as f64, 0), pct),
    );
    metric(out, "Categorical filters", &r.categorical_columns.join(", "));
    metric(out, "Range filters", &r.numeric_columns.join(", "));
    if !r.thresholds.is_empty() {
        heading(out, "Range thresholds");
        for t in &r.thresholds {
            match &t.bounds {
                Some(b) => {
                    let _ = writeln!(
                        out,
                        "  {:<18} p{}..p{}  =>  {} ..= {}",
                        t.column,
                        b.low_pct,
                        b.high_pct,
                        thousands(b.low_value, 2),
                        thousands(b.high_value, 2)
                    );
                }
                None => {
                    let _ = writeln!(out, "  {:<18} no values", t.column);
                }
            }
        }
    }
    let Some(summary) = &r.summary else {
        let _ = writeln!(out, "\nNo rows match the current filters.");
        return;
    };
    rows(out, "Matching rows", &r.filtered);
    group_sums(out, "Top products by units sold", &summary.top_products);
    group_sums(out, "Units sold by category", &summary.units_by_category);
    aggregation(out, "Units sold vs demand forecast", &summary.trend);
    if let Some(points) = &summary.scatter {
        heading(out, "Price vs units sold");
        for p in points {
            let _ = writeln!(
                out,
                "  {:<10} {:<14} price {:>10}  units {:>8}  inventory {:>8}",
                p.product_id.as_deref().unwrap_or("-"),
                p.category.as_deref().unwrap_or("-"),
                thousands(p.price, 2),
                thousands(p.units_sold, 0),
                opt_number(p.inventory_level, 0)
            );
        }
    }
}

fn deep_visuals(out: &mut String, r: &DeepVisualsReport) {
    let _ = writeln!(out, "Deep visuals");
    let m = &r.correlation;
    heading(out, "Correlation matrix");
    let width = m.columns.iter().map(|c| c.chars().count()).max().unwrap_or(0).max(6);
    let _ = writeln!(
        out,
        "  {:<width$}{}",
        "",
        m.columns.iter().map(|c| format!(" {:>width$}", c)).collect::<String>()
    );
    for (name, row) in m.columns.iter().zip(&m.correlations) {
        let cells: String = row
            .iter()
            .map(|v| match v {
                Some(r) => format!(" {:>width$.2}", r),
                None => format!(" {:>width$}", "n/a"),
            })
            .collect();
        let _ = writeln!(out, "  {:<width$}{}", name, cells);
    }
    if let Some((a, b, coef)) = m.strongest_pairs().first() {
        let _ = writeln!(out, "  strongest: {} ~ {} ({:.2})", a, b, coef);
    }

    if let Some(nodes) = &r.hierarchy {
        heading(out, "Units sold by region and category");
        for node in nodes {
            let _ = writeln!(out, "  {:<20} {:>12}", node.region, thousands(node.units_sold, 0));
            for c in &node.categories {
                let _ = writeln!(out, "    {:<18} {:>12}", c.group, thousands(c.sum, 0));
            }
        }
    }
    if let Some(bubbles) = &r.bubbles {
        heading(out, "Price vs demand by product");
        for b in bubbles {
            let _ = writeln!(
                out,
                "  {:<14} {:<10} mean price {:>10}  units {:>10}  mean inventory {:>10}",
                b.category,
                b.product_id,
                opt_number(b.mean_price, 2),
                thousands(b.units_sold, 0),
                opt_number(b.mean_inventory, 0)
            );
        }
    }
    distributions(out, "Units sold by weather", &r.weather);
    distributions(out, "Units sold by promotion", &r.promotion);
}
