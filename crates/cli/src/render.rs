//! Plain-text tables for ledger contents and task results.

use std::fmt::Write;

use chrono::NaiveDate;
use option_ledger_core::{ClosePrice, LedgerStore, OptionContract, QueryRow, QuerySnapshot};
use option_ledger_tasks::ErrorReport;

const RULE_WIDTH: usize = 118;

fn close_cell(close: Option<ClosePrice>) -> String {
    match close {
        Some(ClosePrice::Resolved(price)) => format!("{price:.2}"),
        Some(ClosePrice::Missing) => "N/A".to_string(),
        None => "-".to_string(),
    }
}

fn row_header(date_label: &str) -> String {
    format!(
        "{:<12} {:<20} {:>10} {:>14} {:>10} {:>14} {:>13} {:>14}",
        date_label,
        "Option",
        "Strike",
        "Daily Reversal",
        "Close",
        "Actual Volume",
        "Close Amount",
        "Position"
    )
}

fn row_line(row: &QueryRow) -> String {
    format!(
        "{:<12} {:<20} {:>10.2} {:>14.2} {:>10} {:>14.2} {:>13.2} {:>14.2}",
        row.date.to_string(),
        row.option_name,
        row.strike_price,
        row.daily_reversal,
        close_cell(row.close_price),
        row.actual_volume,
        row.close_amount,
        row.position
    )
}

fn rows_table(out: &mut String, date_label: &str, rows: &[QueryRow]) {
    let _ = writeln!(out, "{}", row_header(date_label));
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    for row in rows {
        let _ = writeln!(out, "{}", row_line(row));
    }
}

#[must_use]
pub fn snapshot(snapshot: &QuerySnapshot) -> String {
    let mut out = String::new();
    match snapshot {
        QuerySnapshot::Single { option_name, rows } => {
            let _ = writeln!(out, "{option_name}");
            let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
            if rows.is_empty() {
                let _ = writeln!(out, "No trade dates up to the query date.");
            } else {
                rows_table(&mut out, "Date", rows);
            }
        }
        QuerySnapshot::Aggregate(aggregate) => {
            let _ = writeln!(out, "Active options: {}", aggregate.active_count);
            let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
            rows_table(&mut out, "Date", &aggregate.active);
            let _ = writeln!(out);
            let _ = writeln!(out, "Expired options: {}", aggregate.expired_count);
            let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
            rows_table(&mut out, "Expiry Date", &aggregate.expired);
        }
    }
    out
}

/// Lists unavailable close prices, one option per line.
#[must_use]
pub fn error_report(report: &ErrorReport) -> String {
    let mut out = String::new();
    if report.is_empty() {
        return out;
    }
    let _ = writeln!(out, "Close prices could not be fetched for:");
    for (name, dates) in report.iter() {
        let dates: Vec<String> = dates.iter().map(NaiveDate::to_string).collect();
        let _ = writeln!(out, "  {name}: {}", dates.join(", "));
    }
    out
}

#[must_use]
pub fn option_list(ledger: &LedgerStore, today: NaiveDate) -> String {
    let mut out = String::new();
    if ledger.is_empty() {
        let _ = writeln!(out, "No options in the ledger.");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<20} {:<10} {:>10} {:>14} {:>14} {:>6} {:<12} {:<12} {:<8}",
        "Option", "Code", "Strike", "Initial Amount", "Daily Reversal", "Dates", "First", "Last",
        "Status"
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    for option in ledger.options() {
        let first = option
            .trade_dates()
            .iter()
            .min()
            .map_or_else(String::new, NaiveDate::to_string);
        let last = option
            .last_trade_date()
            .map_or_else(String::new, |d| d.to_string());
        let status = if option.is_expired(today) {
            "expired"
        } else {
            "active"
        };
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:>10.2} {:>14.2} {:>14.2} {:>6} {:<12} {:<12} {:<8}",
            option.name(),
            option.code(),
            option.strike_price(),
            option.initial_amount(),
            option.daily_reversal(),
            option.trade_dates().len(),
            first,
            last,
            status
        );
    }
    out
}

/// Terms of one option followed by its state on every trade date.
#[must_use]
pub fn option_detail(option: &OptionContract) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", option.name(), option.code());
    let _ = writeln!(out, "  strike price:   {:.2}", option.strike_price());
    let _ = writeln!(out, "  initial amount: {:.2}", option.initial_amount());
    let _ = writeln!(out, "  daily reversal: {:.2}", option.daily_reversal());
    let _ = writeln!(out);

    let rows: Vec<QueryRow> = option
        .trade_dates()
        .iter()
        .map(|date| QueryRow::capture(option, *date))
        .collect();
    rows_table(&mut out, "Date", &rows);
    out
}
