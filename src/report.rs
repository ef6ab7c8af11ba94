//! Console report and CSV export.
//!
//! The CSV column set and ordering are a compatibility surface: downstream
//! tooling keys on the exact header below. Rows are ordered by descending
//! actual investment, the same order the console table uses.

use crate::portfolio::Portfolio;
use crate::scoring::Valuation;
use chrono::Local;
use std::fs;
use std::io;
use std::path::Path;

pub const CSV_HEADER: &str = "ticker,price,pe_ratio,pb_ratio,valuation,base_score,raw_score,\
weighted_score,allocation_fraction,shares,investment";

/// Print the allocation table, totals and category breakdown to stdout.
pub fn print_summary(portfolio: &Portfolio) {
    println!();
    println!(
        "=== Allocation {} ===",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!(
        "{:<8} {:>10} {:>8} {:>8} {:<18} {:>10} {:>7} {:>12}",
        "TICKER", "PRICE", "P/E", "P/B", "VALUATION", "FRACTION", "SHARES", "INVESTED"
    );

    for line in portfolio.lines_by_investment() {
        println!(
            "{:<8} {:>10.2} {:>8.2} {:>8.2} {:<18} {:>10.4} {:>7} {:>12.2}",
            line.stock.quote.ticker,
            line.stock.quote.price,
            line.stock.quote.pe_ratio,
            line.stock.quote.pb_ratio,
            line.stock.valuation.label(),
            line.fraction,
            line.shares,
            line.investment,
        );
    }

    let invested = portfolio.invested();
    println!(
        "[BUDGET] invested ${:.2} / ${:.2} ({:.1}% used, ${:.2} residual)",
        invested,
        portfolio.budget,
        100.0 * invested / portfolio.budget,
        portfolio.residual,
    );

    for category in Valuation::all() {
        let members: Vec<_> = portfolio
            .lines
            .iter()
            .filter(|l| l.stock.valuation == category)
            .collect();
        if members.is_empty() {
            continue;
        }
        let invested: f64 = members.iter().map(|l| l.investment).sum();
        println!(
            "[{}] {} names, ${:.2} invested",
            category.label(),
            members.len(),
            invested
        );
    }
}

/// Write the allocation table as CSV, one row per instrument, including
/// zero-share lines.
pub fn write_csv(portfolio: &Portfolio, path: &Path) -> io::Result<()> {
    fs::write(path, render_csv(portfolio))
}

fn render_csv(portfolio: &Portfolio) -> String {
    let mut out = String::with_capacity(128 * (portfolio.lines.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for line in portfolio.lines_by_investment() {
        out.push_str(&format!(
            "{},{:.2},{:.4},{:.4},{},{:.6},{:.6},{:.6},{:.8},{},{:.2}\n",
            line.stock.quote.ticker,
            line.stock.quote.price,
            line.stock.quote.pe_ratio,
            line.stock.quote.pb_ratio,
            line.stock.valuation.label(),
            line.stock.base_score,
            line.stock.raw_score,
            line.stock.weighted_score,
            line.fraction,
            line.shares,
            line.investment,
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::AllocationLine;
    use crate::scoring::{ScoredStock, Valuation};
    use crate::stocks::StockQuote;

    fn line(ticker: &str, price: f64, shares: u32) -> AllocationLine {
        AllocationLine {
            stock: ScoredStock {
                quote: StockQuote {
                    ticker: ticker.to_string(),
                    price,
                    pe_ratio: 14.0,
                    pb_ratio: 2.0,
                },
                valuation: Valuation::PeUndervalued,
                base_score: 1.5,
                multiplier: 1.2,
                raw_score: 1.8,
                adjusted_score: 2.8,
                weighted_score: 21.952,
            },
            fraction: 0.5,
            allocation: price * shares as f64 + 1.0,
            shares,
            investment: price * shares as f64,
        }
    }

    fn sample() -> Portfolio {
        Portfolio {
            lines: vec![line("SMALL", 10.0, 1), line("BIG", 50.0, 3), line("NONE", 80.0, 0)],
            budget: 200.0,
            residual: 40.0,
        }
    }

    #[test]
    fn header_is_stable() {
        let columns: Vec<&str> = CSV_HEADER.split(',').collect();
        assert_eq!(
            columns,
            vec![
                "ticker",
                "price",
                "pe_ratio",
                "pb_ratio",
                "valuation",
                "base_score",
                "raw_score",
                "weighted_score",
                "allocation_fraction",
                "shares",
                "investment",
            ]
        );
    }

    #[test]
    fn rows_are_ordered_by_investment() {
        let csv = render_csv(&sample());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4); // header + 3 rows
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("BIG,"));
        assert!(lines[2].starts_with("SMALL,"));
        assert!(lines[3].starts_with("NONE,"));
    }

    #[test]
    fn zero_share_rows_are_exported() {
        let csv = render_csv(&sample());
        let none_row = csv.lines().find(|l| l.starts_with("NONE,")).unwrap();
        assert!(none_row.ends_with(",0,0.00"));
    }

    #[test]
    fn row_carries_the_full_column_set() {
        let csv = render_csv(&sample());
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row.split(',').count(), CSV_HEADER.split(',').count());
        assert!(row.contains("pe_undervalued"));
    }
}
