use rust_decimal::Decimal;
use serde::Serialize;

use super::fields::{normalize_date, parse_amount};

/// One row read from a statement: `date category amount description...`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementLine {
    /// `YYYY-MM-DD` when the date could be read, otherwise the raw token.
    pub date: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
}

/// Splits statement text into rows. Lines with fewer than four columns or
/// a non-numeric third column (headers, page footers) are skipped.
pub fn parse_statement(text: &str) -> Vec<StatementLine> {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            if !parts[2].chars().any(|c| c.is_ascii_digit()) {
                return None;
            }
            let magnitude = parse_amount(parts[2])?;
            // Debits are printed with a leading minus.
            let amount = if parts[2].starts_with('-') { -magnitude } else { magnitude };
            let date = normalize_date(parts[0])
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| parts[0].to_string());

            Some(StatementLine {
                date,
                category: parts[1].to_string(),
                amount,
                description: parts[3..].join(" "),
            })
        })
        .collect()
}
