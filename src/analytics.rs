//! Aggregates computed on read from a user's transactions.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::{Transaction, TransactionType};

/// Months shown on the dashboard chart.
pub const DASHBOARD_MONTHS: usize = 5;
/// Months shown on the analytics page.
pub const ANALYTICS_MONTHS: usize = 6;
const RECENT_TRANSACTIONS: usize = 5;
const ANOMALY_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    /// Short month name, e.g. `Aug`.
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub savings: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub percentage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub savings_rate: Decimal,
    pub transaction_count: usize,
    pub recent_transactions: Vec<Transaction>,
    pub monthly: Vec<MonthlyTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub trends: String,
    pub anomalies: String,
    pub suggestions: String,
    pub category_breakdown: BTreeMap<String, i64>,
}

fn sum_by(transactions: &[&Transaction], kind: TransactionType) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.amount)
        .sum()
}

fn percentage(part: Decimal, whole: Decimal) -> i64 {
    if whole.is_zero() {
        return 0;
    }
    (part / whole * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Income and expenses per calendar month, oldest first.
pub fn monthly_totals(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();
    for t in transactions {
        let entry = months.entry((t.date.year(), t.date.month())).or_default();
        match t.kind {
            TransactionType::Income => entry.0 += t.amount,
            TransactionType::Expense => entry.1 += t.amount,
        }
    }

    months
        .into_iter()
        .map(|((year, month), (income, expenses))| {
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default();
            MonthlyTotal {
                month: format!("{:04}-{:02}", year, month),
                label,
                income,
                expenses,
                savings: income - expenses,
            }
        })
        .collect()
}

/// The last `n` months that have any activity.
pub fn recent_months(transactions: &[Transaction], n: usize) -> Vec<MonthlyTotal> {
    let mut all = monthly_totals(transactions);
    let skip = all.len().saturating_sub(n);
    all.drain(..skip);
    all
}

/// Expense totals per category with whole-number percentage shares, largest
/// first.
pub fn category_breakdown(transactions: &[Transaction]) -> Vec<CategoryShare> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.kind == TransactionType::Expense) {
        *totals.entry(t.category.as_str()).or_default() += t.amount;
    }
    let total: Decimal = totals.values().copied().sum();

    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            category: category.to_string(),
            amount,
            percentage: percentage(amount, total),
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));
    shares
}

pub fn dashboard_summary(transactions: &[Transaction], today: NaiveDate) -> DashboardSummary {
    let this_month: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.date.year() == today.year() && t.date.month() == today.month())
        .collect();

    let total_income = sum_by(&this_month, TransactionType::Income);
    let total_expenses = sum_by(&this_month, TransactionType::Expense);
    let balance = total_income - total_expenses;
    let savings_rate = if total_income.is_zero() {
        Decimal::ZERO
    } else {
        (balance / total_income * Decimal::ONE_HUNDRED).round_dp(2)
    };

    let mut recent = transactions.to_vec();
    recent.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));
    recent.truncate(RECENT_TRANSACTIONS);

    DashboardSummary {
        total_income,
        total_expenses,
        balance,
        savings_rate,
        transaction_count: this_month.len(),
        recent_transactions: recent,
        monthly: recent_months(transactions, DASHBOARD_MONTHS),
    }
}

/// Rule-based observations over all of a user's transactions.
pub fn insights(transactions: &[Transaction]) -> Insights {
    let all: Vec<&Transaction> = transactions.iter().collect();
    let total_income = sum_by(&all, TransactionType::Income);
    let total_expenses = sum_by(&all, TransactionType::Expense);
    let expense_count = all.iter().filter(|t| t.kind == TransactionType::Expense).count();
    let saving = total_income > total_expenses;

    let trends = format!(
        "Total expenses: ₹{:.2}. Total income: ₹{:.2}. {}",
        total_expenses.round_dp(2),
        total_income.round_dp(2),
        if saving { "You are saving money!" } else { "You are spending more than earning." }
    );
    let anomalies = if expense_count > ANOMALY_THRESHOLD {
        "High number of transactions this period."
    } else {
        "Normal transaction activity."
    };
    let suggestions = if saving {
        "Great job! Consider investing your surplus."
    } else {
        "Try to reduce expenses in your highest spending categories."
    };

    Insights {
        trends,
        anomalies: anomalies.to_string(),
        suggestions: suggestions.to_string(),
        category_breakdown: category_breakdown(transactions)
            .into_iter()
            .map(|share| (share.category, share.percentage))
            .collect(),
    }
}
