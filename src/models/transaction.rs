use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::AppError;

/// Largest amount a `NUMERIC(14, 2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => f.write_str("income"),
            Self::Expense => f.write_str("expense"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/transactions`.
#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "flexible_date::deserialize_option")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A validated transaction ready to be stored for some owner.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionType,
    pub category: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
}

impl CreateTransaction {
    /// Validates the payload, defaulting a missing date to `today`.
    pub fn validate(self, today: NaiveDate) -> Result<NewTransaction, AppError> {
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::BadRequest("Category is required".to_string()));
        }
        let amount = check_amount(self.amount)?;

        Ok(NewTransaction {
            kind: self.kind,
            category,
            amount,
            date: self.date.unwrap_or(today),
            description: clean_description(self.description),
        })
    }
}

/// Body of `PUT /api/transactions/:id`. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTransaction {
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_date::deserialize_option")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UpdateTransaction {
    pub fn validate(mut self) -> Result<Self, AppError> {
        if let Some(category) = self.category.as_mut() {
            *category = category.trim().to_string();
            if category.is_empty() {
                return Err(AppError::BadRequest("Category is required".to_string()));
            }
        }
        if let Some(amount) = self.amount {
            self.amount = Some(check_amount(amount)?);
        }
        // A blank description clears the stored one.
        if let Some(description) = self.description.as_mut() {
            *description = description.trim().to_string();
        }
        Ok(self)
    }

    /// Copies every supplied field onto `transaction`.
    pub fn apply_to(&self, transaction: &mut Transaction) {
        if let Some(kind) = self.kind {
            transaction.kind = kind;
        }
        if let Some(category) = &self.category {
            transaction.category = category.clone();
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(description) = &self.description {
            transaction.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
    }
}

/// Rounds to cents and keeps the result inside `(0, MAX_AMOUNT]`.
fn check_amount(amount: Decimal) -> Result<Decimal, AppError> {
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if cents <= Decimal::ZERO {
        return Err(AppError::BadRequest("Amount must be greater than 0".to_string()));
    }
    if cents > MAX_AMOUNT {
        return Err(AppError::BadRequest(format!("Amount must not exceed {}", MAX_AMOUNT)));
    }
    Ok(cents)
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Dates arrive either as `YYYY-MM-DD` or as full RFC 3339 timestamps from
/// browser clients; only the calendar date is kept.
pub mod flexible_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(value: &str) -> Option<NaiveDate> {
        let trimmed = value.trim();
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|d| d.date_naive()))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse(&value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date `{}`, expected YYYY-MM-DD", value))),
        }
    }
}
