//! Hosted generative-model analysis of receipts and transactions.

pub mod gemini;

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::receipts::{parse_model_reply, ReceiptAnalysis, ReceiptFormat};

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
}

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Sends the prompt parts and returns the model's text reply.
    async fn generate(&self, parts: Vec<Part>) -> Result<String, AiError>;
}

const CATEGORY_GUIDE: &str = "\
   - Food: Restaurants, cafes, grocery stores, food delivery, bars, bakeries, street food, tiffin services
   - Transport: Petrol pumps, parking, metro, bus, auto-rickshaw, taxi, Ola/Uber, train tickets
   - Entertainment: Movies, games, sports events, streaming services, concerts, books, recreation
   - Shopping: Clothing, electronics, general retail, online shopping, department stores, markets
   - Bills: Electricity, phone, internet, DTH, insurance, subscriptions, rent, maintenance
   - Healthcare: Pharmacy, doctor visits, medical services, health insurance, dental, lab tests
   - Education: Schools, courses, books, training, educational materials, tuition, coaching
   - Other: Anything that doesn't fit the above categories";

pub fn receipt_prompt(today: NaiveDate) -> String {
    format!(
        r#"Analyze this receipt and extract the following information in JSON format:
{{
  "merchant": "name of the store/restaurant",
  "amount": total amount as a number (in Indian Rupees if currency conversion needed),
  "date": "transaction date in YYYY-MM-DD format (extract from receipt date/time stamp)",
  "category": "expense category from this list: Food, Transport, Entertainment, Shopping, Bills, Healthcare, Education, Other",
  "extractedText": "full text content from the receipt",
  "items": ["list of items purchased if visible"]
}}

1. DATE: look for date/time stamps such as 08/31/2025, 31-Aug-2025 or Aug 31 2025.
   Extract the actual transaction date, not today's date.
2. CATEGORY: map the merchant and items to exactly one of:
{guide}
3. AMOUNT: the final total paid after tax, not a subtotal.

If anything is unclear use "Unknown" for merchant, 0 for amount, {today} for date and "Other" for category."#,
        guide = CATEGORY_GUIDE,
        today = today.format("%Y-%m-%d"),
    )
}

/// Sends the receipt file to the model and normalizes its reply.
pub async fn analyze_receipt(
    model: &dyn GenerativeModel,
    format: ReceiptFormat,
    data: Vec<u8>,
    today: NaiveDate,
) -> Result<ReceiptAnalysis, AiError> {
    let parts = vec![
        Part::Text(receipt_prompt(today)),
        Part::InlineData { mime_type: format.mime_type().to_string(), data },
    ];
    let reply = model.generate(parts).await?;
    Ok(parse_model_reply(&reply, today))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReceipt {
    pub merchant: String,
    pub date: Value,
    pub items: Value,
    pub total: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAnalysis {
    pub suggested_category: String,
    pub trends: Vec<String>,
    pub anomalies: Vec<String>,
    pub suggested_filters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_receipt: Option<ParsedReceipt>,
}

const UNCATEGORIZED: &str = "Uncategorized";

struct ReplyPatterns {
    category: Regex,
    trend: Regex,
    anomaly: Regex,
    filter: Regex,
}

fn reply_patterns() -> &'static ReplyPatterns {
    static PATTERNS: OnceLock<ReplyPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static reply pattern");
        ReplyPatterns {
            category: re(r"(?i)category:?\s*([^\n.]+)"),
            trend: re(r"(?i)trends?:?\s*([^\n]+)"),
            anomaly: re(r"(?i)anomal(?:y|ies):?\s*([^\n]+)"),
            filter: re(r"(?i)filters?:?\s*([^\n]+)"),
        }
    })
}

fn collect_lines(pattern: &Regex, reply: &str) -> Vec<String> {
    pattern
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pulls the labelled sections out of a free-form model reply.
pub fn parse_transaction_reply(reply: &str, transaction: &Value) -> TransactionAnalysis {
    let p = reply_patterns();
    let suggested_category = p
        .category
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string());

    let parsed_receipt = transaction.get("items").filter(|items| !items.is_null()).map(|items| {
        ParsedReceipt {
            merchant: transaction
                .get("merchant")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string(),
            date: transaction.get("date").cloned().unwrap_or(Value::Null),
            items: items.clone(),
            total: transaction.get("amount").cloned().unwrap_or(Value::Null),
        }
    });

    TransactionAnalysis {
        suggested_category,
        trends: collect_lines(&p.trend, reply),
        anomalies: collect_lines(&p.anomaly, reply),
        suggested_filters: collect_lines(&p.filter, reply),
        parsed_receipt,
    }
}

pub async fn analyze_transaction(
    model: &dyn GenerativeModel,
    transaction: &Value,
) -> Result<TransactionAnalysis, AiError> {
    let details = serde_json::to_string_pretty(transaction).unwrap_or_else(|_| transaction.to_string());
    let prompt = format!(
        "Analyze this transaction and provide:\n\
         1. Suggested category\n\
         2. Any notable trends\n\
         3. Potential anomalies\n\
         4. Relevant filters\n\n\
         Transaction details:\n{}",
        details
    );
    let reply = model.generate(vec![Part::Text(prompt)]).await?;
    Ok(parse_transaction_reply(&reply, transaction))
}
