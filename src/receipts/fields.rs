//! Heuristics that turn raw receipt text, or a model's reply, into the
//! fields of a [`ReceiptAnalysis`].

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use super::category::{classify_category, ExpenseCategory};
use super::ReceiptAnalysis;

pub const UNKNOWN_MERCHANT: &str = "Unknown";

const MODEL_CONFIDENCE: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.5;
const MAX_MERCHANT_LEN: usize = 60;

struct Patterns {
    iso_date: Regex,
    slash_date: Regex,
    dash_date: Regex,
    day_month_name: Regex,
    month_name_day: Regex,
    number: Regex,
    money: Regex,
    json_block: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static receipt pattern");
        Patterns {
            iso_date: re(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"),
            slash_date: re(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b"),
            dash_date: re(r"\b(\d{1,2})[-.](\d{1,2})[-.](\d{4})\b"),
            day_month_name: re(r"(?i)\b(\d{1,2})[\s-]+([a-z]{3,9})\.?[\s,-]+(\d{4})\b"),
            month_name_day: re(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"),
            number: re(r"(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d+))?"),
            money: re(r"(?i)(?:₹|\$|€|£|rs\.?|inr)?\s*(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\b"),
            json_block: re(r"(?s)\{.*\}"),
        }
    })
}

fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_lowercase();
    let prefix = lower.get(..3)?;
    MONTHS.iter().position(|m| *m == prefix).map(|i| i as u32 + 1)
}

fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn num(caps: &regex::Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

fn read_iso(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let year = caps.get(1)?.as_str().parse().ok()?;
    ymd(year, num(caps, 2)?, num(caps, 3)?)
}

fn read_slash(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let (first, second) = (num(caps, 1)?, num(caps, 2)?);
    let year = expand_year(caps.get(3)?.as_str())?;
    ymd(year, first, second).or_else(|| ymd(year, second, first))
}

fn read_dash(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let (first, second) = (num(caps, 1)?, num(caps, 2)?);
    let year = caps.get(3)?.as_str().parse().ok()?;
    ymd(year, second, first).or_else(|| ymd(year, first, second))
}

fn read_day_month_name(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let month = month_from_name(caps.get(2)?.as_str())?;
    ymd(caps.get(3)?.as_str().parse().ok()?, month, num(caps, 1)?)
}

fn read_month_name_day(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let month = month_from_name(caps.get(1)?.as_str())?;
    ymd(caps.get(3)?.as_str().parse().ok()?, month, num(caps, 2)?)
}

/// Offset and value of the first match of `re` that reads as a real date.
fn first_valid(
    re: &Regex,
    text: &str,
    read: fn(&regex::Captures<'_>) -> Option<NaiveDate>,
) -> Option<(usize, NaiveDate)> {
    re.captures_iter(text)
        .find_map(|caps| Some((caps.get(0)?.start(), read(&caps)?)))
}

/// Finds the first recognisable date in `text`, by position.
///
/// Slash dates are read month first (`08/31/2025`) unless the first part
/// cannot be a month; dash and dot dates are read day first.
pub fn normalize_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.date_naive());
    }

    let p = patterns();
    [
        first_valid(&p.iso_date, trimmed, read_iso),
        first_valid(&p.slash_date, trimmed, read_slash),
        first_valid(&p.dash_date, trimmed, read_dash),
        first_valid(&p.day_month_name, trimmed, read_day_month_name),
        first_valid(&p.month_name_day, trimmed, read_month_name_day),
    ]
    .into_iter()
    .flatten()
    .min_by_key(|(start, _)| *start)
    .map(|(_, date)| date)
}

fn decimal_from_capture(caps: &regex::Captures<'_>) -> Option<Decimal> {
    let whole = caps.get(1)?.as_str().replace(',', "");
    let value = match caps.get(2) {
        Some(fraction) => format!("{}.{}", whole, fraction.as_str()),
        None => whole,
    };
    Decimal::from_str(&value).ok()
}

/// Parses the first number in `text`, ignoring currency markers and
/// thousands separators.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let caps = patterns().number.captures(text)?;
    decimal_from_capture(&caps)
}

fn is_total_line(lower: &str) -> bool {
    if lower.contains("subtotal") || lower.contains("sub total") || lower.contains("sub-total") {
        return false;
    }
    ["total", "amount due", "balance due", "net amount", "amount paid"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// The largest value on the last "total" line, or failing that the largest
/// currency-looking value anywhere in the text.
pub fn find_total(text: &str) -> Option<Decimal> {
    let p = patterns();
    let from_total_line = text
        .lines()
        .filter(|line| is_total_line(&line.to_lowercase()))
        .filter_map(|line| {
            p.number
                .captures_iter(line)
                .filter_map(|caps| decimal_from_capture(&caps))
                .max()
        })
        .last();
    if from_total_line.is_some() {
        return from_total_line;
    }

    p.money
        .captures_iter(text)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str().replace(',', "");
            Decimal::from_str(&raw).ok()
        })
        .max()
}

/// First line that reads like a name: mostly letters and not a date.
pub fn find_merchant(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| {
            let letters = line.chars().filter(|c| c.is_alphabetic()).count();
            let visible = line.chars().filter(|c| !c.is_whitespace()).count();
            letters >= 3 && letters * 2 > visible && normalize_date(line).is_none()
        })
        .map(|line| line.chars().take(MAX_MERCHANT_LEN).collect::<String>().trim().to_string())
}

/// Builds an analysis from locally extracted text. `engine_confidence` is
/// the extractor's own confidence in `[0, 1]`; it is scaled down for every
/// field the heuristics could not find.
pub fn analysis_from_text(text: &str, engine_confidence: f64, today: NaiveDate) -> ReceiptAnalysis {
    let merchant = find_merchant(text);
    let amount = find_total(text);
    let date = normalize_date(text);

    let found = [merchant.is_some(), amount.is_some(), date.is_some()]
        .iter()
        .filter(|f| **f)
        .count();
    let confidence = engine_confidence.clamp(0.0, 1.0) * (0.5 + 0.5 * found as f64 / 3.0);

    ReceiptAnalysis {
        extracted_text: text.trim().to_string(),
        merchant: merchant.unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
        amount: amount.unwrap_or(Decimal::ZERO),
        date: date.unwrap_or(today),
        suggested_category: classify_category(text),
        confidence: round_confidence(confidence),
        success: true,
    }
}

fn round_confidence(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Interprets a generative model's reply to the receipt prompt. The reply is
/// expected to carry a JSON object somewhere in it; when it does not, a
/// low-confidence result with default fields is returned instead of an error.
pub fn parse_model_reply(reply: &str, today: NaiveDate) -> ReceiptAnalysis {
    let parsed = patterns()
        .json_block
        .find(reply)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(Value::is_object);

    let Some(data) = parsed else {
        log::warn!("model reply held no JSON object, returning low-confidence defaults");
        return ReceiptAnalysis {
            extracted_text: reply.trim().to_string(),
            merchant: UNKNOWN_MERCHANT.to_string(),
            amount: Decimal::ZERO,
            date: today,
            suggested_category: ExpenseCategory::Other,
            confidence: FALLBACK_CONFIDENCE,
            success: true,
        };
    };

    let text_field = |name: &str| {
        data.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let amount = match data.get("amount") {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
        Some(Value::String(s)) => parse_amount(s),
        _ => None,
    }
    .map(|a| a.round_dp(2))
    .filter(|a| *a >= Decimal::ZERO)
    .unwrap_or(Decimal::ZERO);

    ReceiptAnalysis {
        extracted_text: text_field("extractedText").unwrap_or_else(|| reply.trim().to_string()),
        merchant: text_field("merchant").unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
        amount,
        date: text_field("date").and_then(|d| normalize_date(&d)).unwrap_or(today),
        suggested_category: text_field("category")
            .map(|c| classify_category(&c))
            .unwrap_or(ExpenseCategory::Other),
        confidence: MODEL_CONFIDENCE,
        success: true,
    }
}
