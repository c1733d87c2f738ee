use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use regex::Regex;
use serde_json::Value;

/// Text formats checked against trimmed (or raw, for email) input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Email,
    UsPhone,
    ZipCode,
    Ein,
}

const EMAIL: &str = r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@(?:[A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$";
const US_PHONE: &str = r"^(?:\+1\s?)?(?:\()?[0-9]{3}(?:\)|[-.\s])?[0-9]{3}[-.\s]?[0-9]{4}$";
const ZIP_CODE: &str = r"^[0-9]{5}$";
const EIN: &str = r"^[0-9]{2}-[0-9]{7}$";

impl Pattern {
    pub fn matches(self, value: &str) -> bool {
        match self {
            Pattern::Email => {
                !value.starts_with('.')
                    && !value.contains("..")
                    && is_match(&EMAIL_RE, EMAIL, value)
            }
            Pattern::UsPhone => is_match(&US_PHONE_RE, US_PHONE, value),
            Pattern::ZipCode => is_match(&ZIP_CODE_RE, ZIP_CODE, value),
            Pattern::Ein => is_match(&EIN_RE, EIN, value),
        }
    }
}

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static US_PHONE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ZIP_CODE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static EIN_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn is_match(cell: &OnceLock<Option<Regex>>, source: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(source).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// `null` and whitespace-only strings count as "not provided".
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Numbers pass through; strings are trimmed and parsed. Non-finite results are rejected.
pub(crate) fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|number| number.is_finite())
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or epoch milliseconds.
///
/// Timestamps are instants and resolve to their local calendar date, the same calendar
/// [`Calendar::Local`](super::Calendar::Local) reads "today" from. Only the date survives.
pub(crate) fn date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|timestamp| local_date(&timestamp))
            })
        }
        Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|timestamp| local_date(&timestamp)),
        _ => None,
    }
}

fn local_date<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}
