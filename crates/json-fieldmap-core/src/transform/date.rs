//! Date transformations. All instants are handled in UTC.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::{DateAddConfig, DateFormatConfig, DateUnit};
use crate::error::MappingError;

/// Naive date-time layouts tried when no input format matches.
const NAIVE_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const NAIVE_DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

fn unparseable(transform: &str, value: &Value) -> MappingError {
    MappingError::TransformFailed {
        transform_type: transform.to_string(),
        message: format!("cannot parse {} as a date", value),
    }
}

/// chrono layout for a named date format.
fn named_layout(format: &str) -> Option<&'static str> {
    match format {
        "YYYY-MM-DD" => Some("%Y-%m-%d"),
        "MM/DD/YYYY" => Some("%m/%d/%Y"),
        "DD/MM/YYYY" => Some("%d/%m/%Y"),
        "MMM DD, YYYY" => Some("%b %d, %Y"),
        _ => None,
    }
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// Parse a date from a string or epoch-milliseconds number.
///
/// `input_format` may name one of the table formats, `timestamp` (epoch
/// milliseconds) or `unix` (epoch seconds); anything else, or a failed named
/// parse, falls back to trying every known layout.
pub fn parse_date(value: &Value, input_format: Option<&str>) -> Option<DateTime<Utc>> {
    let text = match value {
        Value::Number(n) => {
            let n = n.as_f64()?;
            return match input_format {
                Some("unix") => from_epoch_millis(n * 1000.0),
                _ => from_epoch_millis(n),
            };
        }
        Value::String(s) => s.trim(),
        _ => return None,
    };

    match input_format {
        Some("timestamp") => {
            if let Ok(ms) = text.parse::<f64>() {
                return from_epoch_millis(ms);
            }
        }
        Some("unix") => {
            if let Ok(secs) = text.parse::<f64>() {
                return from_epoch_millis(secs * 1000.0);
            }
        }
        Some(named) => {
            if let Some(layout) = named_layout(named) {
                if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
                    return midnight(date);
                }
            }
        }
        None => {}
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in NAIVE_DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    for layout in NAIVE_DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return midnight(date);
        }
    }
    if let Ok(ms) = text.parse::<f64>() {
        return from_epoch_millis(ms);
    }
    None
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render `dt` in one of the named output formats. Unknown names fall back to
/// a `M/D/YYYY` locale-style date.
pub fn format_date(dt: &DateTime<Utc>, output_format: &str) -> String {
    if let Some(layout) = named_layout(output_format) {
        return dt.format(layout).to_string();
    }
    match output_format {
        "ISO" => to_iso(dt),
        "LOCAL" => dt.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        "TIME" => dt.format("%-I:%M:%S %p").to_string(),
        _ => dt.format("%-m/%-d/%Y").to_string(),
    }
}

pub fn date_format(value: &Value, config: &DateFormatConfig) -> Result<Value, MappingError> {
    let input_format = config
        .input_format
        .as_deref()
        .filter(|f| !f.is_empty() && *f != "auto");
    let dt = parse_date(value, input_format).ok_or_else(|| unparseable("date_format", value))?;
    Ok(Value::String(format_date(&dt, &config.output_format)))
}

pub fn date_add(value: &Value, config: &DateAddConfig) -> Result<Value, MappingError> {
    let dt = parse_date(value, None).ok_or_else(|| unparseable("date_add", value))?;
    let amount = config.amount;

    let shifted = match config.unit {
        DateUnit::Days => Duration::try_days(amount).and_then(|d| dt.checked_add_signed(d)),
        DateUnit::Hours => Duration::try_hours(amount).and_then(|d| dt.checked_add_signed(d)),
        DateUnit::Minutes => Duration::try_minutes(amount).and_then(|d| dt.checked_add_signed(d)),
        DateUnit::Months => add_months(dt, amount),
        DateUnit::Years => amount.checked_mul(12).and_then(|m| add_months(dt, m)),
    };

    shifted
        .map(|d| Value::String(to_iso(&d)))
        .ok_or_else(|| MappingError::TransformFailed {
            transform_type: "date_add".to_string(),
            message: format!("adding {} {:?} overflows the calendar", amount, config.unit),
        })
}

fn add_months(dt: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        dt.checked_add_months(Months::new(magnitude))
    } else {
        dt.checked_sub_months(Months::new(magnitude))
    }
}
