//! Date/time node: operations over a per-item date field.
//!
//! Uses a lightweight token formatter (`YYYY`, `MM`, `DD`, `HH`, `mm`,
//! `ss`) over civil datetimes. No locale or timezone handling beyond what
//! the parsers accept; differences are computed on epoch milliseconds with
//! fixed-length months (30 days) and years (365 days).

use jiff::civil;
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};
use crate::item::ExecutionItem;

/// Calendar unit for arithmetic and differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateUnit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

/// Date part for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// The date/time operation to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DateTimeOp {
    /// Write the current timestamp.
    Now,
    /// Format the date field with a token pattern.
    Format {
        /// Pattern built from YYYY/MM/DD/HH/mm/ss tokens.
        format: String,
    },
    /// Add an amount of a unit to the date field.
    Add {
        /// Unit to add.
        unit: DateUnit,
        /// Amount of the unit.
        amount: i64,
    },
    /// Subtract an amount of a unit from the date field.
    Subtract {
        /// Unit to subtract.
        unit: DateUnit,
        /// Amount of the unit.
        amount: i64,
    },
    /// Difference between the date field and another date field.
    Difference {
        /// Dot path of the other date field.
        other_field: String,
        /// Unit of the reported difference.
        unit: DateUnit,
    },
    /// Extract one part of the date field.
    Extract {
        /// Part to extract.
        part: DatePart,
    },
}

/// Configuration for a date/time node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeConfig {
    /// Dot path of the date field read per item.
    #[serde(default)]
    pub field: String,
    /// Operation to perform.
    #[serde(flatten)]
    pub op: DateTimeOp,
    /// Field the result is written to; defaults per operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_field: Option<String>,
}

impl DateTimeConfig {
    /// Applies the operation to each item.
    pub fn apply(&self, items: &[ExecutionItem]) -> WorkflowResult<Vec<ExecutionItem>> {
        items.iter().map(|item| self.apply_one(item)).collect()
    }

    fn apply_one(&self, item: &ExecutionItem) -> WorkflowResult<ExecutionItem> {
        let mut out = item.clone();
        let output_field = self.output_field.clone().unwrap_or_else(|| match &self.op {
            DateTimeOp::Now => "now".into(),
            DateTimeOp::Difference { .. } => "difference".into(),
            _ => self.field.clone(),
        });

        let value = match &self.op {
            DateTimeOp::Now => Value::from(jiff::Timestamp::now().to_string()),
            DateTimeOp::Format { format } => {
                let datetime = self.read_datetime(item, &self.field)?;
                Value::from(format_tokens(&datetime, format))
            }
            DateTimeOp::Add { unit, amount } => {
                let datetime = self.read_datetime(item, &self.field)?;
                Value::from(shift(datetime, *unit, *amount)?.to_string())
            }
            DateTimeOp::Subtract { unit, amount } => {
                let datetime = self.read_datetime(item, &self.field)?;
                Value::from(shift(datetime, *unit, -amount)?.to_string())
            }
            DateTimeOp::Difference { other_field, unit } => {
                let left = self.read_datetime(item, &self.field)?;
                let right = self.read_datetime(item, other_field)?;
                Value::from(difference_in(left, right, *unit)?)
            }
            DateTimeOp::Extract { part } => {
                let datetime = self.read_datetime(item, &self.field)?;
                Value::from(match part {
                    DatePart::Year => i64::from(datetime.year()),
                    DatePart::Month => i64::from(datetime.month()),
                    DatePart::Day => i64::from(datetime.day()),
                    DatePart::Hour => i64::from(datetime.hour()),
                    DatePart::Minute => i64::from(datetime.minute()),
                    DatePart::Second => i64::from(datetime.second()),
                })
            }
        };

        out.set_path(&output_field, value);
        Ok(out)
    }

    fn read_datetime(&self, item: &ExecutionItem, field: &str) -> WorkflowResult<civil::DateTime> {
        let value = item.get_path(field).cloned().unwrap_or(Value::Null);
        parse_datetime(&value).ok_or_else(|| {
            WorkflowError::InvalidDefinition(format!("field '{field}' is not a valid date"))
        })
    }
}

/// Parses a civil datetime from an epoch-milliseconds number or a
/// datetime/date/timestamp string.
fn parse_datetime(value: &Value) -> Option<civil::DateTime> {
    match value {
        Value::Number(number) => {
            let millis = number.as_i64()?;
            let timestamp = jiff::Timestamp::from_millisecond(millis).ok()?;
            Some(timestamp.to_zoned(TimeZone::UTC).datetime())
        }
        Value::String(text) => {
            let text = text.trim();
            if let Ok(datetime) = text.parse::<civil::DateTime>() {
                return Some(datetime);
            }
            if let Ok(date) = text.parse::<civil::Date>() {
                return Some(date.at(0, 0, 0, 0));
            }
            text.parse::<jiff::Timestamp>()
                .ok()
                .map(|timestamp| timestamp.to_zoned(TimeZone::UTC).datetime())
        }
        _ => None,
    }
}

fn shift(datetime: civil::DateTime, unit: DateUnit, amount: i64) -> WorkflowResult<civil::DateTime> {
    let span = match unit {
        DateUnit::Years => jiff::Span::new().try_years(amount),
        DateUnit::Months => jiff::Span::new().try_months(amount),
        DateUnit::Weeks => jiff::Span::new().try_weeks(amount),
        DateUnit::Days => jiff::Span::new().try_days(amount),
        DateUnit::Hours => jiff::Span::new().try_hours(amount),
        DateUnit::Minutes => jiff::Span::new().try_minutes(amount),
        DateUnit::Seconds => jiff::Span::new().try_seconds(amount),
    }
    .map_err(|e| WorkflowError::InvalidDefinition(format!("invalid date amount: {e}")))?;

    datetime
        .checked_add(span)
        .map_err(|e| WorkflowError::InvalidDefinition(format!("date arithmetic overflow: {e}")))
}

/// Whole-unit difference `right - left`, truncated toward zero.
fn difference_in(
    left: civil::DateTime,
    right: civil::DateTime,
    unit: DateUnit,
) -> WorkflowResult<i64> {
    let to_millis = |datetime: civil::DateTime| {
        datetime
            .to_zoned(TimeZone::UTC)
            .map(|zoned| zoned.timestamp().as_millisecond())
            .map_err(|e| WorkflowError::InvalidDefinition(format!("date out of range: {e}")))
    };
    let delta = to_millis(right)? - to_millis(left)?;

    let divisor: i64 = match unit {
        DateUnit::Seconds => 1_000,
        DateUnit::Minutes => 60 * 1_000,
        DateUnit::Hours => 3_600 * 1_000,
        DateUnit::Days => 86_400 * 1_000,
        DateUnit::Weeks => 7 * 86_400 * 1_000,
        DateUnit::Months => 30 * 86_400 * 1_000,
        DateUnit::Years => 365 * 86_400 * 1_000,
    };
    Ok(delta / divisor)
}

/// Renders a datetime through the YYYY/MM/DD/HH/mm/ss token pattern.
fn format_tokens(datetime: &civil::DateTime, pattern: &str) -> String {
    const TOKENS: &[(&str, fn(&civil::DateTime) -> String)] = &[
        ("YYYY", |dt| format!("{:04}", dt.year())),
        ("MM", |dt| format!("{:02}", dt.month())),
        ("DD", |dt| format!("{:02}", dt.day())),
        ("HH", |dt| format!("{:02}", dt.hour())),
        ("mm", |dt| format!("{:02}", dt.minute())),
        ("ss", |dt| format!("{:02}", dt.second())),
    ];

    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    'outer: while !rest.is_empty() {
        for (token, render) in TOKENS {
            if let Some(remaining) = rest.strip_prefix(token) {
                out.push_str(&render(datetime));
                rest = remaining;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}
