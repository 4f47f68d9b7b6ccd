//! Date normalisation for `FormatDate`.

use super::shape_of;
use crate::error::RuleError;
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_english::Dialect;
use std::fmt::Write;

/// Day-first layouts tried in order before the natural-language fallback.
const LAYOUTS: &[&str] = &[
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%d.%m.%y",
    "%d/%m/%y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%Y%m%d",
];

/// Read a date written in any of the common document layouts.
pub(crate) fn parse_date(raw: &str, reference: NaiveDateTime) -> Result<NaiveDate, RuleError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(RuleError::InvalidDate(raw.to_string()));
    }

    // DD-MM-YY, always this century
    if shape_of(value) == "DD-DD-DD" {
        let mut parts = value.split('-').filter_map(|p| p.parse::<u32>().ok());
        if let (Some(day), Some(month), Some(year)) = (parts.next(), parts.next(), parts.next()) {
            if let Some(date) = NaiveDate::from_ymd_opt(2000 + year as i32, month, day) {
                return Ok(date);
            }
        }
    }

    let first_token = value.split_whitespace().next().unwrap_or(value);
    for candidate in [value, first_token] {
        if let Some(date) = LAYOUTS.iter().find_map(|layout| NaiveDate::parse_from_str(candidate, layout).ok()) {
            return Ok(date);
        }
    }

    let now = Utc.from_utc_datetime(&reference);
    chrono_english::parse_date_string(value, now, Dialect::Uk)
        .map(|dt| dt.date_naive())
        .map_err(|_| RuleError::InvalidDate(raw.to_string()))
}

/// Render `date` with a strftime layout, rejecting layouts chrono cannot render.
pub(crate) fn render_date(date: NaiveDate, layout: &str) -> Result<String, RuleError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(RuleError::InvalidDate(layout.to_string()));
    }
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(items.into_iter())).map_err(|_| RuleError::InvalidDate(layout.to_string()))?;
    Ok(out)
}

pub(crate) fn format_date(raw: &str, layout: &str, reference: NaiveDateTime) -> Result<String, RuleError> {
    render_date(parse_date(raw, reference)?, layout)
}
