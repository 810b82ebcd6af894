//! Date helper functions

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::error::{SourceError, SourceResult};
use crate::i18n::Locale;

/// Format a date using a Moment.js-style format string with localized month names
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", Locale::PtBr) // -> "15 mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, locale: Locale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format_localized(&chrono_format, locale.chrono())
        .to_string()
}

/// Convert a Moment.js format to a chrono format
///
/// Tokens are matched longest first, so `MMMM` wins over `MMM`. Text in
/// `[brackets]` is copied literally.
fn moment_to_chrono_format(format: &str) -> String {
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        // Day of month
        ("DD", "%d"),
        ("D", "%-d"),
        // Time
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("A", "%p"),
    ];

    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            if let Some(end) = stripped.find(']') {
                result.push_str(&stripped[..end].replace('%', "%%"));
                rest = &stripped[end + 1..];
                continue;
            }
        }

        for (from, to) in replacements {
            if let Some(stripped) = rest.strip_prefix(from) {
                result.push_str(to);
                rest = stripped;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                result.push_str("%%");
            } else {
                result.push(c);
            }
        }
        rest = chars.as_str();
    }

    result
}

/// Parse an API timestamp
///
/// Accepts RFC 3339 (`2021-03-15T00:00:00Z`) and the offset form without a
/// colon that the content API emits (`2021-03-15T19:25:28+0000`).
pub fn parse_timestamp(value: &str) -> SourceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| SourceError::InvalidDate(value.to_string()))
}

/// Parse an optional timestamp: absent or empty is `None`, garbage is an error
pub fn parse_optional_timestamp(value: Option<&str>) -> SourceResult<Option<DateTime<Utc>>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_timestamp(v).map(Some),
    }
}

/// Format a publication date in the given zone; a missing date is `InvalidDate`
pub fn format_published<Tz: TimeZone>(
    date: Option<&DateTime<Utc>>,
    tz: &Tz,
    format: &str,
    locale: Locale,
) -> SourceResult<String>
where
    Tz::Offset: std::fmt::Display,
{
    let date = date.ok_or_else(|| SourceError::InvalidDate("not published".to_string()))?;
    Ok(format_date(&date.with_timezone(tz), format, locale))
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
