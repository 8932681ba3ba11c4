//! ISO-8601 timestamps as stored in revisions.
//!
//! Stored values use the shape `YYYY-MM-DDTHH:MM:SS`, followed by
//! `.ffffff` when the microseconds are non-zero and by `+HH:MM` when the
//! input carried an offset.

use crate::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Parses a user supplied due date and returns its stored form.
///
/// Accepts a bare date (midnight), a date with `HH:MM`, `HH:MM:SS` or
/// fractional seconds separated by `T` or a space, and RFC 3339 with offset.
pub fn normalize_due(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("due date is required"));
    }
    let candidate = trimmed.replacen(' ', "T", 1);

    if let Ok(parsed) = OffsetDateTime::parse(&candidate, &Rfc3339) {
        return Ok(format!(
            "{}{}",
            format_naive(PrimitiveDateTime::new(parsed.date(), parsed.time())),
            format_offset(parsed.offset())
        ));
    }

    let with_fraction =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let with_minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    for format in [with_fraction, with_seconds, with_minutes] {
        if let Ok(parsed) = PrimitiveDateTime::parse(&candidate, format) {
            return Ok(format_naive(parsed));
        }
    }

    if let Ok(date) = Date::parse(&candidate, format_description!("[year]-[month]-[day]")) {
        return Ok(format_naive(PrimitiveDateTime::new(date, Time::MIDNIGHT)));
    }

    Err(AppError::invalid_input(format!(
        "due date `{trimmed}` is not an ISO-8601 date or datetime"
    )))
}

/// Current local wall-clock time, used to stamp new revisions.
pub fn now_timestamp() -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let now = OffsetDateTime::now_utc().to_offset(offset);
    format_naive(PrimitiveDateTime::new(now.date(), now.time()))
}

fn format_naive(datetime: PrimitiveDateTime) -> String {
    let base = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        datetime.year(),
        u8::from(datetime.month()),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second()
    );
    match datetime.microsecond() {
        0 => base,
        micros => format!("{base}.{micros:06}"),
    }
}

fn format_offset(offset: UtcOffset) -> String {
    let (hours, minutes, _) = offset.as_hms();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!("{sign}{:02}:{:02}", hours.unsigned_abs(), minutes.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::{normalize_due, now_timestamp};

    #[test]
    fn bare_date_defaults_to_midnight() {
        assert_eq!(normalize_due("2024-01-01").unwrap(), "2024-01-01T00:00:00");
    }

    #[test]
    fn minutes_and_space_separator_are_accepted() {
        assert_eq!(
            normalize_due("2024-03-05 14:30").unwrap(),
            "2024-03-05T14:30:00"
        );
    }

    #[test]
    fn fractional_seconds_are_kept_as_micros() {
        assert_eq!(
            normalize_due("2024-03-05T14:30:15.250").unwrap(),
            "2024-03-05T14:30:15.250000"
        );
    }

    #[test]
    fn offset_is_preserved() {
        assert_eq!(
            normalize_due("2024-03-05T14:30:00Z").unwrap(),
            "2024-03-05T14:30:00+00:00"
        );
        assert_eq!(
            normalize_due("2024-03-05T14:30:00-05:30").unwrap(),
            "2024-03-05T14:30:00-05:30"
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = normalize_due("next tuesday").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn rejects_blank() {
        assert_eq!(normalize_due("  ").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn now_timestamp_reparses_as_due() {
        let now = now_timestamp();
        assert!(normalize_due(&now).is_ok());
        assert_eq!(&now[10..11], "T");
    }
}
