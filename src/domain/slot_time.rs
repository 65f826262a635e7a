//! Boundary normalization of slot instants.
//!
//! All instants are stored and compared in UTC with whole-second
//! precision. Conversion happens once, at the request boundary, before
//! any transaction begins.

use chrono::{DateTime, FixedOffset, NaiveDate, SubsecRound, TimeZone, Utc};

use crate::error::CareError;

/// Converts a client-supplied instant to the storage representation.
#[must_use]
pub fn normalize(instant: DateTime<FixedOffset>) -> DateTime<Utc> {
    instant.with_timezone(&Utc).trunc_subsecs(0)
}

/// Parses an RFC 3339 / ISO-8601 instant with an explicit offset and
/// normalizes it.
///
/// # Errors
///
/// Returns [`CareError::InvalidRequest`] if the text is not a valid
/// offset-qualified instant.
pub fn parse(text: &str) -> Result<DateTime<Utc>, CareError> {
    DateTime::parse_from_rfc3339(text)
        .map(normalize)
        .map_err(|e| CareError::InvalidRequest(format!("invalid instant {text:?}: {e}")))
}

/// Rejects instants strictly before `now`.
///
/// `now` is compared at the same whole-second precision as stored
/// instants, so a request later within the current second is accepted.
///
/// # Errors
///
/// Returns [`CareError::PastSlotRequested`] if `at` is before the second
/// containing `now`.
pub fn ensure_not_past(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), CareError> {
    if at < now.trunc_subsecs(0) {
        return Err(CareError::PastSlotRequested);
    }
    Ok(())
}

/// Returns the half-open UTC range `[start, end)` covering `date`.
///
/// # Errors
///
/// Returns [`CareError::InvalidRequest`] if the day end overflows the
/// representable range.
pub fn day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), CareError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| CareError::InvalidRequest(format!("date out of range: {date}")))?;
    let start = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
    let end = Utc.from_utc_datetime(&next.and_time(chrono::NaiveTime::MIN));
    Ok((start, end))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    #[test]
    fn offset_instants_land_on_the_same_utc_second() {
        let Ok(a) = parse("2030-05-01T14:30:00+05:30") else {
            panic!("valid instant");
        };
        let Ok(b) = parse("2030-05-01T09:00:00Z") else {
            panic!("valid instant");
        };
        assert_eq!(a, b);
    }

    #[test]
    fn instant_later_in_the_current_second_is_not_past() {
        let Ok(requested) = DateTime::parse_from_rfc3339("2030-05-01T09:00:44.800Z") else {
            panic!("valid instant");
        };
        let Ok(now) = DateTime::parse_from_rfc3339("2030-05-01T09:00:44.300Z") else {
            panic!("valid instant");
        };
        let at = normalize(requested);
        assert!(ensure_not_past(at, now.with_timezone(&Utc)).is_ok());
        assert!(matches!(
            ensure_not_past(at, now.with_timezone(&Utc) + Duration::seconds(1)),
            Err(CareError::PastSlotRequested)
        ));
    }

    #[test]
    fn subseconds_are_dropped() {
        let Ok(at) = parse("2030-05-01T09:00:00.987Z") else {
            panic!("valid instant");
        };
        assert_eq!(at.nanosecond(), 0);
    }

    #[test]
    fn naive_text_is_rejected() {
        assert!(matches!(
            parse("2030-05-01T09:00:00"),
            Err(CareError::InvalidRequest(_))
        ));
    }

    #[test]
    fn past_check_is_strict() {
        let now = Utc::now();
        assert!(ensure_not_past(now, now).is_ok());
        assert!(matches!(
            ensure_not_past(now - Duration::seconds(1), now),
            Err(CareError::PastSlotRequested)
        ));
    }

    #[test]
    fn day_bounds_cover_one_day() {
        let Some(date) = NaiveDate::from_ymd_opt(2030, 5, 1) else {
            panic!("valid date");
        };
        let Ok((start, end)) = day_bounds(date) else {
            panic!("valid bounds");
        };
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(start.date_naive(), date);
    }
}
