
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};


/// This is the standard way of converting a date to a string in timebuddy.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns the first moment of `date`.
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Returns the last representable microsecond of `date`, 23:59:59.999999.
pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    day_start(date) + Duration::days(1) - Duration::microseconds(1)
}

/// Returns start of the hour `moment` falls into.
pub fn hour_start(moment: NaiveDateTime) -> NaiveDateTime {
    moment
        .date()
        .and_time(NaiveTime::from_hms_opt(moment.hour(), 0, 0).expect("Hour is always valid"))
}

/// Duration as fractional hours.
pub fn as_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.
}

/// Human readable duration, for example `1h5m3s`.
pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveTime};

    use super::{day_end, format_duration, hour_start};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    #[test]
    fn day_end_is_last_microsecond() {
        assert_eq!(
            day_end(TEST_DATE).time(),
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap()
        );
        assert_eq!(day_end(TEST_DATE).date(), TEST_DATE);
    }

    #[test]
    fn hour_start_truncates() {
        let moment = TEST_DATE.and_hms_milli_opt(13, 45, 12, 500).unwrap();
        assert_eq!(hour_start(moment), TEST_DATE.and_hms_opt(13, 0, 0).unwrap());
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(35 * 60)), "35m0s");
        assert_eq!(format_duration(Duration::seconds(3600 + 5 * 60 + 3)), "1h5m3s");
    }
}
