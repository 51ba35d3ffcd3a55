use chrono::NaiveDate;

/// This is the standard way of converting a date to a store key in tasktrack.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a duration in seconds as `H:MM:SS`.
pub fn format_hms(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h}:{m:02}:{s:02}")
}

/// Formats a duration in seconds as decimal hours with two digits.
pub fn format_hours(seconds: u64) -> String {
    format!("{:.2}", seconds as f64 / 3600.0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_key, format_hms, format_hours};

    #[test]
    fn test_date_key_is_iso() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 18).unwrap();
        assert_eq!(date_key(date), "2025-08-18");
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(59), "0:00:59");
        assert_eq!(format_hms(3600), "1:00:00");
        assert_eq!(format_hms(3661), "1:01:01");
        assert_eq!(format_hms(36_000 + 540 + 9), "10:09:09");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(0), "0.00");
        assert_eq!(format_hours(1800), "0.50");
        assert_eq!(format_hours(7200), "2.00");
        assert_eq!(format_hours(5400), "1.50");
    }
}
