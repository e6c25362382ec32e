use crate::error::{Result, RollupError};
use chrono::{Datelike, Days, NaiveDate};

/// Divisor turning an annual figure into a monthly one.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Divisor turning an annual figure into a weekly one. Fixed, not calendar accurate.
pub const WEEKS_PER_YEAR: f64 = 52.0;

pub fn first_day_of_year(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| RollupError::DateError(format!("Year {} is out of range", year)))
}

pub fn last_day_of_year(year: i32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| RollupError::DateError(format!("Year {} is out of range", year)))
}

/// Moves `date` by a signed number of calendar months.
///
/// The day of month is kept as an offset from the first of the target month, so a day
/// that does not exist there spills into the following month:
/// - 2024-03-31 minus 1 month is 2024-03-02 (February 2024 has 29 days)
/// - 2024-02-29 minus 12 months is 2023-03-01
pub fn shift_months(date: NaiveDate, months: i32) -> Result<NaiveDate> {
    let out_of_range = || {
        RollupError::DateError(format!(
            "Cannot shift {} by {} months: result is out of range",
            date, months
        ))
    };

    let total = date
        .year()
        .checked_mul(12)
        .and_then(|t| t.checked_add(date.month0() as i32))
        .and_then(|t| t.checked_add(months))
        .ok_or_else(out_of_range)?;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_days(Days::new(u64::from(date.day0()))))
        .ok_or_else(out_of_range)
}

/// Year label used to key per-year buckets ("2024").
pub fn year_label(date: NaiveDate) -> String {
    date.year().to_string()
}

/// Every calendar year label from `start.year` to `end.year` inclusive.
///
/// A range that starts or ends mid-year still contributes the whole year.
pub fn years_covered(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    (start.year()..=end.year()).map(|y| y.to_string()).collect()
}

/// Length of a date range in years (365.25 day years), rounded to two decimals.
pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    let days = (end - start).num_days().abs() as f64;
    (days / 365.25 * 100.0).round() / 100.0
}

/// Parses a `M/D/YYYY` date as written by spreadsheet exports.
pub fn parse_us_date(raw: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();

    if parts.len() != 3 {
        return Err(RollupError::DateError(format!(
            "Invalid date format: '{}'. Expected M/D/YYYY",
            raw
        )));
    }

    let invalid = || RollupError::DateError(format!("Invalid date: '{}'", raw));

    let month: u32 = parts[0].trim().parse().map_err(|_| invalid())?;
    let day: u32 = parts[1].trim().parse().map_err(|_| invalid())?;
    let year: i32 = parts[2].trim().parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Converts a spreadsheet serial day number to a date.
///
/// Uses the spreadsheet convention where serial 61 is 1900-03-01, which makes every
/// date from March 1900 onward line up with what the spreadsheet displays.
pub fn date_from_serial(serial: f64) -> Result<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return Err(RollupError::DateError(format!(
            "Invalid serial date: {}",
            serial
        )));
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .ok_or_else(|| RollupError::DateError("Invalid serial epoch".to_string()))?;

    epoch
        .checked_add_days(Days::new(serial.floor() as u64))
        .ok_or_else(|| RollupError::DateError(format!("Serial date {} is out of range", serial)))
}

/// Parses a currency formatted amount such as `-$1,234.56`.
///
/// Dollar signs and thousands separators are stripped, then the longest numeric
/// prefix is read, so trailing text like `12.50 USD` still yields `12.5`. Returns
/// `None` when no finite number can be read.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let cleaned = cleaned.trim_start();

    let prefix = numeric_prefix(cleaned);
    if prefix.is_empty() {
        return None;
    }

    prefix.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut idx = 0;

    if idx < bytes.len() && (bytes[idx] == b'-' || bytes[idx] == b'+') {
        idx += 1;
    }

    let mut digits = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
        digits += 1;
        end = idx;
    }

    if idx < bytes.len() && bytes[idx] == b'.' {
        idx += 1;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
            digits += 1;
            end = idx;
        }
    }

    if digits == 0 {
        return "";
    }

    // Exponent only counts when followed by at least one digit
    if idx < bytes.len() && (bytes[idx] == b'e' || bytes[idx] == b'E') {
        let mut exp = idx + 1;
        if exp < bytes.len() && (bytes[exp] == b'-' || bytes[exp] == b'+') {
            exp += 1;
        }
        let exp_digits_start = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > exp_digits_start {
            end = exp;
        }
    }

    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_shift_months_out_of_range() {
        assert!(matches!(
            shift_months(date(2025, 3, 31), i32::MAX),
            Err(RollupError::DateError(_))
        ));
        assert!(matches!(
            shift_months(date(2025, 3, 31), -1_000_000_000),
            Err(RollupError::DateError(_))
        ));
    }

    #[test]
    fn test_shift_months_backwards() {
        assert_eq!(
            shift_months(date(2025, 3, 31), -12).unwrap(),
            date(2024, 3, 31)
        );
        assert_eq!(
            shift_months(date(2025, 1, 15), -60).unwrap(),
            date(2020, 1, 15)
        );
        assert_eq!(
            shift_months(date(2025, 2, 10), -3).unwrap(),
            date(2024, 11, 10)
        );
    }

    #[test]
    fn test_shift_months_spills_missing_days_forward() {
        // Feb 2024 has 29 days, so the 31st lands two days into March
        assert_eq!(
            shift_months(date(2024, 3, 31), -1).unwrap(),
            date(2024, 3, 2)
        );
        assert_eq!(
            shift_months(date(2024, 2, 29), -12).unwrap(),
            date(2023, 3, 1)
        );
    }

    #[test]
    fn test_years_covered_is_inclusive() {
        assert_eq!(
            years_covered(date(2022, 10, 1), date(2025, 3, 31)),
            vec!["2022", "2023", "2024", "2025"]
        );
        assert_eq!(years_covered(date(2024, 6, 1), date(2024, 6, 2)), vec!["2024"]);
        assert!(years_covered(date(2025, 1, 1), date(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_years_between() {
        assert_eq!(years_between(date(2024, 1, 1), date(2025, 1, 1)), 1.0);
        assert_eq!(years_between(date(2025, 1, 1), date(2024, 1, 1)), 1.0);
        assert_eq!(years_between(date(2024, 1, 1), date(2024, 7, 1)), 0.5);
        assert_eq!(years_between(date(2020, 3, 1), date(2023, 2, 28)), 3.0);
    }

    #[test]
    fn test_parse_us_date() {
        assert_eq!(parse_us_date("3/31/2025").unwrap(), date(2025, 3, 31));
        assert_eq!(parse_us_date(" 12/1/1999 ").unwrap(), date(1999, 12, 1));
        assert!(parse_us_date("2025-03-31").is_err());
        assert!(parse_us_date("2/30/2024").is_err());
        assert!(parse_us_date("").is_err());
    }

    #[test]
    fn test_date_from_serial() {
        assert_eq!(date_from_serial(61.0).unwrap(), date(1900, 3, 1));
        assert_eq!(date_from_serial(367.75).unwrap(), date(1901, 1, 1));
        assert_eq!(date_from_serial(45747.0).unwrap(), date(2025, 3, 31));
        assert!(date_from_serial(0.0).is_err());
        assert!(date_from_serial(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("-$50.00"), Some(-50.0));
        assert_eq!(parse_amount("  42 "), Some(42.0));
        assert_eq!(parse_amount("12.50 USD"), Some(12.5));
        assert_eq!(parse_amount("1e3"), Some(1000.0));
        assert_eq!(parse_amount("2e"), Some(2.0));
        assert_eq!(parse_amount(".5"), Some(0.5));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount(""), None);
    }
}
