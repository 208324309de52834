// Parsing, statistics and display helpers.
//
// The loader funnels every raw CSV cell through the `*_safe` parsers so the
// rest of the crate only sees typed values or `None`.
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Trim a text cell; blank cells and the usual null spellings become `None`.
pub fn clean_text(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(s.to_string())
}

/// Parse a number while being forgiving about CSV formatting.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`nan`, `n/a`, ...).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`parse_f64_safe`] but also drops negative values, which are out of
/// domain for hours, head counts and task counts.
pub fn parse_non_negative(s: Option<&str>) -> Option<f64> {
    parse_f64_safe(s).filter(|v| *v >= 0.0)
}

/// Whole counts. Accepts `"3"` and `"3.0"` (pandas writes integer columns
/// with missing values as floats).
pub fn parse_count_safe(s: Option<&str>) -> Option<u32> {
    let v = parse_f64_safe(s)?;
    if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return None;
    }
    Some(v as u32)
}

/// Dates arrive as `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// `YYYY-MM` bucket for a date.
pub fn month_key(d: NaiveDate) -> String {
    format!("{:04}-{:02}", d.year(), d.month())
}

/// `YYYY-Www` bucket, week number counted from the first Sunday (`%U`).
pub fn week_key(d: NaiveDate) -> String {
    d.format("%Y-W%U").to_string()
}

/// Validate a `YYYY-MM` month label.
pub fn parse_month_key(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    let first = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()?;
    Some(month_key(first))
}

/// Arithmetic mean of the present values; `None` when nothing is present.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = values
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Sum of the present values. An all-missing input sums to zero.
pub fn sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().filter(|v| v.is_finite()).sum()
}

/// `numerator / denominator`, missing when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator)
}

/// Format a value with a fixed number of decimals and locale-aware
/// thousands separators (e.g. `1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    // "-0.00" reads as a sign error in a table
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

/// Thousands separators for counts in console messages (`9,855 rows`).
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub const MISSING: &str = "n/a";

// `#[tabled(display_with = ...)]` helpers. Tabled hands over a reference to
// the field, hence the `&` signatures.

pub fn display_hours(v: &f64) -> String {
    format_number(*v, 0)
}

pub fn display_opt_hours(v: &Option<f64>) -> String {
    v.map(|x| format_number(x, 0)).unwrap_or_else(|| MISSING.to_string())
}

pub fn display_one_decimal(v: &Option<f64>) -> String {
    v.map(|x| format_number(x, 1)).unwrap_or_else(|| MISSING.to_string())
}

pub fn display_two_decimals(v: &Option<f64>) -> String {
    v.map(|x| format_number(x, 2)).unwrap_or_else(|| MISSING.to_string())
}

/// Rates are stored as fractions and shown as percentages.
pub fn display_rate(v: &Option<f64>) -> String {
    v.map(|x| format!("{}%", format_number(x * 100.0, 1)))
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn display_signed_pct(v: &Option<f64>) -> String {
    match v {
        Some(x) if *x > 0.0 => format!("+{}%", format_number(*x, 1)),
        Some(x) => format!("{}%", format_number(*x, 1)),
        None => MISSING.to_string(),
    }
}

pub fn display_text(v: &Option<String>) -> String {
    v.clone().unwrap_or_else(|| MISSING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_parse_forgivingly() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("nan")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
        assert_eq!(parse_non_negative(Some("-2")), None);
        assert_eq!(parse_count_safe(Some("3.0")), Some(3));
        assert_eq!(parse_count_safe(Some("2.5")), None);
    }

    #[test]
    fn dates_accept_time_suffix() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(parse_date_safe(Some("2025-03-09")), Some(d));
        assert_eq!(parse_date_safe(Some("2025-03-09 00:00:00")), Some(d));
        assert_eq!(parse_date_safe(Some("09/03/2025")), None);
    }

    #[test]
    fn month_and_week_keys() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(month_key(d), "2025-03");
        // 2025-03-09 is a Sunday: tenth Sunday-start week of the year
        assert_eq!(week_key(d), "2025-W10");
        assert_eq!(parse_month_key(Some(" 2025-03 ")), Some("2025-03".to_string()));
        assert_eq!(parse_month_key(Some("March")), None);
    }

    #[test]
    fn mean_skips_missing_and_reports_empty() {
        assert_eq!(mean(vec![Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean(Vec::<Option<f64>>::new()), None);
        assert_eq!(mean(vec![None, None]), None);
        assert_eq!(sum(vec![Some(1.5), None, Some(2.5)]), 4.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_int(9855), "9,855");
        assert_eq!(display_rate(&Some(0.875)), "87.5%");
        assert_eq!(display_signed_pct(&Some(12.0)), "+12.0%");
        assert_eq!(display_two_decimals(&None), "n/a");
    }
}
