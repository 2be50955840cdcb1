//! Number formatting helpers.
//!
//! All durations are `f64` seconds internally. Rounding and text
//! rendering only happen at the output boundary (tables, metadata).

/// English ordinal for a positive integer: `1st`, `2nd`, `3rd`, `4th`.
///
/// 11, 12 and 13 (and any number ending in them, e.g. 112) take `th`.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Two-decimal rendering used for metadata statistics fields.
pub fn format_stat(value: f64) -> String {
    format!("{value:.2}")
}

/// Human-readable duration, e.g. `12.345 s`.
pub fn format_seconds(value: f64) -> String {
    format!("{value:.3} s")
}

/// Render an optional table cell. `None` and NaN both become an empty cell.
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_regular() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(102), "102nd");
    }

    #[test]
    fn test_ordinal_teens() {
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(112), "112th");
        assert_eq!(ordinal(113), "113th");
    }

    #[test]
    fn test_round_to_four_places() {
        assert_eq!(round_to(11.2345 - 10.0, 4), 1.2345);
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(-0.00004, 4), -0.0);
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(Some(1.2345)), "1.2345");
        assert_eq!(format_cell(Some(10.0)), "10");
        assert_eq!(format_cell(None), "");
        assert_eq!(format_cell(Some(f64::NAN)), "");
    }

    #[test]
    fn test_format_stat_and_seconds() {
        assert_eq!(format_stat(3.14159), "3.14");
        assert_eq!(format_seconds(2.0), "2.000 s");
    }
}
