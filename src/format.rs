/// Magnitude suffixes, largest first. Lakh and crore follow the Indian numbering
/// the dashboards are read in.
const SCALES: [(f64, &str); 4] = [
    (1_000_000_000.0, "B"),
    (10_000_000.0, "Cr"),
    (100_000.0, "L"),
    (1_000.0, "K"),
];

pub fn format_amount(value: f64) -> String {
    format_amount_with(value, 2)
}

/// Compact form of `value`, e.g. `1.25K`, `3.40L`, `12.00Cr`.
pub fn format_amount_with(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let magnitude = value.abs();
    for (divisor, suffix) in SCALES {
        if magnitude >= divisor {
            return format!("{:.*}{}", decimals, value / divisor, suffix);
        }
    }

    format!("{:.*}", decimals, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scales() {
        assert_eq!(format_amount(999.0), "999.00");
        assert_eq!(format_amount(1_250.0), "1.25K");
        assert_eq!(format_amount(150_000.0), "1.50L");
        assert_eq!(format_amount(25_000_000.0), "2.50Cr");
        assert_eq!(format_amount(3_000_000_000.0), "3.00B");
    }

    #[test]
    fn test_sign_and_decimals() {
        assert_eq!(format_amount(-1_250.0), "-1.25K");
        assert_eq!(format_amount_with(1_234_567.0, 1), "12.3L");
        assert_eq!(format_amount_with(42.0, 0), "42");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_amount(f64::NAN), "0");
        assert_eq!(format_amount(f64::INFINITY), "0");
    }
}
