//! Human-readable numbers for report fragments.

/// Group digits in threes: `1234567` becomes `"1,234,567"`.
pub fn format_value(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Like [`format_value`], optionally scaled to thousands with a `" k"` suffix.
pub fn format_bytes(value: u64, in_thousands: bool) -> String {
    if in_thousands && value > 1000 {
        format!("{} k", format_value(value / 1000))
    } else {
        format_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_groups() {
        assert_eq!(format_value(0), "0");
        assert_eq!(format_value(999), "999");
        assert_eq!(format_value(1000), "1,000");
        assert_eq!(format_value(12345), "12,345");
        assert_eq!(format_value(1000000), "1,000,000");
        assert_eq!(format_value(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(999, false), "999");
        assert_eq!(format_bytes(1000, false), "1,000");
        assert_eq!(format_bytes(1000000, false), "1,000,000");
        assert_eq!(format_bytes(1000, true), "1,000");
        assert_eq!(format_bytes(2048000, true), "2,048 k");
    }
}
