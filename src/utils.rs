// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

/// Format with a fixed number of decimals and `,` thousands separators, e.g. `1,234.50`.
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0.00" reads oddly, only keep the sign when something non-zero survives rounding
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Dollar amount with two decimals: `$1,234.50`.
pub fn format_currency(value: f64) -> String {
    format!("${}", format_thousands(value, 2))
}

/// Whole dollars for chart labels: `$1,235`.
pub fn format_currency_whole(value: f64) -> String {
    format!("${}", format_thousands(value, 0))
}

pub fn format_count(count: usize) -> String {
    format_thousands(count as f64, 0)
}

/// Keep at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0, 2), "0.00");
        assert_eq!(format_thousands(999.0, 0), "999");
        assert_eq!(format_thousands(1000.0, 0), "1,000");
        assert_eq!(format_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_thousands(-1234.5, 2), "-1,234.50");
        assert_eq!(format_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(60.0), "$60.00");
        assert_eq!(format_currency(20.0), "$20.00");
        assert_eq!(format_currency(12345.678), "$12,345.68");
        assert_eq!(format_currency_whole(12345.678), "$12,346");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(3), "3");
        assert_eq!(format_count(1_000_000), "1,000,000");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("Home & Kitchen", 4), "Home");
        assert_eq!(truncate_chars("Café", 40), "Café");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }
}
