//! Number Formatting
//! Thousands separators for metric cards, tables and captions.

use num_format::{Locale, ToFormattedString};
use std::collections::BTreeMap;

/// Format with a fixed number of decimals and `,` thousands separators.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return "n/a".to_string();
    }
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: i64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = parts.next() {
        res.push('.');
        res.push_str(frac);
    }
    if n < 0.0 && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

/// Integers without decimals, everything else with two.
pub fn format_value(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format_number(n, 0)
    } else {
        format_number(n, 2)
    }
}

/// Replace every `{name}` in `template` with the formatted value.
/// Unknown placeholders are left as they are.
pub fn fill_caption(template: &str, values: &BTreeMap<String, f64>) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        out = out.replace(&format!("{{{}}}", name), &format_value(*value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-1500.0, 0), "-1,500");
        assert_eq!(format_number(f64::NAN, 2), "n/a");
        assert_eq!(format_value(35000.0), "35,000");
        assert_eq!(format_value(0.5), "0.50");
    }

    #[test]
    fn captions_use_named_values() {
        let mut values = BTreeMap::new();
        values.insert("killed".to_string(), 1234.0);
        assert_eq!(
            fill_caption("{killed} health workers killed, {missing} unknown", &values),
            "1,234 health workers killed, {missing} unknown"
        );
    }
}
