//! Presentation helpers.
//!
//! Line-item descriptions use the es-UY conventions of the printed
//! bill: `.` groups thousands and `,` separates decimals.  Monetary
//! aggregates are rounded with [`round2`] only where they are shown,
//! never inside the engine.

/// Round to cents for display.
pub fn round2(value: f64) -> f64 {
    ((value + f64::EPSILON) * 100.0).round() / 100.0
}

/// Format `value` with `decimals` fixed decimals, es-UY style.
pub fn number(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(rendered.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit as char);
    }
    if let Some(frac) = frac_part {
        grouped.push(',');
        grouped.push_str(frac);
    }

    let negative = value < 0.0 && grouped.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Currency amount, e.g. `$ 1.234,50`.
pub fn money(value: f64) -> String {
    let body = number(value.abs(), 2);
    if value < 0.0 && round2(value.abs()) > 0.0 {
        format!("-$ {body}")
    } else {
        format!("$ {body}")
    }
}

fn is_whole(value: f64) -> bool {
    (value - value.round()).abs() < 1e-9
}

/// Energy quantity: no decimals when whole, `decimals` otherwise.
pub fn kwh(value: f64, decimals: usize) -> String {
    if is_whole(value) {
        number(value, 0)
    } else {
        number(value, decimals)
    }
}

/// Demand quantity: no decimals when whole, one otherwise.
pub fn kw(value: f64) -> String {
    if is_whole(value) {
        number(value, 0)
    } else {
        number(value, 1)
    }
}

pub fn price_per_kwh(value: f64) -> String {
    number(value, 3)
}

pub fn price_per_kw(value: f64) -> String {
    number(value, 1)
}

/// Signed percentage with two decimals, e.g. `20,96%`.
pub fn percent(pct: f64) -> String {
    format!("{}%", number(pct, 2))
}

/// Multiplier shown as a whole percentage, e.g. `3.0` becomes `300%`.
pub fn factor_percent(factor: f64) -> String {
    let pct = factor * 100.0;
    if is_whole(pct) {
        format!("{}%", number(pct, 0))
    } else {
        format!("{}%", number(pct, 1))
    }
}

/// Ordinal tier name: `1er Escalón`, `2do Escalón`, `3er Escalón`,
/// then `Nº Escalón`.
pub fn tier_name(index: usize) -> String {
    match index {
        1 => "1er Escalón".to_string(),
        2 => "2do Escalón".to_string(),
        3 => "3er Escalón".to_string(),
        n => format!("{n}º Escalón"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_and_uses_decimal_comma() {
        assert_eq!(number(1234567.891, 2), "1.234.567,89");
        assert_eq!(number(999.0, 0), "999");
        assert_eq!(number(1000.0, 0), "1.000");
        assert_eq!(number(-42.5, 1), "-42,5");
        assert_eq!(number(-0.001, 2), "0,00");
    }

    #[test]
    fn quantities_drop_decimals_when_whole() {
        assert_eq!(kwh(150.0, 3), "150");
        assert_eq!(kwh(150.25, 3), "150,250");
        assert_eq!(kwh(150.25, 2), "150,25");
        assert_eq!(kw(14.0), "14");
        assert_eq!(kw(13.3), "13,3");
    }

    #[test]
    fn money_and_percent() {
        assert_eq!(money(1234.5), "$ 1.234,50");
        assert_eq!(money(-3.0), "-$ 3,00");
        assert_eq!(percent(20.96), "20,96%");
        assert_eq!(factor_percent(3.0), "300%");
        assert_eq!(factor_percent(1.0), "100%");
    }

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round2(1.236), 1.24);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn ordinal_tier_names() {
        assert_eq!(tier_name(1), "1er Escalón");
        assert_eq!(tier_name(2), "2do Escalón");
        assert_eq!(tier_name(3), "3er Escalón");
        assert_eq!(tier_name(4), "4º Escalón");
    }
}
