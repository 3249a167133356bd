use chrono::NaiveDate;

/// Round to 2 decimal places. Applied at write and aggregation boundaries so
/// stored REALs and running sums stay at cent precision.
pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// Format a float as a euro amount with thousands separators: 1.234,56 €
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-{with_dots},{dec_part} \u{20ac}")
    } else {
        format!("{with_dots},{dec_part} \u{20ac}")
    }
}

/// Plain 2-decimal amount with a comma separator, no grouping: 1234,56.
/// This is the cell format the delimited export uses.
pub fn amount_pt(val: f64) -> String {
    format!("{:.2}", val).replace('.', ",")
}

/// DD/MM/YYYY, the local date format used in exports.
pub fn date_pt(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "1.234,56 \u{20ac}");
        assert_eq!(money(-500.00), "-500,00 \u{20ac}");
        assert_eq!(money(0.0), "0,00 \u{20ac}");
        assert_eq!(money(1000000.99), "1.000.000,99 \u{20ac}");
        assert_eq!(money(42.10), "42,10 \u{20ac}");
    }

    #[test]
    fn test_amount_pt() {
        assert_eq!(amount_pt(1234.56), "1234,56");
        assert_eq!(amount_pt(5.0), "5,00");
    }

    #[test]
    fn test_date_pt() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date_pt(d), "05/03/2024");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.456), 10.46);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(round2(205.99999999999997), 206.0);
        assert_eq!(round2(-3.128), -3.13);
    }
}
