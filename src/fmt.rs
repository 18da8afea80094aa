use rust_decimal::Decimal;

/// Format a decimal as a dollar amount with thousands separators: $1,234.56
/// Rounding to two places happens here, at the presentation edge only.
pub fn money(val: Decimal) -> String {
    let rounded = val.round_dp(2);
    let negative = rounded < Decimal::ZERO;
    let cents = format!("{:.2}", rounded.abs());
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts.get(1).copied().unwrap_or("00");

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}
