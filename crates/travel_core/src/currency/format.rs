//! Price display helpers.

use crate::model::booking::round_price;
use rust_decimal::Decimal;

const SYMBOLS: &[(&str, &str)] = &[
    ("EUR", "€"),
    ("GBP", "£"),
    ("USD", "$"),
    ("CHF", "CHF"),
    ("SEK", "kr"),
    ("NOK", "kr"),
    ("DKK", "kr"),
    ("CZK", "Kč"),
    ("PLN", "zł"),
    ("HUF", "Ft"),
    ("RON", "lei"),
];

/// Display symbol for `code`; unknown codes are returned as-is.
pub fn currency_symbol(code: &str) -> &str {
    SYMBOLS
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(code, |(_, symbol)| *symbol)
}

/// Formats `amount` as `<symbol> <grouped amount>` with exactly 2 decimals,
/// e.g. `€ 1,234.50`.
pub fn format_price(amount: Decimal, code: &str) -> String {
    let fixed = format!("{:.2}", round_price(amount));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));
    format!(
        "{} {sign}{}.{fraction}",
        currency_symbol(code),
        group_thousands(integer)
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
