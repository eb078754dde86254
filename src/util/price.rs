//! Currency formatting for product prices.
//!
//! Output follows the `en-US` conventions storefront shoppers expect:
//! comma thousands separators, at least two fraction digits and the
//! currency symbol before the amount (`$1,234.50`, `-€3.00`).

use std::iter;

use thiserror::Error;

/// Shown on product cards when the CMS has no price.
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

const NBSP: char = '\u{a0}';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("invalid currency code `{0}`")]
    InvalidCurrency(String),
}

/// A validated ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    code: String,
}

impl Currency {
    pub fn usd() -> Self {
        Self {
            code: "USD".to_string(),
        }
    }

    pub fn parse(code: &str) -> Result<Self, PriceError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PriceError::InvalidCurrency(code.to_string()));
        }
        Ok(Self {
            code: trimmed.to_ascii_uppercase(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn symbol(&self) -> Option<&'static str> {
        match self.code.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "CAD" => Some("CA$"),
            "AUD" => Some("A$"),
            "INR" => Some("₹"),
            "CNY" => Some("CN¥"),
            "MXN" => Some("MX$"),
            "KRW" => Some("₩"),
            "HKD" => Some("HK$"),
            "NZD" => Some("NZ$"),
            "BRL" => Some("R$"),
            "ILS" => Some("₪"),
            "PHP" => Some("₱"),
            "TWD" => Some("NT$"),
            "VND" => Some("₫"),
            "XCD" => Some("EC$"),
            _ => None,
        }
    }

    fn prefix(&self) -> String {
        match self.symbol() {
            Some(symbol) => symbol.to_string(),
            None => format!("{}{NBSP}", self.code),
        }
    }
}

/// Format `amount` in the given currency code.
pub fn format_price(amount: f64, currency: &str) -> Result<String, PriceError> {
    let currency = Currency::parse(currency)?;
    Ok(format_amount(amount, &currency))
}

/// Format a price given as text, parsed the way the CMS front-end did
/// (leading float prefix, anything unparsable becomes NaN).
pub fn format_price_str(amount: &str, currency: &str) -> Result<String, PriceError> {
    format_price(parse_leading_float(amount), currency)
}

/// Card price line: USD, or a placeholder when the price is missing.
pub fn format_card_price(price: Option<f64>) -> String {
    match price {
        Some(amount) => format_amount(amount, &Currency::usd()),
        None => PRICE_NOT_AVAILABLE.to_string(),
    }
}

pub fn format_amount(amount: f64, currency: &Currency) -> String {
    let prefix = currency.prefix();

    if amount.is_nan() {
        return format!("{prefix}NaN");
    }

    let sign = if amount < 0.0 { "-" } else { "" };

    if amount.is_infinite() {
        return format!("{sign}{prefix}∞");
    }

    let (whole, fraction) = round_to_cents(amount.abs());
    format!("{sign}{prefix}{}.{fraction}", group_thousands(&whole))
}

/// Round half-up to two places on the shortest decimal form of `magnitude`,
/// so `1.005` becomes `1.01` rather than following its binary expansion.
fn round_to_cents(magnitude: f64) -> (String, String) {
    let text = magnitude.to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut digits: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes().chain(iter::repeat(b'0')).take(2))
        .collect();

    if fraction.as_bytes().get(2).is_some_and(|digit| *digit >= b'5') {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - 2;
    let as_text = |bytes: &[u8]| bytes.iter().map(|&byte| char::from(byte)).collect::<String>();
    (as_text(&digits[..split]), as_text(&digits[split..]))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let first_group = digits.len() % 3;

    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (index + 3 - first_group) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

/// `parseFloat`-style parsing: skip leading whitespace, read the longest
/// numeric prefix, return NaN when there is none.
fn parse_leading_float(input: &str) -> f64 {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let rest = &trimmed[end..];
    if rest.starts_with("Infinity") {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    trimmed[..end].parse().unwrap_or(f64::NAN)
}
