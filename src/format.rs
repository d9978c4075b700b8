//! Display formatting for amounts and dates.
//!
//! Both functions are fixed to the `id-ID` locale and the Indonesian Rupiah. They are total:
//! any `f64` and any input string produce display text, never an error. The output is for
//! humans only and is never parsed back.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const CURRENCY_PREFIX: &str = "Rp";
const GROUP_SEPARATOR: char = '.';
pub const INVALID_DATE: &str = "Invalid Date";
pub const MISSING_DATE: &str = "-";

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

// Tried in order after RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Render an amount as whole Rupiah, e.g. `1500000.0` -> `Rp1.500.000`.
///
/// Rounds half away from zero. Negative amounts get a leading `-`; an amount that rounds to
/// zero is rendered without a sign.
pub fn format_currency(amount: f64) -> String {
    if amount.is_nan() {
        return format!("{CURRENCY_PREFIX}NaN");
    }
    let negative = amount.is_sign_negative();
    let body = if amount.is_infinite() {
        "∞".to_string()
    } else {
        let rounded = amount.abs().round();
        if rounded == 0.0 {
            return format!("{CURRENCY_PREFIX}0");
        }
        // `rounded` is integral, so `{:.0}` prints it exactly.
        group_thousands(&format!("{:.0}", rounded))
    };
    if negative {
        format!("-{CURRENCY_PREFIX}{body}")
    } else {
        format!("{CURRENCY_PREFIX}{body}")
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

/// Render a date or timestamp string as `dd Mon yyyy`, e.g. `2024-03-07` -> `07 Mar 2024`.
///
/// Timestamps keep the calendar date written in their own offset. Input that does not parse
/// yields [`INVALID_DATE`].
pub fn format_date(input: &str) -> String {
    match parse_calendar_date(input) {
        Some(date) => render_date(date),
        None => INVALID_DATE.to_string(),
    }
}

/// Like [`format_date`], but renders [`MISSING_DATE`] for an absent value.
pub fn format_date_opt(input: Option<&str>) -> String {
    input.map(format_date).unwrap_or_else(|| MISSING_DATE.to_string())
}

fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.date_naive());
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

fn render_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    let month = MONTHS_SHORT[date.month0() as usize];
    format!("{:02} {} {:04}", date.day(), month, date.year())
}
