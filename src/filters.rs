//! Number formatting for user-facing messages.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};

/// Format `number` as dollars with thousands separators and two decimal
/// places, e.g. "$1,234.50" or "-$12.30".
pub fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    if !number.is_finite() {
        return number.to_string();
    }

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .ok()
            .map(|fmt| fmt.precision(Precision::Decimals(2)))
    });
    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-$")
            .ok()
            .map(|fmt| fmt.precision(Precision::Decimals(2)))
    });

    let formatted_string = match (positive_fmt, negative_fmt) {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        _ if number == 0.0 => return "$0.00".to_owned(),
        (Some(_), Some(negative_fmt)) if number < 0.0 => {
            negative_fmt.fmt_string(number.abs())
        }
        (Some(positive_fmt), _) if number > 0.0 => positive_fmt.fmt_string(number),
        _ if number < 0.0 => return format!("-${:.2}", number.abs()),
        _ => return format!("${number:.2}"),
    };

    pad_decimals(formatted_string)
}

/// numfmt drops trailing zeros, e.g. "12.30" is rendered as "$12.3", so put
/// them back.
fn pad_decimals(formatted: String) -> String {
    match formatted.rfind('.') {
        Some(dot) => {
            let decimals = formatted.len() - dot - 1;
            match decimals {
                0 => format!("{formatted}00"),
                1 => format!("{formatted}0"),
                _ => formatted,
            }
        }
        None => format!("{formatted}.00"),
    }
}

/// Format `percent` rounded to a whole number, e.g. "10%".
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.0}%")
}
