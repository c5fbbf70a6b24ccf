use crate::metrics::aggregate::MetricValue;
use serde::Deserialize;

/// Shown in place of a value that could not be read
pub const MISSING: &str = "–";

const CURRENCY_HINTS: [&str; 3] = ["margin", "€", "revenue"];
const PERCENT_HINTS: [&str; 11] = [
    "%", "service", "availability", "reliab", "rejection", "obsolete", "utilization", "adherence", "cost", "shelf", "osa",
];

/// How a metric value is presented.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Currency,
    #[default]
    Plain,
}

impl Unit {
    /// Guesses the unit from a metric or column name. Currency hints win over percent hints.
    pub fn infer(name: &str) -> Unit {
        let name = name.to_lowercase();
        if CURRENCY_HINTS.iter().any(|hint| name.contains(hint)) {
            Unit::Currency
        } else if PERCENT_HINTS.iter().any(|hint| name.contains(hint)) {
            Unit::Percent
        } else {
            Unit::Plain
        }
    }
}

/// Formats a value for display: `€1,234`, `12.5%` or `1,234.57`.
pub fn format_value(unit: Unit, value: MetricValue) -> String {
    match (value.value(), unit) {
        (None, _) => MISSING.to_owned(),
        (Some(value), Unit::Currency) => format!("€{}", grouped(value, 0)),
        (Some(value), Unit::Percent) => format!("{:.1}%", value),
        (Some(value), Unit::Plain) => grouped(value, 2),
    }
}

/// Formats a change against the previous round with an explicit sign: `+1.5%`, `-1,200`, `+0.25`.
pub fn format_delta(unit: Unit, delta: f64) -> String {
    match unit {
        Unit::Currency => match delta < 0.0 {
            true => grouped(delta, 0),
            false => format!("+{}", grouped(delta, 0)),
        },
        Unit::Percent => format!("{:+.1}%", delta),
        Unit::Plain => format!("{:+.2}", delta),
    }
}

/// Fixed-point formatting with comma thousands separators.
fn grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut result = String::new();
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            result.push(',');
        }
        result.push(digit);
    }
    if let Some(fraction) = fraction {
        result.push('.');
        result.push_str(fraction);
    }
    if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        result.insert(0, '-');
    }
    result
}
