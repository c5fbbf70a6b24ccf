use crate::workbook::CellValue;

/// Characters dropped before parsing: currency symbols, thousands separators and percent signs.
const NOISE: [char; 5] = ['€', '$', '£', ',', '%'];

/// Parses a display-formatted number such as `"€ 1,234"`, `"(1,234)"` or `"-2.8%"`.
///
/// A value wrapped in parentheses is negative (accounting notation). Currency symbols, commas
/// and percent signs are removed before parsing. A percent sign only strips: `"12.5%"` is
/// `12.5`, not `0.125`. Whitespace may separate thousands groups (`"1 234"`) but not arbitrary
/// digits, so `"1 2"` is not a number. Empty input, text that is not a number after cleaning and
/// non-finite results (`"inf"`, `"NaN"`) give `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let (text, negative) = match text.strip_prefix('(').and_then(|inner| inner.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (text, false),
    };
    let text: String = text.chars().filter(|c| !NOISE.contains(c)).collect();
    let cleaned = join_groups(&text)?;
    if cleaned.is_empty() {
        return None;
    }
    let number = cleaned.parse::<f64>().ok().filter(|number| number.is_finite())?;
    Some(if negative { -number } else { number })
}

/// Removes whitespace, refusing to glue two digit runs unless the second is a thousands group.
fn join_groups(text: &str) -> Option<String> {
    let mut joined = String::with_capacity(text.len());
    for token in text.split_whitespace() {
        let after_digit = joined.ends_with(|c: char| c.is_ascii_digit());
        let group = token.chars().take_while(char::is_ascii_digit).count();
        if after_digit && group > 0 && group != 3 {
            return None;
        }
        joined.push_str(token);
    }
    Some(joined)
}

/// Converts a cell into a number, or `None` when it holds no usable numeric value.
pub fn to_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(number) if number.is_finite() => Some(*number),
        CellValue::Number(_) | CellValue::Empty => None,
        CellValue::Text(text) => parse_number(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formatted_numbers() {
        assert_eq!(parse_number("€ 1,234"), Some(1234.0));
        assert_eq!(parse_number("(1,234)"), Some(-1234.0));
        assert_eq!(parse_number("-2.8%"), Some(-2.8));
        assert_eq!(parse_number("1234"), Some(1234.0));
        assert_eq!(parse_number("12.5%"), Some(12.5));
        assert_eq!(parse_number("$3,000.50"), Some(3000.5));
        assert_eq!(parse_number("(€ 12)"), Some(-12.0));
        assert_eq!(parse_number("1\u{a0}234"), Some(1234.0));
        assert_eq!(parse_number("1 234 567.5"), Some(1234567.5));
        assert_eq!(parse_number("- 5 %"), Some(-5.0));
    }

    #[test]
    fn rejects_non_numbers() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("€"), None);
        assert_eq!(parse_number("()"), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("12 pallets"), None);
        assert_eq!(parse_number("1 2"), None);
        assert_eq!(parse_number("12 5 %"), None);
        assert_eq!(parse_number("1 2345"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn converts_cells() {
        assert_eq!(to_number(&CellValue::Number(4.5)), Some(4.5));
        assert_eq!(to_number(&CellValue::Number(f64::NAN)), None);
        assert_eq!(to_number(&CellValue::Empty), None);
        assert_eq!(to_number(&CellValue::from(" 7 % ")), Some(7.0));
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        for text in ["€ 1,234", "(1,234)", "-2.8%", "0.1", "1e21", "-0.000001"] {
            let once = parse_number(text).unwrap();
            assert_eq!(parse_number(&once.to_string()), Some(once));
            assert_eq!(to_number(&CellValue::Number(once)), Some(once));
        }
    }
}
