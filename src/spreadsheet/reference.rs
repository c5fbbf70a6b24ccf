//! Conversions between A1-style cell references and 0-based indexes.

/// Converts 0-based (row, col) indexes to an A1-style reference such as `"C7"`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::<u8>::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

/// Converts column letters (`"A"`, `"AB"`) to a 0-based column index.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |index, letter| {
        letter
            .is_ascii_alphabetic()
            .then(|| index * 26 + (letter.to_ascii_uppercase() - b'A') as usize + 1)
    }).map(|index| index - 1)
}

/// Converts a 1-based row number (`"7"`) to a 0-based row index.
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts an A1-style reference to 0-based (row, col) indexes.
/// Absolute markers (`$B$3`) are accepted.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}
