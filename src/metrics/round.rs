use crate::workbook::CellValue;
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("Hardcode regex pattern"));
/// `R1`, `Round 2`, `_r3` not preceded by a letter
static SHEET_ROUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z])(?:round|r)[\s_-]*(\d+)").expect("Hardcode regex pattern"));

/// A simulation round, identified by its number.
///
/// Round labels vary between files (`1`, `"Round 1"`, `"R1"`, a sheet called `KPI_R1`); all of
/// them parse to the same `Round`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Round(u32);

impl Round {
    pub fn new(number: u32) -> Self {
        Round(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// Takes the first run of decimal digits in `text` as the round number.
    pub fn from_text(text: &str) -> Option<Round> {
        DIGITS.find(text)?.as_str().parse().ok().map(Round)
    }

    /// Reads the round a sheet is dedicated to from its name (`KPI_R2`, `Round 1`).
    /// Digits without an `R`/`Round` marker do not count, so `Sheet1` has no round.
    pub fn from_sheet_name(name: &str) -> Option<Round> {
        SHEET_ROUND.captures(name)?.get(1)?.as_str().parse().ok().map(Round)
    }

    /// Reads a round from a cell, so that `2`, `2.0`, `"2.0"` and `"Round 2"` agree.
    ///
    /// Numbers keep their integer part and must be at least 1: `-1`, `0` and `NaN` are not
    /// rounds. Text that is a plain number is held to the same rule.
    pub fn parse(value: &CellValue) -> Option<Round> {
        match value {
            CellValue::Empty => None,
            CellValue::Number(number) => Round::from_number(*number),
            CellValue::Text(text) => match text.trim().parse::<f64>() {
                Ok(number) => Round::from_number(number),
                Err(_) => Round::from_text(text).filter(|round| round.0 > 0),
            },
        }
    }

    fn from_number(number: f64) -> Option<Round> {
        match number.is_finite() && number >= 1.0 && number <= f64::from(u32::MAX) {
            true => Some(Round(number.trunc() as u32)),
            false => None,
        }
    }

    /// The round before this one. Rounds start at 1.
    pub fn previous(self) -> Option<Round> {
        self.0.checked_sub(1).filter(|number| *number > 0).map(Round)
    }
}

impl From<u32> for Round {
    fn from(number: u32) -> Self {
        Round(number)
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Round {}", self.0)
    }
}
