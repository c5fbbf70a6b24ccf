//! Keyword lookup of sheets and columns.
//!
//! Exports name the same thing differently (`SupplyChain`, `Supply Chain`, `supply chain KPIs`),
//! so names are compared after [`normalize_name`] and a name matches when it contains every
//! keyword as a substring.
use crate::workbook::Table;
use crate::workbook::Workbook;

/// How to choose among several names matching the keywords.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// The first match in file order.
    #[default]
    FirstMatch,
    /// The match with the fewest characters beyond the keywords; ties keep file order.
    MostSpecific,
}

/// Lowercases `name`, collapses runs of whitespace to one space and trims it.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true when the normalized `name` contains every normalized keyword.
/// An empty keyword list matches nothing.
pub fn matches<K: AsRef<str>>(name: &str, keywords: &[K]) -> bool {
    let name = normalize_name(name);
    !keywords.is_empty() && keywords.iter().all(|keyword| name.contains(&normalize_name(keyword.as_ref())))
}

fn leftover<K: AsRef<str>>(name: &str, keywords: &[K]) -> usize {
    let covered: usize = keywords
        .iter()
        .map(|keyword| normalize_name(keyword.as_ref()).chars().count())
        .sum();
    normalize_name(name).chars().count().saturating_sub(covered)
}

/// All candidates whose name matches, ordered by preference under `policy`.
pub fn rank<'a, T, K, I>(candidates: I, keywords: &[K], policy: MatchPolicy) -> Vec<(&'a str, T)>
where
    K: AsRef<str>,
    I: IntoIterator<Item = (&'a str, T)>,
{
    let mut found: Vec<(&'a str, T)> = candidates
        .into_iter()
        .filter(|(name, _)| matches(name, keywords))
        .collect();
    if policy == MatchPolicy::MostSpecific {
        // Stable sort keeps file order among equally specific names
        found.sort_by_key(|(name, _)| leftover(name, keywords));
    }
    found
}

/// Finds the first sheet whose name contains all keywords.
pub fn find_sheet<'a, K: AsRef<str>>(workbook: &'a Workbook, keywords: &[K]) -> Option<(&'a str, &'a Table)> {
    find_sheet_with(workbook, keywords, MatchPolicy::FirstMatch)
}

pub fn find_sheet_with<'a, K: AsRef<str>>(workbook: &'a Workbook, keywords: &[K], policy: MatchPolicy) -> Option<(&'a str, &'a Table)> {
    rank(workbook.iter(), keywords, policy).into_iter().next()
}

/// Every matching sheet, best first.
pub fn find_sheets<'a, K: AsRef<str>>(workbook: &'a Workbook, keywords: &[K], policy: MatchPolicy) -> Vec<(&'a str, &'a Table)> {
    rank(workbook.iter(), keywords, policy)
}

/// Finds the first column whose name contains all keywords.
pub fn find_column<K: AsRef<str>>(table: &Table, keywords: &[K]) -> Option<usize> {
    find_column_with(table, keywords, MatchPolicy::FirstMatch)
}

pub fn find_column_with<K: AsRef<str>>(table: &Table, keywords: &[K], policy: MatchPolicy) -> Option<usize> {
    let columns = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, name)| (name.as_str(), index));
    rank(columns, keywords, policy).into_iter().next().map(|(_, index)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> Workbook {
        let names = ["Sales", "Supply Chain KPIs", "SupplyChain", "supply chain"];
        Workbook::new(
            "book",
            names.iter().map(|name| (name.to_string(), Table::default())).collect(),
        )
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_name("  Supply \t Chain\n"), "supply chain");
        assert_eq!(normalize_name("ROI (%)"), "roi (%)");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn finds_first_sheet_with_all_keywords() {
        let workbook = workbook();
        assert_eq!(find_sheet(&workbook, &["supply", "chain"]).map(|(name, _)| name), Some("Supply Chain KPIs"));
        assert_eq!(find_sheet(&workbook, &["SALES"]).map(|(name, _)| name), Some("Sales"));
        assert!(find_sheet(&workbook, &["operations"]).is_none());
        assert!(find_sheet::<&str>(&workbook, &[]).is_none());
    }

    #[test]
    fn most_specific_prefers_shortest_leftover() {
        let workbook = workbook();
        let found = find_sheets(&workbook, &["supply", "chain"], MatchPolicy::MostSpecific);
        let names: Vec<&str> = found.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["SupplyChain", "supply chain", "Supply Chain KPIs"]);

        // Equal leftover keeps file order
        let tied = Workbook::new(
            "book",
            vec![("Sales R1".to_owned(), Table::default()), ("Sales R2".to_owned(), Table::default())],
        );
        assert_eq!(find_sheet_with(&tied, &["sales"], MatchPolicy::MostSpecific).map(|(name, _)| name), Some("Sales R1"));
        assert_eq!(
            find_sheet_with(&workbook, &["supply"], MatchPolicy::MostSpecific).map(|(name, _)| name),
            Some("SupplyChain")
        );
    }

    #[test]
    fn finds_columns() {
        let table = Table::from_rows::<&str, _>(&["Round", "Service level (order lines, %)", "Availability components (%)"], vec![]);
        assert_eq!(find_column(&table, &["service", "level"]), Some(1));
        assert_eq!(find_column(&table, &["AVAILABILITY"]), Some(2));
        assert_eq!(find_column(&table, &["reliability"]), None);
        assert_eq!(find_column_with(&table, &["%"], MatchPolicy::MostSpecific), Some(2));
    }
}
