use std::collections::BTreeMap;

use dde_core::errors::{DdeError, ErrorInfo};

use crate::table::{RawTable, Row};

/// A single column constraint used when matching checkpoint rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMatch<'a> {
    /// Column holding a non-negative integer checkpoint key.
    pub column: &'a str,
    /// Value the column must equal.
    pub value: u64,
}

impl<'a> KeyMatch<'a> {
    /// Creates a constraint on `column`.
    pub fn new(column: &'a str, value: u64) -> Self {
        Self { column, value }
    }
}

fn describe(criteria: &[KeyMatch<'_>]) -> String {
    criteria
        .iter()
        .map(|c| format!("{}={}", c.column, c.value))
        .collect::<Vec<_>>()
        .join(",")
}

fn matching_rows<'t>(
    table: &'t RawTable,
    criteria: &[KeyMatch<'_>],
) -> Result<Vec<&'t Row>, DdeError> {
    for criterion in criteria {
        table.require_column(criterion.column)?;
    }
    let mut matches = Vec::new();
    for row in table.rows() {
        let mut all = true;
        for criterion in criteria {
            if row.parse::<u64>(criterion.column)? != criterion.value {
                all = false;
                break;
            }
        }
        if all {
            matches.push(row);
        }
    }
    Ok(matches)
}

/// Returns the unique row whose `column` equals `target`.
///
/// Zero or several matches produce a checkpoint error carrying the match
/// count; callers treat it as a reason to skip the run.
pub fn extract_unique<'t>(
    table: &'t RawTable,
    column: &str,
    target: u64,
) -> Result<&'t Row, DdeError> {
    let criteria = [KeyMatch::new(column, target)];
    let mut rows = extract_group(table, &criteria, 1)?;
    Ok(rows.remove(0))
}

/// Returns the rows matching every constraint, requiring exactly `expected` of them.
pub fn extract_group<'t>(
    table: &'t RawTable,
    criteria: &[KeyMatch<'_>],
    expected: usize,
) -> Result<Vec<&'t Row>, DdeError> {
    let rows = matching_rows(table, criteria)?;
    if rows.len() != expected {
        let code = if rows.is_empty() {
            "checkpoint_missing"
        } else {
            "checkpoint_ambiguous"
        };
        return Err(DdeError::Checkpoint(
            ErrorInfo::new(code, "checkpoint not found or ambiguous")
                .with_context("criteria", describe(criteria))
                .with_context("expected", expected.to_string())
                .with_context("found", rows.len().to_string()),
        ));
    }
    Ok(rows)
}

/// Partitions rows by an integer key column, preserving file order inside each group.
pub fn group_by<'t>(
    table: &'t RawTable,
    column: &str,
) -> Result<BTreeMap<u64, Vec<&'t Row>>, DdeError> {
    table.require_column(column)?;
    let mut groups: BTreeMap<u64, Vec<&'t Row>> = BTreeMap::new();
    for row in table.rows() {
        groups.entry(row.parse::<u64>(column)?).or_default().push(row);
    }
    Ok(groups)
}

/// Filters grouped rows down to those matching a second key column.
pub fn filter_group<'t>(
    rows: &[&'t Row],
    column: &str,
    value: u64,
) -> Result<Vec<&'t Row>, DdeError> {
    let mut out = Vec::new();
    for row in rows {
        if row.parse::<u64>(column)? == value {
            out.push(*row);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_table;

    fn table() -> RawTable {
        parse_table("epoch,world_update,v\n0,10,a\n1,10,b\n1,11,c\n2,10,d\n2,10,e\n").unwrap()
    }

    #[test]
    fn unique_match_is_returned() {
        let table = table();
        let row = extract_unique(&table, "epoch", 0).unwrap();
        assert_eq!(row.get("v"), Some("a"));
    }

    #[test]
    fn missing_and_ambiguous_matches_fail() {
        let table = table();
        let missing = extract_unique(&table, "epoch", 9).unwrap_err();
        assert_eq!(missing.info().code, "checkpoint_missing");
        let ambiguous = extract_unique(&table, "epoch", 2).unwrap_err();
        assert_eq!(ambiguous.info().code, "checkpoint_ambiguous");
        assert_eq!(ambiguous.info().context["found"], "2");
    }

    #[test]
    fn group_match_uses_every_column() {
        let table = table();
        let rows = extract_group(
            &table,
            &[KeyMatch::new("epoch", 1), KeyMatch::new("world_update", 11)],
            1,
        )
        .unwrap();
        assert_eq!(rows[0].get("v"), Some("c"));
        let groups = group_by(&table, "epoch").unwrap();
        assert_eq!(groups[&2].len(), 2);
        assert_eq!(filter_group(&groups[&1], "world_update", 10).unwrap().len(), 1);
    }
}
