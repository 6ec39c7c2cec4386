use std::collections::HashSet;

use crate::error::{AppError, AppResult};

/// Name of the join key column shared by history and catalog snapshots
pub const TRACK_ID: &str = "track_id";

/// Untyped tabular snapshot: named columns, rows in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of a column by name (first occurrence)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a column that must exist
    pub fn require_column(&self, name: &str, table: &str) -> AppResult<usize> {
        self.column_index(name).ok_or_else(|| {
            AppError::Schema(format!("{} snapshot is missing the '{}' column", table, name))
        })
    }

    /// Drops every column whose name already appeared earlier in the header
    pub fn dedup_columns(self) -> RawTable {
        let mut seen = HashSet::new();
        let keep: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, name)| seen.insert(name.as_str()))
            .map(|(i, _)| i)
            .collect();

        if keep.len() == self.headers.len() {
            return self;
        }

        tracing::debug!(
            dropped = self.headers.len() - keep.len(),
            "Collapsed duplicate columns"
        );

        let pick = |row: &[String]| -> Vec<String> {
            keep.iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        };

        RawTable {
            headers: pick(self.headers.as_slice()),
            rows: self.rows.iter().map(|row| pick(row.as_slice())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
