use std::collections::HashSet;

use serde::Serialize;

use crate::services::table::utils::{try_parse_date, try_parse_numeric};
use crate::services::table::{Column, Table};

/// Columns with a distinct/row ratio below this are categorical.
pub const CATEGORICAL_UNIQUE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Date,
    Categorical,
    Other,
}

/// Column kind per column, in table order. Computed once per analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnClassification {
    kinds: Vec<(String, ColumnKind)>,
}

impl ColumnClassification {
    pub fn classify(table: &Table) -> Self {
        let kinds = table
            .columns()
            .iter()
            .map(|column| {
                let kind = if is_numeric_column(column) {
                    ColumnKind::Numeric
                } else if is_date_column(column) {
                    ColumnKind::Date
                } else if is_categorical_column(column, table.row_count()) {
                    ColumnKind::Categorical
                } else {
                    ColumnKind::Other
                };
                tracing::debug!("Column '{}' classified as {:?}", column.name, kind);
                (column.name.clone(), kind)
            })
            .collect();

        Self { kinds }
    }

    pub fn kind_at(&self, idx: usize) -> ColumnKind {
        self.kinds[idx].1
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.kinds.iter().find(|(n, _)| n == name).map(|(_, k)| *k)
    }

    /// Table positions of the columns of one kind, in table order.
    pub fn indices(&self, kind: ColumnKind) -> Vec<usize> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, (_, k))| *k == kind)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn names(&self, kind: ColumnKind) -> Vec<&str> {
        self.kinds
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn count(&self, kind: ColumnKind) -> usize {
        self.kinds.iter().filter(|(_, k)| *k == kind).count()
    }
}

pub fn is_numeric_column(column: &Column) -> bool {
    column.non_missing().all(|c| try_parse_numeric(c).is_some())
}

// one unparseable cell disqualifies the column
pub fn is_date_column(column: &Column) -> bool {
    column.non_missing().all(|c| try_parse_date(c).is_some())
}

pub fn is_categorical_column(column: &Column, row_count: usize) -> bool {
    if row_count == 0 {
        return false;
    }
    let distinct: HashSet<_> = column.non_missing().map(|c| c.key()).collect();
    (distinct.len() as f64 / row_count as f64) < CATEGORICAL_UNIQUE_RATIO
}
