use chrono::NaiveDateTime;
use serde_json::Value;

use crate::error::AppError;

pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Missing,
}

/// Hashable identity of a cell, used for distinct counts and duplicate rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Number(u64),
    Text(String),
    Date(NaiveDateTime),
    Missing,
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn key(&self) -> CellKey {
        match self {
            // -0.0 and 0.0 compare equal, so they must hash equal too
            Cell::Number(v) if *v == 0.0 => CellKey::Number(0f64.to_bits()),
            Cell::Number(v) => CellKey::Number(v.to_bits()),
            Cell::Text(s) => CellKey::Text(s.clone()),
            Cell::Date(d) => CellKey::Date(*d),
            Cell::Missing => CellKey::Missing,
        }
    }

    /// Label used when the cell is reported as a category value.
    pub fn label(&self) -> String {
        match self {
            Cell::Number(v) => format_number(*v),
            Cell::Text(s) => s.clone(),
            Cell::Date(d) => d.format(ISO_FORMAT).to_string(),
            Cell::Missing => String::new(),
        }
    }

    /// Transport form: numbers stay numbers, timestamps become ISO-8601 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Number(v) => number_to_json(*v),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Date(d) => Value::String(d.format(ISO_FORMAT).to_string()),
            Cell::Missing => Value::Null,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Missing
        }
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Date(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Missing, Into::into)
    }
}

fn is_integral(v: f64) -> bool {
    v.fract() == 0.0 && v.abs() < 1e15
}

pub fn format_number(v: f64) -> String {
    if is_integral(v) {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

pub fn number_to_json(v: f64) -> Value {
    if is_integral(v) {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new<C: Into<Cell>>(name: &str, cells: Vec<C>) -> Self {
        Self {
            name: name.to_string(),
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn non_missing(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| !c.is_missing())
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }
}

/// Ordered, rectangular collection of named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table, trimming names. A repeated name keeps the first
    /// position but takes the cells of the last column defined with it.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, AppError> {
        let row_count = columns.first().map_or(0, |c| c.cells.len());
        let mut merged: Vec<Column> = Vec::with_capacity(columns.len());

        for mut column in columns {
            if column.cells.len() != row_count {
                return Err(AppError::ParseFailure(format!(
                    "Column '{}' has {} rows, expected {}",
                    column.name,
                    column.cells.len(),
                    row_count
                )));
            }
            column.name = column.name.trim().to_string();

            match merged.iter_mut().find(|c| c.name == column.name) {
                Some(existing) => {
                    tracing::warn!("Duplicate column name '{}', keeping last definition", column.name);
                    existing.cells = column.cells;
                }
                None => merged.push(column),
            }
        }

        Ok(Self {
            columns: merged,
            row_count,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> &Column {
        &self.columns[idx]
    }

    pub fn row(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.columns.iter().map(move |c| &c.cells[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_last_definition_wins() {
        let table = Table::from_columns(vec![
            Column::new(" a ", vec![1.0, 2.0]),
            Column::new("b", vec!["x", "y"]),
            Column::new("a", vec![3.0, 4.0]),
        ])
        .unwrap();

        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column(0).name, "a");
        assert_eq!(table.column(0).cells, vec![Cell::Number(3.0), Cell::Number(4.0)]);
        assert_eq!(table.column(1).name, "b");
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = Table::from_columns(vec![
            Column::new("a", vec![1.0, 2.0]),
            Column::new("b", vec![1.0]),
        ]);
        assert!(matches!(result, Err(AppError::ParseFailure(_))));
    }

    #[test]
    fn test_cell_json_rendering() {
        assert_eq!(Cell::Number(3.0).to_json(), serde_json::json!(3));
        assert_eq!(Cell::Number(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(Cell::Missing.to_json(), Value::Null);
        let date = chrono::NaiveDate::from_ymd_opt(2023, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Cell::Date(date).to_json(), serde_json::json!("2023-01-05T00:00:00"));
    }

    #[test]
    fn test_zero_keys_match() {
        assert_eq!(Cell::Number(0.0).key(), Cell::Number(-0.0).key());
    }
}
