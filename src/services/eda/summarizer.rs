use std::collections::HashSet;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use polars::prelude::{
    ChunkAgg, ChunkQuantile, ChunkVar, NamedFrom, PolarsResult, QuantileInterpolOptions, Series,
};

use super::classifier::{ColumnClassification, ColumnKind};
use crate::error::AppError;
use crate::models::{CategoricalSummary, ColumnSummary, DateSummary, NumericSummary};
use crate::services::table::types::ISO_FORMAT;
use crate::services::table::utils::{try_parse_date, try_parse_numeric};
use crate::services::table::{Cell, CellKey, Column, Table};

/// Value frequencies, most frequent first; ties keep first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueCounts {
    entries: Vec<(String, usize)>,
}

impl ValueCounts {
    pub fn from_column(column: &Column) -> Self {
        // grouped by cell identity; the label is display only, so 1 and "1" stay apart
        let mut counts: IndexMap<CellKey, (String, usize)> = IndexMap::new();
        for cell in column.non_missing() {
            counts.entry(cell.key()).or_insert_with(|| (cell.label(), 0)).1 += 1;
        }
        let mut entries: Vec<(String, usize)> = counts.into_values().collect();
        // stable sort keeps first-seen order among equal counts
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, usize)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&(String, usize)> {
        self.entries.first()
    }

    /// Label -> count. Distinct cells sharing a label are summed under it.
    pub fn to_map(&self) -> IndexMap<String, usize> {
        let mut map = IndexMap::with_capacity(self.entries.len());
        for (label, count) in &self.entries {
            *map.entry(label.clone()).or_insert(0) += count;
        }
        map
    }
}

#[derive(Debug, Clone)]
pub struct NumericProfile {
    pub name: String,
    /// Coerced cells; unparseable cells are `None` here only.
    pub values: Vec<Option<f64>>,
    pub summary: NumericSummary,
}

impl NumericProfile {
    pub fn present(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct CategoricalProfile {
    pub name: String,
    pub counts: ValueCounts,
    pub summary: CategoricalSummary,
}

#[derive(Debug, Clone)]
pub struct DateProfile {
    pub name: String,
    pub values: Vec<Option<NaiveDateTime>>,
    pub summary: DateSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetStats {
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_values: usize,
    pub duplicate_rows: usize,
}

impl DatasetStats {
    pub fn missing_percentage(&self) -> f64 {
        percentage(self.missing_values, self.total_rows * self.total_columns)
    }

    pub fn duplicate_percentage(&self) -> f64 {
        percentage(self.duplicate_rows, self.total_rows)
    }
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub dataset: DatasetStats,
    pub numeric: Vec<NumericProfile>,
    pub categorical: Vec<CategoricalProfile>,
    pub dates: Vec<DateProfile>,
    pub null_counts: IndexMap<String, usize>,
    pub dtypes: IndexMap<String, String>,
}

impl Summary {
    /// Numeric, then categorical, then date entries, each group in table order.
    pub fn describe(&self) -> IndexMap<String, ColumnSummary> {
        let mut describe = IndexMap::new();
        for p in &self.numeric {
            describe.insert(p.name.clone(), ColumnSummary::Numeric(p.summary.clone()));
        }
        for p in &self.categorical {
            describe.insert(p.name.clone(), ColumnSummary::Categorical(p.summary.clone()));
        }
        for p in &self.dates {
            describe.insert(p.name.clone(), ColumnSummary::Date(p.summary.clone()));
        }
        describe
    }
}

pub fn summarize(table: &Table, classification: &ColumnClassification) -> Result<Summary, AppError> {
    let numeric = classification
        .indices(ColumnKind::Numeric)
        .into_iter()
        .map(|idx| numeric_profile(table.column(idx)))
        .collect::<PolarsResult<Vec<_>>>()?;

    let categorical = classification
        .indices(ColumnKind::Categorical)
        .into_iter()
        .map(|idx| categorical_profile(table.column(idx)))
        .collect();

    let dates = classification
        .indices(ColumnKind::Date)
        .into_iter()
        .filter_map(|idx| {
            let profile = date_profile(table.column(idx));
            if profile.is_none() {
                tracing::debug!("Skipping date summary for '{}': no parseable values", table.column(idx).name);
            }
            profile
        })
        .collect();

    let null_counts: IndexMap<String, usize> = table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.missing_count()))
        .collect();

    let dtypes = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.name.clone(), dtype_label(c, classification.kind_at(idx)).to_string()))
        .collect();

    let dataset = DatasetStats {
        total_rows: table.row_count(),
        total_columns: table.column_count(),
        missing_values: null_counts.values().sum(),
        duplicate_rows: count_duplicate_rows(table),
    };

    Ok(Summary {
        dataset,
        numeric,
        categorical,
        dates,
        null_counts,
        dtypes,
    })
}

fn numeric_profile(column: &Column) -> PolarsResult<NumericProfile> {
    let values: Vec<Option<f64>> = column.cells.iter().map(try_parse_numeric).collect();
    let summary = describe_numeric(&column.name, &values)?;
    Ok(NumericProfile {
        name: column.name.clone(),
        values,
        summary,
    })
}

fn describe_numeric(name: &str, values: &[Option<f64>]) -> PolarsResult<NumericSummary> {
    let series = Series::new(name, values);
    let ca = series.f64()?;
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

    Ok(NumericSummary {
        count: ca.len() - ca.null_count(),
        mean: finite(ca.mean()),
        std: finite(ca.std(1)),
        min: ca.min(),
        q1: ca.quantile(0.25, QuantileInterpolOptions::Linear)?,
        median: ca.quantile(0.5, QuantileInterpolOptions::Linear)?,
        q3: ca.quantile(0.75, QuantileInterpolOptions::Linear)?,
        max: ca.max(),
    })
}

fn categorical_profile(column: &Column) -> CategoricalProfile {
    let counts = ValueCounts::from_column(column);
    let summary = CategoricalSummary {
        count: column.non_missing().count(),
        unique: counts.len(),
        top: counts.top().map(|(v, _)| v.clone()),
        freq: counts.top().map_or(0, |(_, n)| *n),
        null_count: column.missing_count(),
    };
    CategoricalProfile {
        name: column.name.clone(),
        counts,
        summary,
    }
}

fn date_profile(column: &Column) -> Option<DateProfile> {
    let values: Vec<Option<NaiveDateTime>> = column.cells.iter().map(try_parse_date).collect();
    let parsed: Vec<NaiveDateTime> = values.iter().flatten().copied().collect();
    let min = parsed.iter().min()?;
    let max = parsed.iter().max()?;
    let unique = parsed.iter().collect::<HashSet<_>>().len();

    let summary = DateSummary {
        min: min.format(ISO_FORMAT).to_string(),
        max: max.format(ISO_FORMAT).to_string(),
        unique,
        null_count: values.len() - parsed.len(),
    };
    Some(DateProfile {
        name: column.name.clone(),
        values,
        summary,
    })
}

/// Storage label for a column, in the vocabulary of dataframe dtypes.
pub fn dtype_label(column: &Column, kind: ColumnKind) -> &'static str {
    if column.non_missing().next().is_none() {
        return "float64";
    }
    if kind == ColumnKind::Date || column.non_missing().all(|c| matches!(c, Cell::Date(_))) {
        return "datetime64[ns]";
    }
    if column.non_missing().all(|c| matches!(c, Cell::Number(_))) {
        let integral = column
            .non_missing()
            .all(|c| matches!(c, Cell::Number(v) if v.fract() == 0.0));
        // a gap forces a float column, as NaN has no integer form
        return if integral && column.missing_count() == 0 { "int64" } else { "float64" };
    }
    "object"
}

pub fn count_duplicate_rows(table: &Table) -> usize {
    let mut seen = HashSet::with_capacity(table.row_count());
    (0..table.row_count())
        .filter(|&idx| {
            let key: Vec<_> = table.row(idx).map(Cell::key).collect();
            !seen.insert(key)
        })
        .count()
}
