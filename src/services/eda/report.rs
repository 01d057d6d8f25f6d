use indexmap::IndexMap;
use serde_json::Value;

use super::classifier::{ColumnClassification, ColumnKind};
use super::insights::InsightOutcome;
use super::summarizer::Summary;
use crate::models::{AnalysisReport, DatasetInfo};
use crate::services::table::types::ISO_FORMAT;
use crate::services::table::utils::try_parse_date;
use crate::services::table::Table;

pub struct ReportBuilder<'a> {
    table: &'a Table,
    classification: &'a ColumnClassification,
    summary: &'a Summary,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        table: &'a Table,
        classification: &'a ColumnClassification,
        summary: &'a Summary,
    ) -> Self {
        Self {
            table,
            classification,
            summary,
        }
    }

    pub fn build(&self, outcome: InsightOutcome, recommendations: Vec<String>) -> AnalysisReport {
        AnalysisReport {
            dataset_info: self.dataset_info(),
            describe: self.summary.describe(),
            dtypes: self.summary.dtypes.clone(),
            null_counts: self.summary.null_counts.clone(),
            insights: outcome.insights,
            recommendations,
            categorical_distributions: self.categorical_distributions(),
            raw_data: self.raw_data(),
        }
    }

    fn dataset_info(&self) -> DatasetInfo {
        let dataset = &self.summary.dataset;
        DatasetInfo {
            total_rows: dataset.total_rows,
            total_columns: dataset.total_columns,
            missing_values: dataset.missing_values,
            missing_percentage: format!("{:.2}%", dataset.missing_percentage()),
            duplicate_rows: dataset.duplicate_rows,
            numeric_columns: self.classification.count(ColumnKind::Numeric),
            categorical_columns: self.classification.count(ColumnKind::Categorical),
            date_columns: self.classification.count(ColumnKind::Date),
            other_columns: self.classification.count(ColumnKind::Other),
        }
    }

    fn categorical_distributions(&self) -> IndexMap<String, IndexMap<String, usize>> {
        self.summary
            .categorical
            .iter()
            .map(|p| (p.name.clone(), p.counts.to_map()))
            .collect()
    }

    /// Whole table, column by column. Date-classified cells go out as ISO-8601 strings.
    fn raw_data(&self) -> IndexMap<String, Vec<Value>> {
        self.table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let values = if self.classification.kind_at(idx) == ColumnKind::Date {
                    column
                        .cells
                        .iter()
                        .map(|c| {
                            try_parse_date(c).map_or(Value::Null, |d| {
                                Value::String(d.format(ISO_FORMAT).to_string())
                            })
                        })
                        .collect()
                } else {
                    column.cells.iter().map(|c| c.to_json()).collect()
                };
                (column.name.clone(), values)
            })
            .collect()
    }
}
