use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Complete result of one upload, returned to the client and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub dataset_info: DatasetInfo,
    pub describe: IndexMap<String, ColumnSummary>,
    pub dtypes: IndexMap<String, String>,
    pub null_counts: IndexMap<String, usize>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<String>,
    pub categorical_distributions: IndexMap<String, IndexMap<String, usize>>,
    pub raw_data: IndexMap<String, Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_values: usize,
    pub missing_percentage: String,
    pub duplicate_rows: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
    pub date_columns: usize,
    pub other_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
}

impl Insight {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Categorical(CategoricalSummary),
    Date(DateSummary),
}

// Strict so untagged decoding never mistakes another summary for a numeric one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub count: usize,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: usize,
    pub null_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateSummary {
    pub min: String,
    pub max: String,
    pub unique: usize,
    pub null_count: usize,
}

/// A persisted analysis, as listed by `GET /analyses/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: i64,
    pub filename: String,
    pub upload_date: String,
    pub head_data: Vec<IndexMap<String, Value>>,
    pub describe_data: Value,
    pub dtypes_data: Value,
    pub null_counts: Value,
    pub report: AnalysisReport,
}
