pub mod classifier;
pub mod insights;
pub mod recommendations;
pub mod report;
pub mod stats;
pub mod summarizer;

use std::time::Instant;

use crate::error::AppError;
use crate::models::AnalysisReport;
use crate::services::table::Table;

use classifier::ColumnClassification;
use insights::InsightEngine;
use report::ReportBuilder;

pub fn analyze(table: &Table) -> Result<AnalysisReport, AppError> {
    let start = Instant::now();
    tracing::info!(
        "Analyzing table with {} rows and {} columns",
        table.row_count(),
        table.column_count()
    );

    let classification = ColumnClassification::classify(table);
    let summary = summarizer::summarize(table, &classification)?;
    tracing::debug!("Summaries computed in {:?}", start.elapsed());

    let outcome = InsightEngine::new(&summary).run();
    let recommendations = recommendations::recommend(&summary.dataset, outcome.strong_correlations);
    tracing::debug!(
        "Generated {} insights and {} recommendations",
        outcome.insights.len(),
        recommendations.len()
    );

    let report = ReportBuilder::new(table, &classification, &summary).build(outcome, recommendations);
    tracing::info!("Analysis completed in {:?}", start.elapsed());
    Ok(report)
}
