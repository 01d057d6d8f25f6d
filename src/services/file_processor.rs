use bytes::Bytes;

use crate::error::AppError;
use crate::models::AnalysisReport;
use crate::services::eda;
use crate::services::store::AnalysisStore;
use crate::services::table::{FileFormat, TableProcessor};

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub data: Bytes,
}

/// Filename first, then extension, then content.
pub fn validate(upload: &Upload) -> Result<(&str, FileFormat), AppError> {
    let filename = upload
        .filename
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("No filename provided".to_string()))?;

    let format = FileFormat::from_filename(filename)?;

    if upload.data.is_empty() {
        return Err(AppError::EmptyInput);
    }
    Ok((filename, format))
}

/// Parses, analyzes and stores one upload. Blocking; run it off the async executor.
pub fn process_upload(store: &dyn AnalysisStore, upload: Upload) -> Result<AnalysisReport, AppError> {
    let start = std::time::Instant::now();
    let (filename, format) = validate(&upload)?;
    tracing::info!("Processing {} ({} KB)", filename, upload.data.len() / 1024);

    let table = TableProcessor.parse(&upload.data, format)?;
    let report = eda::analyze(&table)?;
    let stored = store.replace(filename, &report)?;

    tracing::info!(
        "Upload {} stored as analysis {} in {:?}",
        filename,
        stored.id,
        start.elapsed()
    );
    Ok(report)
}
