use std::fmt::Display;
use std::io::{Cursor, Read, Seek};

use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};

use super::types::{Cell, Column, Table};
use super::utils::*;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// Picks the format from the extension after the last `.`, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, AppError> {
        let extension = filename
            .rfind('.')
            .map(|idx| filename[idx..].to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            ".csv" => Ok(FileFormat::Csv),
            ".xlsx" => Ok(FileFormat::Xlsx),
            ".xls" => Ok(FileFormat::Xls),
            _ => Err(AppError::UnsupportedFormat(
                "File must be a CSV or Excel file (.xlsx, .xls)".to_string(),
            )),
        }
    }
}

pub struct TableProcessor;

impl TableProcessor {
    pub fn parse(&self, data: &[u8], format: FileFormat) -> Result<Table, AppError> {
        if data.is_empty() {
            return Err(AppError::EmptyInput);
        }

        let start = std::time::Instant::now();
        let table = match format {
            FileFormat::Csv => self.parse_csv(data)?,
            FileFormat::Xlsx => {
                let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data)).map_err(|e| {
                    tracing::error!("Failed to open Excel file: {}", e);
                    AppError::ParseFailure(format!("Failed to open Excel file: {}", e))
                })?;
                self.parse_workbook(workbook)?
            }
            FileFormat::Xls => {
                let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(data)).map_err(|e| {
                    tracing::error!("Failed to open Excel file: {}", e);
                    AppError::ParseFailure(format!("Failed to open Excel file: {}", e))
                })?;
                self.parse_workbook(workbook)?
            }
        };

        tracing::info!(
            "Parsed {:?} file: {} rows x {} columns in {:?}",
            format,
            table.row_count(),
            table.column_count(),
            start.elapsed()
        );
        Ok(table)
    }

    fn parse_csv(&self, data: &[u8]) -> Result<Table, AppError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| AppError::ParseFailure(format!("File is not valid UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseFailure(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .enumerate()
            .map(|(idx, name)| clean_column_name(name, idx))
            .collect();

        if headers.is_empty() {
            return Err(AppError::ParseFailure("No columns to parse from file".to_string()));
        }

        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| AppError::ParseFailure(format!("Failed to read CSV: {}", e)))?;
            if record.len() > headers.len() {
                return Err(AppError::ParseFailure(format!(
                    "Expected {} fields in line {}, saw {}",
                    headers.len(),
                    line + 2,
                    record.len()
                )));
            }
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(record.get(idx).map_or(Cell::Missing, text_cell));
            }
        }

        let columns = headers
            .into_iter()
            .zip(columns)
            .map(|(name, cells)| Column {
                name,
                cells: infer_numeric(cells),
            })
            .collect();

        Table::from_columns(columns)
    }

    fn parse_workbook<RS, R>(&self, mut workbook: R) -> Result<Table, AppError>
    where
        RS: Read + Seek,
        R: Reader<RS>,
        R::Error: Display,
    {
        let sheet_names = workbook.sheet_names();
        tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

        let sheet_name = sheet_names
            .first()
            .ok_or_else(|| AppError::ParseFailure("No sheets found in workbook".to_string()))?;

        let range = workbook.worksheet_range(sheet_name).map_err(|e| {
            tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
            AppError::ParseFailure(format!("Failed to read worksheet {}: {}", sheet_name, e))
        })?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| AppError::ParseFailure("No columns to parse from file".to_string()))?
            .iter()
            .enumerate()
            .map(|(idx, cell)| clean_column_name(&cell.to_string(), idx))
            .collect();

        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
        for row in rows {
            for (idx, column) in columns.iter_mut().enumerate() {
                column.push(row.get(idx).map_or(Cell::Missing, data_to_cell));
            }
        }

        let columns = headers
            .into_iter()
            .zip(columns)
            .map(|(name, cells)| Column { name, cells })
            .collect();

        Table::from_columns(columns)
    }
}

/// Delimited text carries no types, so a column whose every value reads as a
/// number is stored as numbers, the way tabular readers infer column dtypes.
fn infer_numeric(cells: Vec<Cell>) -> Vec<Cell> {
    let all_numeric = cells
        .iter()
        .filter(|c| !c.is_missing())
        .all(|c| try_parse_numeric(c).is_some());

    if !all_numeric {
        return cells;
    }
    cells
        .into_iter()
        .map(|c| try_parse_numeric(&c).map_or(Cell::Missing, Cell::Number))
        .collect()
}

fn data_to_cell(value: &Data) -> Cell {
    match value {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::from(*f),
        Data::String(s) => text_cell(s),
        Data::Bool(b) => Cell::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(d) => excel_serial_to_datetime(d.as_f64()).map_or(Cell::Missing, Cell::Date),
        Data::DateTimeIso(s) => parse_date_str(s).map_or_else(|| text_cell(s), Cell::Date),
        Data::DurationIso(s) => text_cell(s),
        Data::Error(_) | Data::Empty => Cell::Missing,
    }
}
