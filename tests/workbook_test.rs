use chrono::NaiveDate;

use sheet_insights::services::eda;
use sheet_insights::services::table::{Cell, FileFormat, TableProcessor};

const PEOPLE_XLSX: &[u8] = include_bytes!("fixtures/people.xlsx");

fn day(d: u32, h: u32) -> Cell {
    Cell::Date(
        NaiveDate::from_ymd_opt(2023, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap(),
    )
}

#[test]
fn test_xlsx_first_sheet_cells() {
    let table = TableProcessor.parse(PEOPLE_XLSX, FileFormat::Xlsx).unwrap();

    let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["age", "Unnamed: 1", "joined", "flag", "city"]);
    assert_eq!(table.row_count(), 3);

    assert_eq!(
        table.column(0).cells,
        vec![Cell::Number(20.0), Cell::Number(21.5), Cell::Missing]
    );
    // whitespace string and #DIV/0! both read as missing
    assert_eq!(
        table.column(1).cells,
        vec![Cell::Text("x".into()), Cell::Missing, Cell::Missing]
    );
    assert_eq!(table.column(2).cells, vec![day(5, 0), day(6, 0), day(7, 12)]);
    assert_eq!(
        table.column(3).cells,
        vec![
            Cell::Text("True".into()),
            Cell::Text("False".into()),
            Cell::Text("True".into())
        ]
    );
    assert_eq!(
        table.column(4).cells,
        vec![
            Cell::Text("NY".into()),
            Cell::Text("NY".into()),
            Cell::Text("LA".into())
        ]
    );
}

#[test]
fn test_xlsx_report_renders_dates_as_iso() {
    let table = TableProcessor.parse(PEOPLE_XLSX, FileFormat::Xlsx).unwrap();
    let report = eda::analyze(&table).unwrap();

    assert_eq!(report.dataset_info.total_rows, 3);
    assert_eq!(report.dtypes["joined"], "datetime64[ns]");
    assert_eq!(report.null_counts["age"], 1);
    assert_eq!(report.null_counts["Unnamed: 1"], 2);
    assert_eq!(report.raw_data["joined"][2], "2023-01-07T12:00:00");
}
