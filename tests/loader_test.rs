use growth_sheet::aggregator::SessionAggregator;
use growth_sheet::cell::CellValue;
use growth_sheet::config::SheetRange;
use growth_sheet::error::AnalysisError;
use growth_sheet::loader::{from_csv_reader, load_table, load_table_bytes};
use rust_xlsxwriter::Workbook;
use std::io::Write;
use tempfile::TempDir;

const SESSION_2015: &str = "\u{feff}項目,認知, 言語理解 ,運動\n\
積木,3,4,5\n\
模倣,5,,7\n\
描画, 4 ,6,6\n";

// Helper: write an assessment sheet with a title row above the header
fn write_xlsx(dir: &TempDir, name: &str, rows: &[(&str, Option<f64>, Option<f64>)]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "発達検査 結果").unwrap();
    sheet.write_string(1, 0, "項目").unwrap();
    sheet.write_string(1, 1, "認知").unwrap();
    sheet.write_string(1, 2, "言語理解").unwrap();
    for (i, (item, a, b)) in rows.iter().enumerate() {
        let r = (i + 2) as u32;
        sheet.write_string(r, 0, *item).unwrap();
        if let Some(a) = a {
            sheet.write_number(r, 1, *a).unwrap();
        }
        if let Some(b) = b {
            sheet.write_number(r, 2, *b).unwrap();
        }
    }
    workbook.save(&path).unwrap();
    path
}

#[test]
fn csv_header_and_cells_are_cleaned() {
    let table = from_csv_reader(SESSION_2015.as_bytes(), &SheetRange::default()).unwrap();
    assert_eq!(table.columns(), &["項目", "認知", "言語理解", "運動"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows()[1][2], CellValue::Missing);
    assert_eq!(table.rows()[2][1], CellValue::Number(4.0));
}

#[test]
fn csv_file_through_the_aggregator() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("2015.csv");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(SESSION_2015.as_bytes())
        .unwrap();

    let table = load_table(&path, &SheetRange::default()).unwrap();
    let mut agg = SessionAggregator::default();
    agg.ingest(table, "2015");

    let row = agg.aggregate_row(0).unwrap();
    assert_eq!(row.get("認知"), Some(4.0));
    // Blank cell counts as 0: (4 + 0 + 6) / 3
    assert!((row.get("言語理解").unwrap() - 10.0 / 3.0).abs() < 1e-9);
    assert_eq!(row.get("運動"), Some(6.0));
}

#[test]
fn xlsx_with_header_offset() {
    let dir = TempDir::new().unwrap();
    let path = write_xlsx(
        &dir,
        "2016.xlsx",
        &[("積木", Some(6.0), Some(2.0)), ("模倣", Some(8.0), None), ("描画", Some(7.0), Some(4.0))],
    );

    let range = SheetRange {
        header_row: 1,
        data_rows: Some(2),
        data_cols: None,
    };
    let table = load_table(&path, &range).unwrap();
    assert_eq!(table.columns(), &["項目", "認知", "言語理解"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.numeric_mean("認知"), Some(7.0));

    let bytes = std::fs::read(&path).unwrap();
    let from_upload = load_table_bytes("2016.xlsx", bytes, &range).unwrap();
    assert_eq!(from_upload, table);
}

#[test]
fn unsupported_extensions_are_rejected() {
    let err = load_table_bytes("notes.txt", b"hello".to_vec(), &SheetRange::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedFormat(ext) if ext == "txt"));

    let err = load_table_bytes("README", Vec::new(), &SheetRange::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::UnsupportedFormat(_)));
}

#[test]
fn corrupt_workbook_is_a_spreadsheet_error() {
    let err = load_table_bytes("broken.xlsx", b"not a zip".to_vec(), &SheetRange::default())
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Spreadsheet(_)));
}
