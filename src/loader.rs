use crate::cell::CellValue;
use crate::config::SheetRange;
use crate::error::{AnalysisError, Result};
use crate::table::Table;
use calamine::{Data, Reader};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

lazy_static! {
    static ref DATE_TOKEN_REGEX: Regex =
        Regex::new(r"\d{4}(?:[-_./年]\d{1,2}月?(?:[-_./]\d{1,2}日?)?)?").unwrap();
}

/// Load a session table from a CSV file
///
/// The file is read without assuming a header; the configured `range`
/// decides which row holds column names and how many rows/columns follow.
///
/// # Examples
/// ```no_run
/// use growth_sheet::config::SheetRange;
/// use growth_sheet::loader::from_csv;
///
/// match from_csv("2015.csv", &SheetRange::default()) {
///     Ok(table) => println!("Loaded {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>, range: &SheetRange) -> Result<Table> {
    let file = File::open(filepath)?;
    from_csv_reader(file, range)
}

/// Same as [`from_csv`] for any byte source (uploads, tests).
pub fn from_csv_reader<R: Read>(reader: R, range: &SheetRange) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut grid = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        grid.push(record.iter().map(CellValue::from_text).collect());
    }

    table_from_grid(grid, range)
}

/// Load a session table from the first worksheet of an Excel/ODS workbook
///
/// Integer and float cells become numbers, text is classified the same way
/// as CSV text, error cells count as blank and any other cell type (dates,
/// booleans) is kept as text so it never enters a mean.
///
/// # Examples
/// ```no_run
/// use growth_sheet::config::SheetRange;
/// use growth_sheet::loader::from_excel;
///
/// match from_excel("2016.xlsx", &SheetRange::default()) {
///     Ok(table) => println!("Loaded Excel with {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading Excel: {}", e),
/// }
/// ```
pub fn from_excel(filepath: impl AsRef<Path>, range: &SheetRange) -> Result<Table> {
    let mut workbook = calamine::open_workbook_auto(filepath)?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalysisError::EmptyInput("no sheets found in workbook".to_string()))??;
    table_from_grid(grid_from_range(&sheet), range)
}

/// Same as [`from_excel`] for an uploaded file held in memory.
pub fn from_excel_bytes(bytes: Vec<u8>, range: &SheetRange) -> Result<Table> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalysisError::EmptyInput("no sheets found in workbook".to_string()))??;
    table_from_grid(grid_from_range(&sheet), range)
}

/// Detect file type and load the appropriate format
///
/// # Examples
/// ```no_run
/// use growth_sheet::config::SheetRange;
/// use growth_sheet::loader::load_table;
///
/// let table = load_table("2015.xlsx", &SheetRange::default()).unwrap();
/// ```
pub fn load_table(filepath: impl AsRef<Path>, range: &SheetRange) -> Result<Table> {
    let path = filepath.as_ref();
    log::debug!("loading {}", path.display());
    match extension_of(path).as_deref() {
        Some("csv") => from_csv(path, range),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel(path, range),
        Some(ext) => Err(AnalysisError::UnsupportedFormat(ext.to_string())),
        None => Err(AnalysisError::UnsupportedFormat(format!(
            "{} has no extension",
            path.display()
        ))),
    }
}

/// Dispatches an uploaded file on its original name.
pub fn load_table_bytes(file_name: &str, bytes: Vec<u8>, range: &SheetRange) -> Result<Table> {
    match extension_of(Path::new(file_name)).as_deref() {
        Some("csv") => from_csv_reader(Cursor::new(bytes), range),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("ods") => from_excel_bytes(bytes, range),
        Some(ext) => Err(AnalysisError::UnsupportedFormat(ext.to_string())),
        None => Err(AnalysisError::UnsupportedFormat(format!(
            "{} has no extension",
            file_name
        ))),
    }
}

/// Derives a session label from an uploaded file name.
///
/// A date-like token in the stem wins (`2015.xlsx` gives `2015`,
/// `taro_2016-04-01.xlsx` gives `2016-04-01`); otherwise the whole stem is
/// used.
pub fn label_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    DATE_TOKEN_REGEX
        .find(stem)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| stem.trim().to_string())
}

/// Spreadsheet-style column name (1 = A, 27 = AA), used for blank headers.
pub fn column_letter(col: usize) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

// calamine ranges start at the first used cell; rebuild the grid from A1 so
// that `header_row` counts from the top of the sheet.
fn grid_from_range(sheet: &calamine::Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((end_row, end_col)) = sheet.end() else {
        return Vec::new();
    };
    (0..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| sheet.get_value((r, c)).map(cell_from_data).unwrap_or(CellValue::Missing))
                .collect()
        })
        .collect()
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from_text(s),
        Data::Empty | Data::Error(_) => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

fn table_from_grid(grid: Vec<Vec<CellValue>>, range: &SheetRange) -> Result<Table> {
    if grid.len() <= range.header_row {
        return Err(AnalysisError::EmptyInput(format!(
            "header row {} is beyond the end of the sheet ({} rows)",
            range.header_row + 1,
            grid.len()
        )));
    }

    let max_width = grid[range.header_row..]
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    let width = range
        .data_cols
        .map(|cols| cols.min(max_width))
        .unwrap_or(max_width);

    let mut rows = grid.into_iter().skip(range.header_row);
    let header = rows.next().unwrap_or_default();
    let columns = (0..width)
        .map(|c| match header.get(c) {
            Some(cell) if !cell.is_missing() => cell
                .display()
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string(),
            _ => column_letter(c + 1),
        })
        .collect();

    let data = rows
        .take(range.data_rows.unwrap_or(usize::MAX))
        .map(|mut row| {
            row.truncate(width);
            row
        })
        .collect();

    Ok(Table::new(columns, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_come_from_date_tokens() {
        assert_eq!(label_from_file_name("2015.xlsx"), "2015");
        assert_eq!(label_from_file_name("taro_2016-04-01.xlsx"), "2016-04-01");
        assert_eq!(label_from_file_name("2017年3月.csv"), "2017年3月");
        assert_eq!(label_from_file_name("baseline.csv"), "baseline");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn grid_respects_header_offset_and_limits() {
        let grid = vec![
            vec!["発達検査".into()],
            vec!["項目".into(), "認知".into(), CellValue::Missing, "備考".into()],
            vec!["a".into(), 1.0.into(), 2.0.into(), "x".into()],
            vec!["b".into(), 3.0.into(), 4.0.into(), "y".into()],
            vec!["c".into(), 5.0.into(), 6.0.into(), "z".into()],
        ];
        let range = SheetRange {
            header_row: 1,
            data_rows: Some(2),
            data_cols: Some(3),
        };
        let table = table_from_grid(grid, &range).unwrap();
        assert_eq!(table.columns(), &["項目", "認知", "C"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.numeric_mean("C"), Some(3.0));
    }

    #[test]
    fn header_past_the_end_is_empty_input() {
        let range = SheetRange {
            header_row: 4,
            ..SheetRange::default()
        };
        let err = table_from_grid(vec![vec!["a".into()]], &range).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput(_)));
    }
}
