use crate::aggregator::SessionAggregator;
use crate::error::{AnalysisError, Result};

/// Export the per-session averages as CSV
///
/// The first column holds session labels in ingestion order, followed by one
/// column per common column.
///
/// # Examples
/// ```
/// use growth_sheet::aggregator::SessionAggregator;
/// use growth_sheet::cell::CellValue;
/// use growth_sheet::downloader::to_csv;
/// use growth_sheet::table::Table;
///
/// let mut agg = SessionAggregator::default();
/// agg.ingest(Table::from_columns(vec![("認知", vec![CellValue::Number(4.0)])]), "2015");
/// assert_eq!(to_csv(&agg).unwrap(), "session,認知\n2015,4\n");
/// ```
pub fn to_csv(aggregator: &SessionAggregator) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let columns = aggregator.common_columns();
    let mut header = vec!["session".to_string()];
    header.extend(columns.iter().cloned());
    writer.write_record(&header)?;

    for row in aggregator.aggregate_rows() {
        let mut record = vec![row.label.clone()];
        record.extend(row.values.iter().map(|(_, v)| v.to_string()));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AnalysisError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| AnalysisError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Export the per-session averages as an XLSX workbook
///
/// Same layout as [`to_csv`], with numeric cells written as numbers.
pub fn to_xlsx(aggregator: &SessionAggregator) -> Result<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("averages")?;

    worksheet.write_string(0, 0, "session")?;
    for (c, column) in aggregator.common_columns().iter().enumerate() {
        worksheet.write_string(0, (c + 1) as u16, column)?;
    }

    for (r, row) in aggregator.aggregate_rows().iter().enumerate() {
        let excel_row = (r + 1) as u32;
        worksheet.write_string(excel_row, 0, &row.label)?;
        for (c, (_, value)) in row.values.iter().enumerate() {
            worksheet.write_number(excel_row, (c + 1) as u16, *value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
