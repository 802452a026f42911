use growth_sheet::aggregator::SessionAggregator;
use growth_sheet::cell::CellValue;
use growth_sheet::downloader::{to_csv, to_xlsx};
use growth_sheet::error::WarningKind;
use growth_sheet::report::{AnalysisReport, SummaryKind};
use growth_sheet::table::Table;

fn scores(columns: &[(&str, &[f64])]) -> Table {
    Table::from_columns(
        columns
            .iter()
            .map(|(name, values)| (*name, values.iter().map(|v| CellValue::Number(*v)).collect::<Vec<_>>()))
            .collect(),
    )
}

fn three_sessions() -> SessionAggregator {
    let mut agg = SessionAggregator::default();
    agg.ingest(scores(&[("認知", &[2.0, 4.0]), ("運動", &[5.0, 5.0])]), "2015");
    agg.ingest(scores(&[("認知", &[4.0, 4.0]), ("運動", &[5.0, 5.0])]), "2016");
    agg.ingest(scores(&[("認知", &[5.0, 5.0]), ("運動", &[6.0, 6.0])]), "2017");
    agg
}

#[test]
fn empty_run_is_informational() {
    let agg = SessionAggregator::default();
    let report = AnalysisReport::build(&agg, None, SummaryKind::Averages).unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(report.notes.len(), 1);
    assert!(report.snapshot.is_none());
}

#[test]
fn trend_summary_fits_selected_column() {
    let agg = three_sessions();
    let report = AnalysisReport::build(&agg, Some("認知"), SummaryKind::Trend).unwrap();

    assert_eq!(report.session_labels, vec!["2015", "2016", "2017"]);
    assert_eq!(report.selected_column.as_deref(), Some("認知"));
    let values: Vec<f64> = report.series.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![3.0, 4.0, 5.0]);

    let fit = report.trend.as_ref().unwrap();
    assert!((fit.slope - 1.0).abs() < 1e-12);
    assert!((fit.intercept - 3.0).abs() < 1e-12);
    assert!((fit.r_squared - 1.0).abs() < 1e-12);

    assert!(report.warnings.is_empty());
    assert!(report.to_text().contains("trend of 認知"));
}

#[test]
fn missing_column_is_a_warning_not_a_failure() {
    let agg = three_sessions();
    let report = AnalysisReport::build(&agg, Some("記憶"), SummaryKind::Averages).unwrap();
    assert!(report.series.is_empty());
    assert!(report.has_warning(WarningKind::MissingColumn));
    // The rest of the report is still there.
    assert_eq!(report.aggregate_rows.len(), 3);
    assert!(report.snapshot.is_some());
}

#[test]
fn single_session_warns_about_comparisons() {
    let mut agg = SessionAggregator::default();
    agg.ingest(scores(&[("認知", &[3.0])]), "2015");
    let report = AnalysisReport::build(&agg, None, SummaryKind::Trend).unwrap();

    assert!(report.changed_columns.is_empty());
    assert!(report.trend.is_none());
    assert!(report.snapshot.is_none());
    assert!(report.has_warning(WarningKind::InsufficientData));
    assert_eq!(report.series.len(), 1);
}

#[test]
fn changes_summary_lists_moved_columns() {
    let agg = three_sessions();
    let report = AnalysisReport::build(&agg, None, SummaryKind::Changes).unwrap();
    assert!(report.changed_columns.contains("認知"));
    assert!(report.changed_columns.contains("運動"));
    assert_eq!(report.selected_column.as_deref(), Some("認知"));
    assert!(report.to_text().contains("changed since previous session: 認知, 運動"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary"], "changes");
}

#[test]
fn summary_kind_parses_user_input() {
    assert_eq!("Trend".parse::<SummaryKind>().unwrap(), SummaryKind::Trend);
    assert_eq!("".parse::<SummaryKind>().unwrap(), SummaryKind::Averages);
    assert!("pie".parse::<SummaryKind>().is_err());
}

#[test]
fn csv_export_has_one_row_per_session() {
    let agg = three_sessions();
    let csv = to_csv(&agg).unwrap();
    assert_eq!(
        csv,
        "session,認知,運動\n2015,3,5\n2016,4,5\n2017,5,6\n"
    );
}

#[test]
fn xlsx_export_is_a_zip_container() {
    let agg = three_sessions();
    let bytes = to_xlsx(&agg).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn unrequested_column_defaults_to_a_scored_column() {
    let mut agg = SessionAggregator::default();
    for (label, v) in [("2015", 3.0), ("2016", 5.0)] {
        agg.ingest(
            Table::from_columns(vec![
                ("Item", vec!["blocks".into(), "drawing".into()]),
                ("認知", vec![CellValue::Number(v), CellValue::Number(v)]),
            ]),
            label,
        );
    }
    let report = AnalysisReport::build(&agg, None, SummaryKind::Trend).unwrap();
    assert_eq!(report.selected_column.as_deref(), Some("認知"));
    let values: Vec<f64> = report.series.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![3.0, 5.0]);
    assert!((report.trend.as_ref().unwrap().slope - 2.0).abs() < 1e-12);
}
