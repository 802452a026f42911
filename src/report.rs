//! Assembles everything a page or a batch run shows for one set of sessions.
//!
//! Data-quality problems never abort a report: they are recorded as
//! [`Warning`]s and the affected section is left empty.

use crate::aggregator::{AggregateRow, ColumnOverview, RadarSnapshot, SeriesPoint, SessionAggregator};
use crate::error::{AnalysisError, Result, Warning, WarningKind};
use crate::trend::{TrendFit, fit_trend};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::str::FromStr;

/// Which summary the user asked to see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Per-session means of every common column.
    #[default]
    Averages,
    /// Columns that moved between sessions.
    Changes,
    /// Least-squares trend of the selected column.
    Trend,
}

impl FromStr for SummaryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "averages" | "average" | "mean" => Ok(SummaryKind::Averages),
            "changes" | "changed" => Ok(SummaryKind::Changes),
            "trend" | "regression" => Ok(SummaryKind::Trend),
            other => Err(format!("unknown summary: {}", other)),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisReport {
    pub summary: SummaryKind,
    pub session_labels: Vec<String>,
    pub common_columns: Vec<String>,
    pub aggregate_rows: Vec<AggregateRow>,
    pub changed_columns: BTreeSet<String>,
    pub spread_columns: BTreeSet<String>,
    pub overview: Vec<ColumnOverview>,
    pub selected_column: Option<String>,
    pub series: Vec<SeriesPoint>,
    pub snapshot: Option<RadarSnapshot>,
    pub trend: Option<TrendFit>,
    pub warnings: Vec<Warning>,
    pub notes: Vec<String>,
}

impl AnalysisReport {
    /// Builds the report for the current aggregator state.
    ///
    /// `column` selects the series for the line chart; when `None`, the first
    /// common column is used.
    pub fn build(
        aggregator: &SessionAggregator,
        column: Option<&str>,
        summary: SummaryKind,
    ) -> Result<AnalysisReport> {
        let mut report = AnalysisReport {
            summary,
            session_labels: aggregator.labels().iter().map(|l| l.to_string()).collect(),
            common_columns: aggregator.common_columns(),
            ..AnalysisReport::default()
        };

        if aggregator.session_count() == 0 {
            report.notes.push("no sessions uploaded yet".to_string());
            return Ok(report);
        }
        if report.common_columns.is_empty() {
            report
                .notes
                .push("the uploaded files have no columns in common".to_string());
        }

        for index in 0..aggregator.session_count() {
            report.aggregate_rows.push(aggregator.aggregate_row(index)?);
        }
        report.overview = aggregator.column_overview();

        if aggregator.session_count() < 2 {
            report.record(&AnalysisError::InsufficientData {
                what: "sessions to compare",
                needed: 2,
                found: aggregator.session_count(),
            });
        } else {
            report.changed_columns = aggregator.changed_columns();
            report.spread_columns = aggregator.spread_columns();
        }

        let selected = column
            .map(str::to_string)
            .or_else(|| aggregator.default_column());
        if let Some(selected) = selected {
            match aggregator.series_for(&selected) {
                Ok(series) => {
                    if summary == SummaryKind::Trend {
                        match fit_trend(&series) {
                            Ok(fit) => report.trend = Some(fit),
                            Err(e) => report.recover(e)?,
                        }
                    }
                    report.series = series;
                }
                Err(e) => report.recover(e)?,
            }
            report.selected_column = Some(selected);
        }

        match aggregator.latest_snapshot() {
            Ok(snapshot) => report.snapshot = Some(snapshot),
            Err(e) => report.recover(e)?,
        }

        Ok(report)
    }

    fn record(&mut self, err: &AnalysisError) {
        log::warn!("{}", err);
        self.warnings.push(Warning::from(err));
    }

    fn recover(&mut self, err: AnalysisError) -> Result<()> {
        if err.is_recoverable() {
            self.record(&err);
            Ok(())
        } else {
            Err(err)
        }
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Plain-text rendering of the selected summary for terminals.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "sessions: {}", self.session_labels.join(", "));
        let _ = writeln!(out, "common columns: {}", self.common_columns.join(", "));

        match self.summary {
            SummaryKind::Averages => {
                for row in &self.aggregate_rows {
                    let values: Vec<String> = row
                        .values
                        .iter()
                        .map(|(c, v)| format!("{}={:.2}", c, v))
                        .collect();
                    let _ = writeln!(out, "  {}: {}", row.label, values.join(" "));
                }
            }
            SummaryKind::Changes => {
                let changed: Vec<&str> = self.changed_columns.iter().map(String::as_str).collect();
                let _ = writeln!(out, "changed since previous session: {}", changed.join(", "));
                for o in &self.overview {
                    let _ = writeln!(
                        out,
                        "  {}: {:.2} -> {:.2} ({:+.2}, range {:.2}..{:.2})",
                        o.column, o.first, o.last, o.delta, o.min, o.max
                    );
                }
            }
            SummaryKind::Trend => {
                if let (Some(column), Some(fit)) = (&self.selected_column, &self.trend) {
                    let _ = writeln!(
                        out,
                        "trend of {}: y = {:.3}x + {:.3}, MSE {:.3}, R² {:.3}",
                        column, fit.slope, fit.intercept, fit.mean_squared_error, fit.r_squared
                    );
                }
            }
        }

        if let Some(column) = &self.selected_column {
            let points: Vec<String> = self
                .series
                .iter()
                .map(|p| format!("{}={:.2}", p.label, p.value))
                .collect();
            let _ = writeln!(out, "series {}: {}", column, points.join(" "));
        }
        for note in &self.notes {
            let _ = writeln!(out, "note: {}", note);
        }
        for warning in &self.warnings {
            let _ = writeln!(out, "warning: {}", warning);
        }
        out
    }
}
