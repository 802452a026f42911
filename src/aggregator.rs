//! Multi-session column-aligned aggregation.
//!
//! A [`SessionAggregator`] lives for one analysis run. Tables are ingested in
//! upload order, each becoming a [`Session`]; ingestion order is the time axis
//! and is never re-sorted by label. Queries are recomputed from the stored
//! sessions, so any result is a snapshot valid until the next `ingest`.

use crate::config::{AnalysisConfig, ColumnOrder};
use crate::error::{AnalysisError, Result};
use crate::table::Table;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// One ingested measurement point.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub label: String,
    pub table: Table,
}

/// Per-session means of the common columns, in common-column order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateRow {
    pub label: String,
    pub values: Vec<(String, f64)>,
}

impl AggregateRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| *v)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Latest session's means as two aligned, open sequences (the renderer
/// closes the polygon).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RadarSnapshot {
    pub session_label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// First/last reading of a common column over the whole run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnOverview {
    pub column: String,
    pub first: f64,
    pub last: f64,
    pub delta: f64,
    pub min: f64,
    pub max: f64,
}

pub struct SessionAggregator {
    config: AnalysisConfig,
    sessions: Vec<Session>,
    // Intersection over all sessions, in `config.column_order`, before the
    // allow-list is applied.
    common: Vec<String>,
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl SessionAggregator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            common: Vec::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.sessions.iter().map(|s| s.label.as_str()).collect()
    }

    /// Normalizes `table` and appends it as the next session.
    ///
    /// An empty label is replaced by the configured positional fallback. A
    /// table with no usable rows after normalization is skipped.
    pub fn ingest(&mut self, table: Table, label: &str) {
        let table = table.normalized(self.config.missing_policy);
        let position = self.sessions.len() + 1;
        if table.is_empty() {
            log::debug!("skipping empty table for session {}", position);
            return;
        }

        let label = match label.trim() {
            "" => self.config.fallback_label_for(position),
            l => l.to_string(),
        };
        log::info!(
            "ingested session {} ({}): {} rows, {} columns",
            position,
            label,
            table.row_count(),
            table.columns().len()
        );

        self.sessions.push(Session { label, table });
        self.recompute_common();
    }

    fn recompute_common(&mut self) {
        let Some(first) = self.sessions.first() else {
            self.common.clear();
            return;
        };

        let mut seen = HashSet::new();
        let mut common: Vec<String> = first
            .table
            .columns()
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect();
        for session in &self.sessions[1..] {
            common.retain(|c| session.table.has_column(c));
        }
        if self.config.column_order == ColumnOrder::Sorted {
            common.sort();
        }

        if common.len() < self.common.len() {
            log::debug!(
                "common columns shrank from {} to {}",
                self.common.len(),
                common.len()
            );
        }
        self.common = common;
    }

    /// Columns present in every ingested session, restricted to the
    /// configured allow-list when one is set.
    pub fn common_columns(&self) -> Vec<String> {
        let allowed = &self.config.allowed_columns;
        self.common
            .iter()
            .filter(|c| allowed.is_empty() || allowed.contains(*c))
            .cloned()
            .collect()
    }

    /// First common column with a number in some session; charts fall back
    /// to it when no column is requested.
    pub fn default_column(&self) -> Option<String> {
        self.common_columns()
            .into_iter()
            .find(|c| self.sessions.iter().any(|s| s.table.is_numeric_column(c)))
    }

    pub fn is_common_column(&self, column: &str) -> bool {
        self.common_columns().iter().any(|c| c == column)
    }

    /// Mean of every common column for one session.
    ///
    /// Columns without any numeric cell in that session report 0.
    pub fn aggregate_row(&self, session_index: usize) -> Result<AggregateRow> {
        let session = self.session(session_index)?;
        let values = self
            .common_columns()
            .into_iter()
            .map(|column| {
                let mean = session.table.numeric_mean(&column).unwrap_or(0.0);
                (column, mean)
            })
            .collect();
        Ok(AggregateRow {
            label: session.label.clone(),
            values,
        })
    }

    pub fn aggregate_rows(&self) -> Vec<AggregateRow> {
        (0..self.sessions.len())
            .filter_map(|i| self.aggregate_row(i).ok())
            .collect()
    }

    fn session(&self, index: usize) -> Result<&Session> {
        self.sessions.get(index).ok_or(AnalysisError::IndexOutOfRange {
            index,
            len: self.sessions.len(),
        })
    }

    /// Common columns whose mean differs between the last two sessions.
    pub fn changed_columns(&self) -> BTreeSet<String> {
        let n = self.sessions.len();
        if n < 2 {
            return BTreeSet::new();
        }
        let (Ok(previous), Ok(latest)) = (self.aggregate_row(n - 2), self.aggregate_row(n - 1))
        else {
            return BTreeSet::new();
        };

        previous
            .values
            .into_iter()
            .zip(latest.values)
            .filter(|((_, before), (_, after))| before != after)
            .map(|((column, _), _)| column)
            .collect()
    }

    /// Common columns whose mean is not constant across all sessions
    /// (global min differs from global max).
    pub fn spread_columns(&self) -> BTreeSet<String> {
        if self.sessions.len() < 2 {
            return BTreeSet::new();
        }
        self.column_overview()
            .into_iter()
            .filter(|o| o.min != o.max)
            .map(|o| o.column)
            .collect()
    }

    /// One (label, mean) pair per session, in ingestion order.
    pub fn series_for(&self, column: &str) -> Result<Vec<SeriesPoint>> {
        if !self.is_common_column(column) {
            return Err(AnalysisError::MissingColumn {
                column: column.to_string(),
            });
        }
        Ok(self
            .sessions
            .iter()
            .map(|s| SeriesPoint {
                label: s.label.clone(),
                value: s.table.numeric_mean(column).unwrap_or(0.0),
            })
            .collect())
    }

    /// The most recent session's means over its numeric common columns.
    pub fn latest_snapshot(&self) -> Result<RadarSnapshot> {
        let Some(latest) = self.sessions.last() else {
            return Err(AnalysisError::InsufficientData {
                what: "numeric columns for a radar chart",
                needed: 2,
                found: 0,
            });
        };

        let (labels, values): (Vec<String>, Vec<f64>) = self
            .common_columns()
            .into_iter()
            .filter_map(|c| latest.table.numeric_mean(&c).map(|mean| (c, mean)))
            .unzip();

        if labels.len() < 2 {
            return Err(AnalysisError::InsufficientData {
                what: "numeric columns for a radar chart",
                needed: 2,
                found: labels.len(),
            });
        }
        Ok(RadarSnapshot {
            session_label: latest.label.clone(),
            labels,
            values,
        })
    }

    /// First, last and range of every common column across the run.
    pub fn column_overview(&self) -> Vec<ColumnOverview> {
        if self.sessions.is_empty() {
            return Vec::new();
        }
        self.common_columns()
            .into_iter()
            .filter_map(|column| {
                let series = self.series_for(&column).ok()?;
                let first = series.first()?.value;
                let last = series.last()?.value;
                let (min, max) = series
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p.value), hi.max(p.value))
                    });
                Some(ColumnOverview {
                    column,
                    first,
                    last,
                    delta: last - first,
                    min,
                    max,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    fn numbers(values: &[f64]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Number(*v)).collect()
    }

    #[test]
    fn duplicate_headers_count_once() {
        let table = Table::new(
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
            vec![numbers(&[1.0, 2.0, 3.0])],
        );
        let mut agg = SessionAggregator::default();
        agg.ingest(table, "x");
        assert_eq!(agg.common_columns(), vec!["a".to_string(), "b".to_string()]);
        // The first "a" wins lookups.
        assert_eq!(agg.aggregate_row(0).unwrap().get("a"), Some(1.0));
    }

    #[test]
    fn first_session_order_is_kept_when_configured() {
        let config = AnalysisConfig {
            column_order: ColumnOrder::FirstSession,
            ..AnalysisConfig::default()
        };
        let mut agg = SessionAggregator::new(config);
        agg.ingest(
            Table::from_columns(vec![("運動", numbers(&[1.0])), ("認知", numbers(&[2.0]))]),
            "",
        );
        assert_eq!(agg.common_columns(), vec!["運動", "認知"]);
        assert_eq!(agg.labels(), vec!["1回目"]);
    }
}
