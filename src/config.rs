use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Portion of the first worksheet that holds the assessment table.
///
/// `header_row` is the 0-based row holding column names; data starts on the
/// next row. `data_rows` and `data_cols` cap how much is read (`None` reads to
/// the end of the used range). Column A is always the category column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetRange {
    pub header_row: usize,
    pub data_rows: Option<usize>,
    pub data_cols: Option<usize>,
}

impl Default for SheetRange {
    fn default() -> Self {
        Self {
            header_row: 0,
            data_rows: None,
            data_cols: None,
        }
    }
}

/// Ordering of the common-column set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrder {
    /// Lexicographic, independent of ingestion order.
    #[default]
    Sorted,
    /// The order columns appear in the first ingested session.
    FirstSession,
}

/// What happens to blank cells at ingestion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Blank cells become 0 and count toward the mean.
    #[default]
    Zero,
    /// Blank cells stay missing and are left out of the mean.
    Exclude,
}

/// Deployment configuration for one analysis run.
///
/// # Examples
/// ```
/// use growth_sheet::config::{AnalysisConfig, ColumnOrder};
///
/// let config: AnalysisConfig = serde_json::from_str(
///     r#"{ "allowed_columns": ["認知", "言語理解"], "column_order": "first_session" }"#,
/// ).unwrap();
/// assert_eq!(config.column_order, ColumnOrder::FirstSession);
/// assert_eq!(config.upload_slots, 5);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub range: SheetRange,
    /// Recognized category names. Empty means every column is accepted.
    pub allowed_columns: Vec<String>,
    pub column_order: ColumnOrder,
    pub missing_policy: MissingPolicy,
    /// Label used for sessions submitted without one; `{n}` is the 1-based
    /// position of the session.
    pub fallback_label: String,
    /// Number of file/date slots offered by the upload form.
    pub upload_slots: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            range: SheetRange::default(),
            allowed_columns: Vec::new(),
            column_order: ColumnOrder::default(),
            missing_policy: MissingPolicy::default(),
            fallback_label: "{n}回目".to_string(),
            upload_slots: 5,
        }
    }
}

impl AnalysisConfig {
    /// Loads a JSON configuration file; absent keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: AnalysisConfig = serde_json::from_str(&raw)?;
        log::debug!(
            "loaded configuration from {}: {:?}",
            path.as_ref().display(),
            config
        );
        Ok(config)
    }

    pub fn fallback_label_for(&self, position: usize) -> String {
        self.fallback_label.replace("{n}", &position.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "range": {{ "header_row": 2, "data_rows": 12 }}, "missing_policy": "exclude" }}"#
        )
        .unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.range.header_row, 2);
        assert_eq!(config.range.data_rows, Some(12));
        assert_eq!(config.range.data_cols, None);
        assert_eq!(config.missing_policy, MissingPolicy::Exclude);
        assert_eq!(config.column_order, ColumnOrder::Sorted);
        assert_eq!(config.fallback_label_for(3), "3回目");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = AnalysisConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::Config(_)));
    }
}
