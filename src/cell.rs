use serde::{Deserialize, Serialize};

/// A single spreadsheet cell as seen by the aggregator.
///
/// Parsers map every cell type they know onto one of these three shapes;
/// booleans, dates and error cells become `Text` so they never enter a mean.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Interprets raw text from a delimited file.
    ///
    /// Blank (or whitespace-only) text is `Missing`, anything that parses as a
    /// float is a `Number`, everything else is trimmed `Text`.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Trims string content; numbers and missing values pass through.
    pub fn trimmed(self) -> Self {
        match self {
            CellValue::Text(s) => {
                let t = s.trim();
                if t.len() == s.len() {
                    CellValue::Text(s)
                } else {
                    CellValue::Text(t.to_string())
                }
            }
            other => other,
        }
    }

    /// Text shown in exports and logs.
    pub fn display(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Missing => String::new(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}
