use crate::cell::CellValue;
use crate::config::MissingPolicy;
use serde::{Deserialize, Serialize};

/// One parsed worksheet: a header row and the data rows beneath it.
///
/// Rows are stored positionally, aligned with `columns`; short rows are
/// padded with `Missing` on construction. The first column is the
/// category/item name column.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Missing);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Builds a table from column-major data, handy for fixtures:
    /// every column must have the same length.
    ///
    /// ```
    /// use growth_sheet::table::Table;
    ///
    /// let t = Table::from_columns(vec![("言語理解", vec![3.0.into(), 5.0.into()])]);
    /// assert_eq!(t.row_count(), 2);
    /// ```
    pub fn from_columns(columns: Vec<(&str, Vec<CellValue>)>) -> Self {
        let height = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut rows = vec![Vec::with_capacity(columns.len()); height];
        for (_, values) in &columns {
            for (r, row) in rows.iter_mut().enumerate() {
                row.push(values.get(r).cloned().unwrap_or(CellValue::Missing));
            }
        }
        let names = columns.iter().map(|(name, _)| name.to_string()).collect();
        Table::new(names, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a CellValue> + 'a {
        let index = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|i| row.get(i)))
    }

    /// Arithmetic mean of the numeric cells of a column.
    ///
    /// Text and missing cells are skipped; `None` when the column is absent
    /// or has no numeric cell at all.
    pub fn numeric_mean(&self, name: &str) -> Option<f64> {
        let (sum, count) = self
            .column_values(name)
            .filter_map(CellValue::as_number)
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn is_numeric_column(&self, name: &str) -> bool {
        self.column_values(name).any(|c| c.as_number().is_some())
    }

    /// Cleans a freshly parsed table before it is stored as a session.
    ///
    /// Column names and text cells are trimmed, rows with no content at all
    /// are dropped, then blank cells are resolved according to `policy`.
    ///
    /// Zero-filling only touches columns holding at least one number, so a
    /// blank item name never turns the category column numeric.
    pub fn normalized(self, policy: MissingPolicy) -> Table {
        let columns: Vec<String> = self
            .columns
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();
        let rows: Vec<Vec<CellValue>> = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::trimmed).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_missing()))
            .collect();

        let rows = match policy {
            MissingPolicy::Exclude => rows,
            MissingPolicy::Zero => {
                let numeric: Vec<bool> = (0..columns.len())
                    .map(|i| {
                        rows.iter()
                            .any(|row| row.get(i).and_then(CellValue::as_number).is_some())
                    })
                    .collect();
                rows.into_iter()
                    .map(|row| {
                        row.into_iter()
                            .zip(&numeric)
                            .map(|(c, &fill)| {
                                if fill && c.is_missing() {
                                    CellValue::Number(0.0)
                                } else {
                                    c
                                }
                            })
                            .collect()
                    })
                    .collect()
            }
        };
        Table { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec![" 項目 ".to_string(), "認知 ".to_string()],
            vec![
                vec![" 積木 ".into(), 4.0.into()],
                vec!["模倣".into(), CellValue::Missing],
                vec![CellValue::Missing, CellValue::Missing],
                vec!["描画".into(), 6.0.into()],
            ],
        )
    }

    #[test]
    fn normalization_trims_and_zero_fills() {
        let t = sample().normalized(MissingPolicy::Zero);
        assert_eq!(t.columns(), &["項目".to_string(), "認知".to_string()]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.rows()[0][0], CellValue::Text("積木".to_string()));
        assert_eq!(t.rows()[1][1], CellValue::Number(0.0));

        let mean = t.numeric_mean("認知").unwrap();
        assert!((mean - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn exclude_policy_keeps_blanks_out_of_the_mean() {
        let t = sample().normalized(MissingPolicy::Exclude);
        assert_eq!(t.numeric_mean("認知"), Some(5.0));
    }

    #[test]
    fn text_columns_have_no_mean() {
        let t = sample().normalized(MissingPolicy::Zero);
        assert_eq!(t.numeric_mean("項目"), None);
        assert!(!t.is_numeric_column("項目"));
        assert_eq!(t.numeric_mean("存在しない"), None);
    }

    #[test]
    fn blank_item_names_stay_blank() {
        let t = Table::new(
            vec!["項目".to_string(), "認知".to_string()],
            vec![
                vec!["積木".into(), 4.0.into()],
                vec![CellValue::Missing, 6.0.into()],
            ],
        )
        .normalized(MissingPolicy::Zero);
        assert_eq!(t.rows()[1][0], CellValue::Missing);
        assert!(!t.is_numeric_column("項目"));
        assert_eq!(t.numeric_mean("認知"), Some(5.0));
    }

    #[test]
    fn short_rows_are_padded() {
        let t = Table::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0.into()]],
        );
        assert_eq!(t.rows()[0], vec![CellValue::Number(1.0), CellValue::Missing]);
    }
}
