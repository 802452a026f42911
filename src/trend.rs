use crate::aggregator::SeriesPoint;
use crate::error::{AnalysisError, Result};
use serde::Serialize;

/// Least-squares line over a session series, x = 0-based session index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub mean_squared_error: f64,
    pub r_squared: f64,
}

impl TrendFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Fitted values at every session index, for overlaying on a line chart.
    pub fn fitted(&self, points: usize) -> Vec<f64> {
        (0..points).map(|i| self.predict(i as f64)).collect()
    }
}

/// Ordinary least squares on (session index, mean) pairs.
///
/// R² follows the usual convention for a flat series: 1.0 when the line
/// reproduces it exactly, 0.0 otherwise.
///
/// # Examples
/// ```
/// use growth_sheet::aggregator::SeriesPoint;
/// use growth_sheet::trend::fit_trend;
///
/// let series: Vec<SeriesPoint> = [4.0, 7.0]
///     .iter()
///     .map(|v| SeriesPoint { label: String::new(), value: *v })
///     .collect();
/// let fit = fit_trend(&series).unwrap();
/// assert_eq!(fit.slope, 3.0);
/// assert_eq!(fit.intercept, 4.0);
/// ```
pub fn fit_trend(series: &[SeriesPoint]) -> Result<TrendFit> {
    let n = series.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData {
            what: "sessions for a trend line",
            needed: 2,
            found: n,
        });
    }

    let count = n as f64;
    let mean_x = (0..n).map(|i| i as f64).sum::<f64>() / count;
    let mean_y = series.iter().map(|p| p.value).sum::<f64>() / count;

    let (sxy, sxx) = series
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, p)| {
            let dx = i as f64 - mean_x;
            (sxy + dx * (p.value - mean_y), sxx + dx * dx)
        });
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let (ss_res, ss_tot) = series
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(res, tot), (i, p)| {
            let predicted = slope * i as f64 + intercept;
            (
                res + (p.value - predicted).powi(2),
                tot + (p.value - mean_y).powi(2),
            )
        });

    let r_squared = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };

    log::debug!(
        "trend fit over {} points: slope={:.4} intercept={:.4} r2={:.4}",
        n,
        slope,
        intercept,
        r_squared
    );

    Ok(TrendFit {
        slope,
        intercept,
        mean_squared_error: ss_res / count,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint {
                label: format!("{}回目", i + 1),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn exact_line_has_no_error() {
        let fit = fit_trend(&series(&[1.0, 3.0, 5.0, 7.0])).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!(fit.mean_squared_error.abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!((fit.predict(4.0) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn noisy_series_metrics() {
        // y = 2, 4, 5: slope 1.5, intercept 2.1667, residuals -1/6, 1/3, -1/6
        let fit = fit_trend(&series(&[2.0, 4.0, 5.0])).unwrap();
        assert!((fit.slope - 1.5).abs() < 1e-12);
        assert!((fit.intercept - 13.0 / 6.0).abs() < 1e-12);
        assert!((fit.mean_squared_error - 1.0 / 18.0).abs() < 1e-12);
        // ss_tot = 14/3, ss_res = 1/6
        assert!((fit.r_squared - (1.0 - (1.0 / 6.0) / (14.0 / 3.0))).abs() < 1e-12);
    }

    #[test]
    fn flat_series_is_a_perfect_fit() {
        let fit = fit_trend(&series(&[3.0, 3.0, 3.0])).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 1.0);
        assert_eq!(fit.fitted(3), vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn single_point_is_insufficient() {
        let err = fit_trend(&series(&[3.0])).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientData { needed: 2, found: 1, .. }
        ));
    }
}
