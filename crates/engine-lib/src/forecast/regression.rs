//! Least-squares growth estimation
//!
//! The ensemble mathematics behind growth prediction are deliberately
//! pluggable: everything upstream only sees the fit/predict contract.

use crate::error::EngineError;

/// Contract every growth estimator must satisfy.
///
/// Inputs are sample indices (days since an animal's first record);
/// outputs are predicted weights in kilograms.
pub trait GrowthEstimator: Send + Sync + std::fmt::Debug {
    /// Predict the weight at the given sample index
    fn predict(&self, index: f64) -> f64;

    /// Flat parameter vector, used for artifact checksums
    fn params(&self) -> Vec<f64>;

    /// Short strategy name recorded in model metadata
    fn name(&self) -> &'static str;
}

/// Ordinary least-squares line over (sample-index, weight) pairs
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrendModel {
    pub slope: f64,
    pub intercept: f64,
}

impl GrowthEstimator for LinearTrendModel {
    fn predict(&self, index: f64) -> f64 {
        self.intercept + self.slope * index
    }

    fn params(&self) -> Vec<f64> {
        vec![self.slope, self.intercept]
    }

    fn name(&self) -> &'static str {
        "linear_trend"
    }
}

/// Fit a least-squares line to (sample-index, weight) pairs.
///
/// Fails with [`EngineError::TrainingFailed`] on an empty dataset or a
/// degenerate one (all indices identical), never with a NaN fit.
pub fn fit_linear_trend(pairs: &[(f64, f64)]) -> Result<LinearTrendModel, EngineError> {
    if pairs.is_empty() {
        return Err(EngineError::TrainingFailed(
            "empty training dataset".to_string(),
        ));
    }

    let n = pairs.len() as f64;
    let sum_x: f64 = pairs.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = pairs.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = pairs.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = pairs.iter().map(|(x, _)| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return Err(EngineError::TrainingFailed(
            "degenerate dataset: no index spread".to_string(),
        ));
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    if !slope.is_finite() || !intercept.is_finite() {
        return Err(EngineError::TrainingFailed(
            "non-finite fit coefficients".to_string(),
        ));
    }

    Ok(LinearTrendModel { slope, intercept })
}
