//! Fractal-feature momentum model with naive backtesting helpers.
//!
//! The fluctuation statistics are optional because they are quadratic (or
//! worse) in the series length; the prediction itself only uses the mean.

use serde::Serialize;

/// Segment length used by [`dfa`] and [`mfdfa`] when fitting.
pub const DEFAULT_WINDOW: usize = 5;
pub const DEFAULT_Q: f64 = 2.0;
pub const DEFAULT_APEN_M: usize = 2;
pub const DEFAULT_APEN_R: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("model must be fitted before predicting")]
    NotFitted,
    #[error("cannot fit on an empty series")]
    EmptySeries,
    #[error("walk-forward window must be at least 1")]
    InvalidWindow,
}

/// Residuals of `segment` around its least-squares line.
fn detrended(segment: &[f64]) -> Vec<f64> {
    let n = segment.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = segment.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in segment.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = y_mean - slope * x_mean;

    segment
        .iter()
        .enumerate()
        .map(|(i, y)| y - (intercept + slope * i as f64))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean fluctuation of every sliding segment, each reduced by `fluctuation`.
fn sliding_fluctuation(
    series: &[f64],
    window: usize,
    fluctuation: impl Fn(&[f64]) -> f64,
) -> f64 {
    if window < 2 || series.len() < window {
        return 0.0;
    }
    let values: Vec<f64> = series
        .windows(window)
        .map(|segment| fluctuation(&detrended(segment)))
        .collect();
    mean(&values)
}

/// Detrended fluctuation: mean RMS residual over sliding linear fits.
pub fn dfa(series: &[f64], window: usize) -> f64 {
    sliding_fluctuation(series, window, |residuals| {
        mean(&residuals.iter().map(|r| r * r).collect::<Vec<_>>()).sqrt()
    })
}

/// Multifractal variant of [`dfa`] using the `q`-th order mean.
pub fn mfdfa(series: &[f64], q: f64, window: usize) -> f64 {
    sliding_fluctuation(series, window, |residuals| {
        mean(&residuals.iter().map(|r| r.abs().powf(q)).collect::<Vec<_>>()).powf(1.0 / q)
    })
}

/// Approximate entropy with pattern length `m` and tolerance `r`.
pub fn approximate_entropy(series: &[f64], m: usize, r: f64) -> f64 {
    let n = series.len();
    if n <= m + 1 {
        return 0.0;
    }

    let phi = |m: usize| {
        let patterns: Vec<&[f64]> = series.windows(m).collect();
        let total = patterns.len() as f64;
        let logs: Vec<f64> = patterns
            .iter()
            .map(|p| {
                let matches = patterns
                    .iter()
                    .filter(|q| p.iter().zip(q.iter()).all(|(a, b)| (a - b).abs() <= r))
                    .count();
                (matches as f64 / total).ln()
            })
            .collect();
        mean(&logs)
    };

    phi(m) - phi(m + 1)
}

/// Summary statistics captured by [`FractalModel::fit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedFeatures {
    pub mean: f64,
    pub std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dfa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfdfa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apen: Option<f64>,
}

/// Directional predictions and the PnL they would have produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestRun {
    pub predictions: Vec<f64>,
    pub pnl: Vec<f64>,
}

impl BacktestRun {
    pub fn total_pnl(&self) -> f64 {
        self.pnl.iter().sum()
    }

    /// Fraction of steps with positive PnL.
    pub fn hit_rate(&self) -> f64 {
        if self.pnl.is_empty() {
            return 0.0;
        }
        self.pnl.iter().filter(|p| **p > 0.0).count() as f64 / self.pnl.len() as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct FractalModel {
    pub use_dfa: bool,
    pub use_mfdfa: bool,
    pub use_apen: bool,
    features: Option<FittedFeatures>,
}

impl FractalModel {
    pub fn new(use_dfa: bool, use_mfdfa: bool, use_apen: bool) -> Self {
        Self {
            use_dfa,
            use_mfdfa,
            use_apen,
            features: None,
        }
    }

    pub fn features(&self) -> Option<&FittedFeatures> {
        self.features.as_ref()
    }

    pub fn fit(&mut self, series: &[f64]) -> Result<&FittedFeatures, ModelError> {
        if series.is_empty() {
            return Err(ModelError::EmptySeries);
        }

        let avg = mean(series);
        let std = if series.len() > 1 {
            mean(&series.iter().map(|v| (v - avg).powi(2)).collect::<Vec<_>>()).sqrt()
        } else {
            0.0
        };

        let features = self.features.insert(FittedFeatures {
            mean: avg,
            std,
            dfa: self.use_dfa.then(|| dfa(series, DEFAULT_WINDOW)),
            mfdfa: self
                .use_mfdfa
                .then(|| mfdfa(series, DEFAULT_Q, DEFAULT_WINDOW)),
            apen: self
                .use_apen
                .then(|| approximate_entropy(series, DEFAULT_APEN_M, DEFAULT_APEN_R)),
        });
        Ok(features)
    }

    /// `1.0` when the last value is at or above the fitted mean, `-1.0`
    /// below it and `0.0` for an empty series.
    pub fn predict(&self, series: &[f64]) -> Result<f64, ModelError> {
        let features = self.features.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(match series.last() {
            None => 0.0,
            Some(last) if *last >= features.mean => 1.0,
            Some(_) => -1.0,
        })
    }

    /// Position implied by `signal`, never exceeding `capital` either way.
    pub fn size_positions(&self, signal: f64, capital: f64) -> f64 {
        let limit = capital.abs();
        (capital * signal).max(-limit).min(limit)
    }

    /// Expanding-window backtest: fit on `series[..i]`, trade step `i`.
    pub fn backtest(&mut self, series: &[f64]) -> Result<BacktestRun, ModelError> {
        let mut run = BacktestRun::default();
        for i in 1..series.len() {
            self.step(&series[..i], series[i] - series[i - 1], &mut run)?;
        }
        Ok(run)
    }

    /// Rolling-window backtest over the last `window` observations.
    pub fn walk_forward(
        &mut self,
        series: &[f64],
        window: usize,
    ) -> Result<BacktestRun, ModelError> {
        if window == 0 {
            return Err(ModelError::InvalidWindow);
        }
        let mut run = BacktestRun::default();
        for i in window..series.len() {
            self.step(&series[i - window..i], series[i] - series[i - 1], &mut run)?;
        }
        Ok(run)
    }

    fn step(
        &mut self,
        history: &[f64],
        change: f64,
        run: &mut BacktestRun,
    ) -> Result<(), ModelError> {
        self.fit(history)?;
        let signal = self.predict(history)?;
        run.predictions.push(signal);
        run.pnl.push(signal * change);
        Ok(())
    }
}
