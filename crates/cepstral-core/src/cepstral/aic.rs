use crate::domain::AnalysisError;
use crate::numerics::{
    first_argmin, gaussian_pdf, reverse_cumulative_sum, stable_sum, stable_weighted_mean,
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AicError {
    #[error("AIC type not valid: '{0}' (expected 'aic' or 'aicc')")]
    UnknownAicType(String),
    #[error("weighting method not valid: '{0}' (expected 'ba' or 'min')")]
    UnknownWeightMethod(String),
    #[error("AIC requires at least one cepstral coefficient")]
    Empty,
    #[error("AIC input length mismatch: coefficients={coefficients}, variances={variances}")]
    LengthMismatch {
        coefficients: usize,
        variances: usize,
    },
    #[error("cepstral variance must be finite and > 0 at index {index}, got {value}")]
    NonPositiveVariance { index: usize, value: f64 },
    #[error("AIC curve has no defined order")]
    NoDefinedOrder,
}

impl From<AicError> for AnalysisError {
    fn from(error: AicError) -> Self {
        match error {
            AicError::NoDefinedOrder => AnalysisError::computation("RUN.AIC", error.to_string()),
            other => AnalysisError::input_validation("INPUT.AIC", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AicType {
    #[default]
    Aic,
    /// Small-sample correction. Orders `K >= NF - 2` are undefined, so a
    /// two-bin spectrum has no admissible order and construction fails.
    Aicc,
}

impl AicType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aic => "aic",
            Self::Aicc => "aicc",
        }
    }
}

impl Display for AicType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AicType {
    type Err = AicError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "aic" => Ok(Self::Aic),
            "aicc" => Ok(Self::Aicc),
            other => Err(AicError::UnknownAicType(other.to_string())),
        }
    }
}

/// Scheme turning an AIC curve into a probability per truncation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeightMethod {
    /// Akaike weights: `w[K] ∝ exp(-(aic[K] - aic_min) / 2)`.
    #[default]
    #[serde(rename = "ba")]
    BayesianAkaike,
    /// All weight on the AIC minimum.
    #[serde(rename = "min")]
    Minimum,
}

impl WeightMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BayesianAkaike => "ba",
            Self::Minimum => "min",
        }
    }
}

impl Display for WeightMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightMethod {
    type Err = AicError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ba" => Ok(Self::BayesianAkaike),
            "min" => Ok(Self::Minimum),
            other => Err(AicError::UnknownWeightMethod(other.to_string())),
        }
    }
}

/// AIC value per candidate order `K = 0..NF`.
///
/// Orders at or past `undefined_from` have no defined score and hold `+inf`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AicCurve {
    pub aic_type: AicType,
    pub values: Vec<f64>,
    pub undefined_from: Option<usize>,
}

impl AicCurve {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_defined_at(&self, order: usize) -> bool {
        order < self.values.len() && self.undefined_from.is_none_or(|from| order < from)
    }

    /// First order attaining the minimum.
    pub fn argmin(&self) -> Option<usize> {
        let defined = self.undefined_from.unwrap_or(self.values.len());
        first_argmin(&self.values[..defined.min(self.values.len())])
    }

    pub fn min(&self) -> Option<f64> {
        self.argmin().map(|order| self.values[order])
    }
}

pub fn compute_aic_curve(
    aic_type: AicType,
    coefficients: &[f64],
    ck_var: &[f64],
) -> Result<AicCurve, AicError> {
    match aic_type {
        AicType::Aic => Ok(AicCurve {
            aic_type,
            values: dct_aic(coefficients, ck_var)?,
            undefined_from: None,
        }),
        AicType::Aicc => dct_aicc(coefficients, ck_var),
    }
}

/// `aic[K] = sum_{j>K} c_j^2 / var_j + 2(K + 1)`.
pub fn dct_aic(coefficients: &[f64], ck_var: &[f64]) -> Result<Vec<f64>, AicError> {
    let residual = residual_badness(coefficients, ck_var)?;
    Ok(residual
        .iter()
        .enumerate()
        .map(|(order, badness)| badness + 2.0 * (order + 1) as f64)
        .collect())
}

/// Small-sample corrected AIC, penalty `2(K + 1) NF / (NF - K - 2)`.
///
/// The penalty diverges for `K >= NF - 2`; those orders are marked undefined.
pub fn dct_aicc(coefficients: &[f64], ck_var: &[f64]) -> Result<AicCurve, AicError> {
    let residual = residual_badness(coefficients, ck_var)?;
    let nf = residual.len();
    let defined = nf.saturating_sub(2);

    let values = residual
        .iter()
        .enumerate()
        .map(|(order, badness)| {
            if order < defined {
                let parameters = (order + 1) as f64;
                badness + 2.0 * parameters * nf as f64 / (nf - order - 2) as f64
            } else {
                f64::INFINITY
            }
        })
        .collect();

    tracing::debug!(from = defined, len = nf, "AICc undefined for orders K >= NF-2");

    Ok(AicCurve {
        aic_type: AicType::Aicc,
        values,
        undefined_from: Some(defined),
    })
}

/// `sum_{j>K} c_j^2 / var_j` for every `K`.
fn residual_badness(coefficients: &[f64], ck_var: &[f64]) -> Result<Vec<f64>, AicError> {
    if coefficients.is_empty() {
        return Err(AicError::Empty);
    }
    if coefficients.len() != ck_var.len() {
        return Err(AicError::LengthMismatch {
            coefficients: coefficients.len(),
            variances: ck_var.len(),
        });
    }
    if let Some((index, &value)) = ck_var
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite() || **value <= 0.0)
    {
        return Err(AicError::NonPositiveVariance { index, value });
    }

    let scaled: Vec<f64> = coefficients
        .iter()
        .zip(ck_var)
        .map(|(coefficient, variance)| coefficient * coefficient / variance)
        .collect();
    let tail = reverse_cumulative_sum(&scaled);
    Ok((0..scaled.len())
        .map(|order| tail.get(order + 1).copied().unwrap_or(0.0))
        .collect())
}

/// Normalized non-negative weight per order; undefined orders get zero.
pub fn produce_weights(curve: &AicCurve, method: WeightMethod) -> Result<Vec<f64>, AicError> {
    let best = curve.argmin().ok_or(AicError::NoDefinedOrder)?;
    let mut weights = vec![0.0; curve.len()];

    match method {
        WeightMethod::Minimum => weights[best] = 1.0,
        WeightMethod::BayesianAkaike => {
            let minimum = curve.values[best];
            for (order, weight) in weights.iter_mut().enumerate() {
                if curve.is_defined_at(order) {
                    *weight = (-0.5 * (curve.values[order] - minimum)).exp();
                }
            }
            let total = stable_sum(&weights);
            for weight in &mut weights {
                *weight /= total;
            }
        }
    }

    Ok(weights)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridStatistics {
    pub mean: f64,
    pub std: f64,
}

/// Mean and standard deviation of a discrete distribution on `grid`.
///
/// `second_moment` replaces `grid^2` when each grid point carries its own
/// spread (law of total variance).
pub fn grid_statistics(
    grid: &[f64],
    density: &[f64],
    second_moment: Option<&[f64]>,
) -> Option<GridStatistics> {
    let mean = stable_weighted_mean(grid, density)?;
    let squares: Vec<f64> = match second_moment {
        Some(values) => values.to_vec(),
        None => grid.iter().map(|value| value * value).collect(),
    };
    let raw = stable_weighted_mean(&squares, density)?;
    let variance = (raw - mean * mean).max(0.0);
    Some(GridStatistics {
        mean,
        std: variance.sqrt(),
    })
}

/// Weight per truncation order together with the mean and spread of the
/// order index under those weights.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AicWeights {
    pub method: WeightMethod,
    pub weights: Vec<f64>,
    pub mean_order: f64,
    pub std_order: f64,
}

impl AicWeights {
    pub fn from_curve(curve: &AicCurve, method: WeightMethod) -> Result<Self, AicError> {
        let weights = produce_weights(curve, method)?;
        let orders: Vec<f64> = (0..weights.len()).map(|order| order as f64).collect();
        let stats = grid_statistics(&orders, &weights, None).ok_or(AicError::NoDefinedOrder)?;
        Ok(Self {
            method,
            weights,
            mean_order: stats.mean,
            std_order: stats.std,
        })
    }
}

/// Gaussian mixture `sum_K w[K] N(x; mean[K], sigma[K])` evaluated on `grid`.
pub fn mixture_density(weights: &[f64], sigma: &[f64], mean: &[f64], grid: &[f64]) -> Vec<f64> {
    grid.iter()
        .map(|&x| {
            weights
                .iter()
                .zip(sigma)
                .zip(mean)
                .filter(|((weight, _), _)| **weight > 0.0)
                .map(|((weight, sigma), mean)| weight * gaussian_pdf(x, *mean, *sigma))
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        AicCurve, AicError, AicType, AicWeights, WeightMethod, compute_aic_curve, dct_aic,
        dct_aicc, grid_statistics, mixture_density, produce_weights,
    };

    #[test]
    fn aic_adds_residual_badness_and_linear_penalty() {
        let coefficients = [1.0, 2.0, 3.0];
        let variances = [1.0, 4.0, 9.0];
        let aic = dct_aic(&coefficients, &variances).expect("aic");
        assert_eq!(aic, vec![2.0 + 2.0, 1.0 + 4.0, 6.0]);
    }

    #[test]
    fn aic_validates_inputs() {
        assert_eq!(dct_aic(&[], &[]), Err(AicError::Empty));
        assert_eq!(
            dct_aic(&[1.0, 2.0], &[1.0]),
            Err(AicError::LengthMismatch {
                coefficients: 2,
                variances: 1,
            })
        );
        assert_eq!(
            dct_aic(&[1.0, 2.0], &[1.0, 0.0]),
            Err(AicError::NonPositiveVariance {
                index: 1,
                value: 0.0,
            })
        );
    }

    #[test]
    fn aicc_marks_orders_past_nf_minus_two_undefined() {
        let coefficients = [0.5, 0.1, 0.0, 0.2, 0.0];
        let variances = [1.0; 5];
        let curve = dct_aicc(&coefficients, &variances).expect("aicc");

        assert_eq!(curve.undefined_from, Some(3));
        assert!(curve.values[3].is_infinite());
        assert!(curve.values[4].is_infinite());
        assert!(!curve.is_defined_at(3));
        assert!(curve.is_defined_at(2));

        let expected_k0 = 0.01 + 0.04 + 2.0 * 5.0 / 3.0;
        assert!((curve.values[0] - expected_k0).abs() < 1.0e-12);
        let expected_k2 = 0.04 + 2.0 * 3.0 * 5.0 / 1.0;
        assert!((curve.values[2] - expected_k2).abs() < 1.0e-12);
    }

    #[test]
    fn aicc_with_two_bins_has_no_defined_order() {
        let curve = dct_aicc(&[1.0, 1.0], &[1.0, 1.0]).expect("aicc");
        assert_eq!(curve.argmin(), None);
        assert_eq!(
            produce_weights(&curve, WeightMethod::BayesianAkaike),
            Err(AicError::NoDefinedOrder)
        );
    }

    #[test]
    fn argmin_breaks_exact_ties_toward_lower_order() {
        let curve = AicCurve {
            aic_type: AicType::Aic,
            values: vec![5.0, 3.0, 4.0, 3.0, 6.0],
            undefined_from: None,
        };
        assert_eq!(curve.argmin(), Some(1));
        assert_eq!(curve.min(), Some(3.0));
    }

    #[test]
    fn aic_type_parses_known_names_only() {
        assert_eq!("aic".parse::<AicType>(), Ok(AicType::Aic));
        assert_eq!("aicc".parse::<AicType>(), Ok(AicType::Aicc));
        assert_eq!(
            "bic".parse::<AicType>(),
            Err(AicError::UnknownAicType("bic".to_string()))
        );
        assert_eq!("ba".parse::<WeightMethod>(), Ok(WeightMethod::BayesianAkaike));
        assert!("akaike".parse::<WeightMethod>().is_err());
    }

    #[test]
    fn bayesian_weights_are_normalized_and_non_negative() {
        let coefficients = [2.0, 0.9, -0.4, 0.3, 0.05, -0.02, 0.01, 0.0];
        let variances = [0.1; 8];
        for aic_type in [AicType::Aic, AicType::Aicc] {
            let curve = compute_aic_curve(aic_type, &coefficients, &variances).expect("curve");
            for method in [WeightMethod::BayesianAkaike, WeightMethod::Minimum] {
                let weights = produce_weights(&curve, method).expect("weights");
                let total: f64 = weights.iter().sum();
                assert!((total - 1.0).abs() < 1.0e-12);
                assert!(weights.iter().all(|weight| *weight >= 0.0));
            }
        }
    }

    #[test]
    fn bayesian_weights_follow_akaike_ratios() {
        let curve = AicCurve {
            aic_type: AicType::Aic,
            values: vec![4.0, 2.0, 6.0],
            undefined_from: None,
        };
        let weights = produce_weights(&curve, WeightMethod::BayesianAkaike).expect("weights");
        assert!((weights[0] / weights[1] - (-1.0f64).exp()).abs() < 1.0e-12);
        assert!((weights[2] / weights[1] - (-2.0f64).exp()).abs() < 1.0e-12);

        let delta = produce_weights(&curve, WeightMethod::Minimum).expect("weights");
        assert_eq!(delta, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn grid_statistics_use_optional_second_moment() {
        let stats = grid_statistics(&[0.0, 1.0, 2.0], &[0.25, 0.5, 0.25], None).expect("stats");
        assert!((stats.mean - 1.0).abs() < 1.0e-12);
        assert!((stats.std - 0.5f64.sqrt()).abs() < 1.0e-12);

        let second = [0.0 + 1.0, 1.0 + 1.0, 4.0 + 1.0];
        let total = grid_statistics(&[0.0, 1.0, 2.0], &[0.25, 0.5, 0.25], Some(&second))
            .expect("stats");
        assert!((total.std - 1.5f64.sqrt()).abs() < 1.0e-12);

        assert!(grid_statistics(&[1.0], &[0.0], None).is_none());
    }

    #[test]
    fn mixture_density_integrates_to_total_weight() {
        let grid: Vec<f64> = (0..4001).map(|index| -10.0 + 0.005 * index as f64).collect();
        let density = mixture_density(&[0.3, 0.7], &[0.5, 1.0], &[-1.0, 2.0], &grid);
        let integral: f64 = density.iter().sum::<f64>() * 0.005;
        assert!((integral - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn aic_weights_report_order_statistics() {
        let curve = AicCurve {
            aic_type: AicType::Aic,
            values: vec![4.0, 2.0, 4.0],
            undefined_from: None,
        };
        let weights = AicWeights::from_curve(&curve, WeightMethod::BayesianAkaike).expect("weights");
        assert!((weights.mean_order - 1.0).abs() < 1.0e-12);
        let side = (-1.0f64).exp() / (1.0 + 2.0 * (-1.0f64).exp());
        assert!((weights.std_order - (2.0 * side).sqrt()).abs() < 1.0e-12);

        let delta = AicWeights::from_curve(&curve, WeightMethod::Minimum).expect("weights");
        assert_eq!(delta.weights, vec![0.0, 1.0, 0.0]);
        assert_eq!(delta.std_order, 0.0);
    }
}
