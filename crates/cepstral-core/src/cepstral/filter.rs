use super::aic::{
    AicCurve, AicError, AicType, AicWeights, WeightMethod, compute_aic_curve, grid_statistics,
    mixture_density,
};
use super::mel::{MelError, MelVariance, mel_variance};
use super::moments::{
    BinnedCovariance, MomentsError, TheoryTables, logtau_theoretical_variance,
    multicomponent_parameters,
};
use super::transform::{
    TransformError, cumulative_from_cepstrum, forward_cepstral_transform, reconstruct_from_cepstrum,
};
use crate::common::constants::{
    DEFAULT_DENSITY_GRID_SIZE, DENSITY_SIGMA_SPAN, DENSITY_WEIGHT_FLOOR,
};
use crate::domain::{AnalysisError, AnalysisWarning, Estimate, UndefinedReason};
use crate::numerics::{linear_grid, stable_weighted_sum};
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Moments(#[from] MomentsError),
    #[error(transparent)]
    Aic(#[from] AicError),
    #[error(transparent)]
    Mel(#[from] MelError),
    #[error("sample log-PSD must be finite, index {index} got {value}")]
    NonFiniteSample { index: usize, value: f64 },
    #[error("{field} length mismatch: expected {expected}, got {actual}")]
    TheoryLengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("theoretical log-PSD mean must be finite, index {index} got {value}")]
    NonFiniteTheoryMean { index: usize, value: f64 },
    #[error("kmin_corrfactor must be finite and >= 0, got {value}")]
    InvalidCorrFactor { value: f64 },
    #[error("no AIC weights defined; compute_p_aic must run first")]
    MissingAicWeights,
    #[error("density grid must contain at least 2 finite points, got {actual}")]
    InvalidDensityGrid { actual: usize },
}

impl From<FilterError> for AnalysisError {
    fn from(error: FilterError) -> Self {
        match error {
            FilterError::Transform(error) => error.into(),
            FilterError::Moments(error) => error.into(),
            FilterError::Aic(error) => error.into(),
            FilterError::Mel(error) => error.into(),
            FilterError::MissingAicWeights => {
                AnalysisError::input_validation("INPUT.P_AIC", error.to_string())
            }
            FilterError::InvalidDensityGrid { .. } => {
                AnalysisError::input_validation("INPUT.DENSITY_GRID", error.to_string())
            }
            other => AnalysisError::input_validation("INPUT.COS_FILTER", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CosFilterOptions {
    /// Per-coefficient null variance; single-component table when absent.
    pub ck_theory_var: Option<Vec<f64>>,
    /// Per-bin log-periodogram bias; single-component table when absent.
    pub psd_theory_mean: Option<Vec<f64>>,
    pub aic_type: AicType,
    pub kmin_corrfactor: f64,
}

impl Default for CosFilterOptions {
    fn default() -> Self {
        Self {
            ck_theory_var: None,
            psd_theory_mean: None,
            aic_type: AicType::Aic,
            kmin_corrfactor: 1.0,
        }
    }
}

impl CosFilterOptions {
    pub fn with_theory(mut self, tables: TheoryTables) -> Self {
        self.ck_theory_var = Some(tables.ck_var);
        self.psd_theory_mean = Some(tables.psd_mean);
        self
    }

    pub fn with_aic_type(mut self, aic_type: AicType) -> Self {
        self.aic_type = aic_type;
        self
    }

    pub fn with_kmin_corrfactor(mut self, kmin_corrfactor: f64) -> Self {
        self.kmin_corrfactor = kmin_corrfactor;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CosFilter {
    aic_type: AicType,
    kmin_corrfactor: f64,
    sample: Vec<f64>,
    psd_theory_mean: Vec<f64>,
    ck_theory_var: Vec<f64>,
    logtau_theory_var: Vec<f64>,
    coefficients: Vec<f64>,
    logtau: Vec<f64>,
    aic: AicCurve,
    aic_min: f64,
    aic_argmin: usize,
    aic_kmin: usize,
    p_aic: Option<AicWeights>,
    warnings: Vec<AnalysisWarning>,
}

impl CosFilter {
    pub fn new(sample_log_psd: &[f64], options: CosFilterOptions) -> Result<Self, FilterError> {
        let nf = sample_log_psd.len();
        if nf < 2 {
            return Err(TransformError::InsufficientPoints { actual: nf }.into());
        }
        if let Some((index, &value)) = sample_log_psd
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(FilterError::NonFiniteSample { index, value });
        }
        let kmin_corrfactor = options.kmin_corrfactor;
        if !kmin_corrfactor.is_finite() || kmin_corrfactor < 0.0 {
            return Err(FilterError::InvalidCorrFactor {
                value: kmin_corrfactor,
            });
        }

        let psd_theory_mean = match options.psd_theory_mean {
            Some(mean) => {
                check_length("psd_theory_mean", nf, mean.len())?;
                if let Some((index, &value)) =
                    mean.iter().enumerate().find(|(_, value)| !value.is_finite())
                {
                    return Err(FilterError::NonFiniteTheoryMean { index, value });
                }
                mean
            }
            None => multicomponent_parameters(nf, 1.0)?.psd_mean,
        };
        let ck_theory_var = match options.ck_theory_var {
            Some(variance) => {
                check_length("ck_theory_var", nf, variance.len())?;
                variance
            }
            None => multicomponent_parameters(nf, 1.0)?.ck_var,
        };

        let sample: Vec<f64> = sample_log_psd
            .iter()
            .zip(&psd_theory_mean)
            .map(|(value, mean)| value - mean)
            .collect();
        let coefficients = forward_cepstral_transform(&sample)?;
        let aic = compute_aic_curve(options.aic_type, &coefficients, &ck_theory_var)?;
        let aic_argmin = aic.argmin().ok_or(AicError::NoDefinedOrder)?;
        let aic_min = aic.values[aic_argmin];
        let aic_kmin = scaled_order(aic_argmin, kmin_corrfactor);

        let mut warnings = Vec::new();
        if let Some(from) = aic.undefined_from.filter(|&from| from < nf) {
            warnings.push(AnalysisWarning::AiccUndefinedTail { from, len: nf });
        }
        if aic_kmin >= nf {
            tracing::warn!(aic_kmin, nf, "aic_Kmin is out of range");
            warnings.push(AnalysisWarning::CutoffOutOfRange {
                context: "aic_Kmin",
                cutoff: aic_kmin,
                len: nf,
            });
        }
        tracing::debug!(
            aic_type = %options.aic_type,
            aic_min,
            aic_argmin,
            aic_kmin,
            "selected cepstral truncation order"
        );

        Ok(Self {
            aic_type: options.aic_type,
            kmin_corrfactor,
            logtau_theory_var: logtau_theoretical_variance(&ck_theory_var),
            logtau: cumulative_from_cepstrum(&coefficients),
            sample,
            psd_theory_mean,
            ck_theory_var,
            coefficients,
            aic,
            aic_min,
            aic_argmin,
            aic_kmin,
            p_aic: None,
            warnings,
        })
    }

    pub fn nf(&self) -> usize {
        self.sample.len()
    }

    /// Length of the underlying time series, `2(NF - 1)`.
    pub fn series_len(&self) -> usize {
        2 * (self.nf() - 1)
    }

    pub fn aic_type(&self) -> AicType {
        self.aic_type
    }

    pub fn kmin_corrfactor(&self) -> f64 {
        self.kmin_corrfactor
    }

    pub fn aic(&self) -> &AicCurve {
        &self.aic
    }

    pub fn aic_min(&self) -> f64 {
        self.aic_min
    }

    /// Order minimizing the AIC, before the correction factor.
    pub fn aic_argmin(&self) -> usize {
        self.aic_argmin
    }

    pub fn aic_kmin(&self) -> usize {
        self.aic_kmin
    }

    /// Number of retained coefficients, `aic_Kmin + 1`.
    pub fn pstar(&self) -> usize {
        self.aic_kmin.saturating_add(1)
    }

    /// Bias-removed log-periodogram the coefficients were computed from.
    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Zero-mean cumulative filtered value `logtau[K]`.
    pub fn logtau(&self) -> &[f64] {
        &self.logtau
    }

    pub fn psd_theory_mean(&self) -> &[f64] {
        &self.psd_theory_mean
    }

    pub fn ck_theory_var(&self) -> &[f64] {
        &self.ck_theory_var
    }

    pub fn ck_theory_std(&self) -> Vec<f64> {
        self.ck_theory_var.iter().map(|value| value.sqrt()).collect()
    }

    pub fn logtau_theory_var(&self) -> &[f64] {
        &self.logtau_theory_var
    }

    pub fn logtau_theory_std(&self) -> Vec<f64> {
        self.logtau_theory_var
            .iter()
            .map(|value| value.sqrt())
            .collect()
    }

    pub fn p_aic(&self) -> Option<&AicWeights> {
        self.p_aic.as_ref()
    }

    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    /// Filtered log-tau over all orders plus the reconstruction and point
    /// estimates at the selected order.
    ///
    /// `Some(k_psd)` replaces `aic_Kmin` for this and every later call.
    pub fn scan_filter_tau(
        &mut self,
        k_psd: Option<usize>,
        correct_mean: bool,
    ) -> Result<TauScan, FilterError> {
        if let Some(cutoff) = k_psd {
            self.aic_kmin = cutoff;
        }
        let cutoff = self.aic_kmin;
        let nf = self.nf();
        let bias = self.psd_theory_mean[0];

        let mut warnings = Vec::new();
        let mut logpsd = reconstruct_from_cepstrum(&self.coefficients, Some(cutoff))?;
        if logpsd.is_undefined() {
            warnings.push(AnalysisWarning::CutoffOutOfRange {
                context: "aic_Kmin",
                cutoff,
                len: nf,
            });
        }
        let psd = logpsd.clone().map(exp_all);

        let logtau_theory_std = self.logtau_theory_std();
        let tau = exp_all(self.logtau.clone());
        let tau_theory_std: Vec<f64> = tau
            .iter()
            .zip(&logtau_theory_std)
            .map(|(tau, std)| tau * std)
            .collect();

        let reason = UndefinedReason::CutoffOutOfRange { cutoff, len: nf };
        let at_cutoff = |values: &[f64]| match values.get(cutoff) {
            Some(&value) => Estimate::Value(value),
            None => Estimate::Undefined(reason),
        };
        let mut logtau_kmin = at_cutoff(&self.logtau);
        let logtau_var_kmin = at_cutoff(&self.logtau_theory_var);
        let logtau_std_kmin = at_cutoff(&logtau_theory_std);
        let tau_kmin = at_cutoff(&tau);
        let tau_std_kmin = at_cutoff(&tau_theory_std);
        let tau_var_kmin = tau_std_kmin.clone().map(|std| std * std);

        let mut logtau = self.logtau.clone();
        if correct_mean {
            logpsd = logpsd.map(|values| {
                values
                    .iter()
                    .zip(&self.psd_theory_mean)
                    .map(|(value, mean)| value + mean)
                    .collect()
            });
            for value in &mut logtau {
                *value += bias;
            }
            logtau_kmin = logtau_kmin.map(|value| value + bias);
        }

        Ok(TauScan {
            aic_type: self.aic_type,
            aic_min: self.aic_min,
            aic_kmin: cutoff,
            k_psd: cutoff,
            correct_mean,
            logtau,
            tau,
            logtau_theory_std,
            tau_theory_std,
            logpsd,
            psd,
            logtau_kmin,
            logtau_var_kmin,
            logtau_std_kmin,
            tau_kmin,
            tau_var_kmin,
            tau_std_kmin,
            warnings,
        })
    }

    /// Reconstruction at every cutoff of `cutoffs`, independent of `aic_Kmin`.
    pub fn scan_filter_psd(
        &self,
        cutoffs: &[usize],
        correct_mean: bool,
    ) -> Result<PsdScan, FilterError> {
        let nf = self.nf();
        let mut columns = Vec::with_capacity(cutoffs.len());
        let mut warnings = Vec::new();

        for &cutoff in cutoffs {
            let logpsd = reconstruct_from_cepstrum(&self.coefficients, Some(cutoff))?;
            if logpsd.is_undefined() {
                warnings.push(AnalysisWarning::CutoffOutOfRange {
                    context: "K_LIST",
                    cutoff,
                    len: nf,
                });
            }
            let psd = logpsd.clone().map(exp_all);
            let logtau = logpsd.as_ref().map(|values| values[0]);
            let tau = logtau.clone().map(f64::exp);

            let (logpsd, logtau) = if correct_mean {
                (
                    logpsd.map(|values| {
                        values
                            .iter()
                            .zip(&self.psd_theory_mean)
                            .map(|(value, mean)| value + mean)
                            .collect()
                    }),
                    logtau.map(|value| value + self.psd_theory_mean[0]),
                )
            } else {
                (logpsd, logtau)
            };

            columns.push(PsdColumn {
                cutoff,
                logpsd,
                psd,
                logtau,
                tau,
            });
        }

        Ok(PsdScan {
            nf,
            correct_mean,
            columns,
            warnings,
        })
    }

    /// Weights over truncation orders derived from the AIC curve; cached for
    /// [`CosFilter::compute_logtau_density`].
    pub fn compute_p_aic(&mut self, method: WeightMethod) -> Result<&AicWeights, FilterError> {
        let weights = AicWeights::from_curve(&self.aic, method)?;
        tracing::debug!(
            method = %method,
            mean_order = weights.mean_order,
            std_order = weights.std_order,
            "computed AIC weights"
        );
        Ok(&*self.p_aic.insert(weights))
    }

    /// Model-averaged log-tau: mean and total variance over orders weighted
    /// by the cached AIC weights, with an optional Gaussian-mixture density.
    pub fn compute_logtau_density(
        &self,
        options: &DensityOptions,
    ) -> Result<LogtauDensity, FilterError> {
        let weights = self.p_aic.as_ref().ok_or(FilterError::MissingAicWeights)?;
        let shift = if options.correct_mean {
            self.psd_theory_mean[0]
        } else {
            0.0
        };

        let logtau: Vec<f64> = self.logtau.iter().map(|value| value + shift).collect();
        let logtau_std = self.logtau_theory_std();
        let second_moment: Vec<f64> = logtau
            .iter()
            .zip(&self.logtau_theory_var)
            .map(|(mean, variance)| variance + mean * mean)
            .collect();
        let stats = grid_statistics(&logtau, &weights.weights, Some(&second_moment))
            .ok_or(AicError::NoDefinedOrder)?;

        let spread: Vec<f64> = logtau
            .iter()
            .zip(&self.logtau_theory_var)
            .map(|(mean, variance)| (variance + (mean - stats.mean).powi(2)).sqrt())
            .collect();
        let logtau_std_alternative =
            stable_weighted_sum(&spread, &weights.weights).ok_or(AicError::LengthMismatch {
                coefficients: spread.len(),
                variances: weights.weights.len(),
            })?;

        let density = if options.only_stats {
            None
        } else {
            let grid = match &options.grid {
                Some(grid) => {
                    if grid.len() < 2 || grid.iter().any(|value| !value.is_finite()) {
                        return Err(FilterError::InvalidDensityGrid { actual: grid.len() });
                    }
                    grid.clone()
                }
                None => automatic_grid(&logtau, &logtau_std, &weights.weights, options.grid_size)?,
            };
            let values = mixture_density(&weights.weights, &logtau_std, &logtau, &grid);
            Some(DensityGrid { grid, values })
        };

        let tau_mean = (stats.mean - shift).exp();
        Ok(LogtauDensity {
            method: weights.method,
            correct_mean: options.correct_mean,
            logtau_mean: stats.mean,
            logtau_std: stats.std,
            logtau_std_alternative,
            tau_mean,
            tau_std: tau_mean * stats.std,
            density,
        })
    }

    /// Variance of the filter-bank zero-frequency estimate at `P*`.
    pub fn mel_compute_variance(
        &self,
        covariance: &BinnedCovariance,
        debug: bool,
    ) -> Result<MelVariance, FilterError> {
        Ok(mel_variance(covariance, self.pstar(), debug)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TauScan {
    pub aic_type: AicType,
    pub aic_min: f64,
    pub aic_kmin: usize,
    pub k_psd: usize,
    pub correct_mean: bool,
    pub logtau: Vec<f64>,
    pub tau: Vec<f64>,
    pub logtau_theory_std: Vec<f64>,
    pub tau_theory_std: Vec<f64>,
    pub logpsd: Estimate<Vec<f64>>,
    pub psd: Estimate<Vec<f64>>,
    pub logtau_kmin: Estimate<f64>,
    pub logtau_var_kmin: Estimate<f64>,
    pub logtau_std_kmin: Estimate<f64>,
    pub tau_kmin: Estimate<f64>,
    pub tau_var_kmin: Estimate<f64>,
    pub tau_std_kmin: Estimate<f64>,
    pub warnings: Vec<AnalysisWarning>,
}

impl TauScan {
    pub fn pstar(&self) -> usize {
        self.aic_kmin.saturating_add(1)
    }
}

impl Display for TauScan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CosFilter:")?;
        writeln!(f, "  AIC type  = {}", self.aic_type)?;
        writeln!(f, "  AIC min   = {:.6}", self.aic_min)?;
        writeln!(f, "  AIC_Kmin  = {}  (P* = {})", self.aic_kmin, self.pstar())?;
        writeln!(
            f,
            "  L_0*   = {:15.6} +/- {:10.6}",
            self.logtau_kmin.value_or_nan(),
            self.logtau_std_kmin.value_or_nan()
        )?;
        writeln!(
            f,
            "  S_0*   = {:15.6} +/- {:10.6}",
            self.tau_kmin.value_or_nan(),
            self.tau_std_kmin.value_or_nan()
        )?;
        write!(f, "  K_PSD  = {}", self.k_psd)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsdColumn {
    pub cutoff: usize,
    pub logpsd: Estimate<Vec<f64>>,
    pub psd: Estimate<Vec<f64>>,
    /// `logpsd[0]`.
    pub logtau: Estimate<f64>,
    pub tau: Estimate<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsdScan {
    pub nf: usize,
    pub correct_mean: bool,
    pub columns: Vec<PsdColumn>,
    pub warnings: Vec<AnalysisWarning>,
}

impl PsdScan {
    pub fn cutoffs(&self) -> Vec<usize> {
        self.columns.iter().map(|column| column.cutoff).collect()
    }

    /// `table[bin][column]`; undefined columns are NaN.
    pub fn logpsd_table(&self) -> Vec<Vec<f64>> {
        self.table(|column| &column.logpsd)
    }

    pub fn psd_table(&self) -> Vec<Vec<f64>> {
        self.table(|column| &column.psd)
    }

    pub fn logtau_values(&self) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| column.logtau.value_or_nan())
            .collect()
    }

    pub fn tau_values(&self) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| column.tau.value_or_nan())
            .collect()
    }

    fn table(&self, select: impl Fn(&PsdColumn) -> &Estimate<Vec<f64>>) -> Vec<Vec<f64>> {
        let columns: Vec<Vec<f64>> = self
            .columns
            .iter()
            .map(|column| select(column).to_vec_or_nan(self.nf))
            .collect();
        (0..self.nf)
            .map(|bin| columns.iter().map(|column| column[bin]).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DensityOptions {
    pub only_stats: bool,
    /// Explicit evaluation grid; an automatic one is built when absent.
    pub grid: Option<Vec<f64>>,
    pub grid_size: usize,
    pub correct_mean: bool,
}

impl Default for DensityOptions {
    fn default() -> Self {
        Self {
            only_stats: false,
            grid: None,
            grid_size: DEFAULT_DENSITY_GRID_SIZE,
            correct_mean: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityGrid {
    pub grid: Vec<f64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogtauDensity {
    pub method: WeightMethod,
    pub correct_mean: bool,
    pub logtau_mean: f64,
    /// Law of total variance over orders.
    pub logtau_std: f64,
    /// `sum_K p[K] sqrt(var[K] + (logtau[K] - mean)^2)`.
    pub logtau_std_alternative: f64,
    /// Log-normal back-transform of the bias-removed mean.
    pub tau_mean: f64,
    pub tau_std: f64,
    pub density: Option<DensityGrid>,
}

fn check_length(field: &'static str, expected: usize, actual: usize) -> Result<(), FilterError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FilterError::TheoryLengthMismatch {
            field,
            expected,
            actual,
        })
    }
}

/// `round(argmin * factor)` with ties to even.
fn scaled_order(argmin: usize, factor: f64) -> usize {
    (argmin as f64 * factor).round_ties_even() as usize
}

fn exp_all(mut values: Vec<f64>) -> Vec<f64> {
    for value in &mut values {
        *value = value.exp();
    }
    values
}

fn automatic_grid(
    mean: &[f64],
    sigma: &[f64],
    weights: &[f64],
    grid_size: usize,
) -> Result<Vec<f64>, FilterError> {
    let peak = weights.iter().copied().fold(0.0, f64::max);
    let floor = DENSITY_WEIGHT_FLOOR * peak;
    let (lower, upper) = weights
        .iter()
        .zip(mean)
        .zip(sigma)
        .filter(|((weight, _), _)| **weight > 0.0 && **weight >= floor)
        .fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lower, upper), ((_, mean), sigma)| {
                (
                    lower.min(mean - DENSITY_SIGMA_SPAN * sigma),
                    upper.max(mean + DENSITY_SIGMA_SPAN * sigma),
                )
            },
        );
    if !lower.is_finite() || !upper.is_finite() {
        return Err(FilterError::InvalidDensityGrid { actual: 0 });
    }
    linear_grid(lower, upper, grid_size).ok_or(FilterError::InvalidDensityGrid { actual: grid_size })
}
