use super::moments::{MomentsError, TheoryTables, multicomponent_parameters};
use crate::domain::{AnalysisError, AnalysisWarning};
use num_complex::Complex64;
use rustfft::FftPlanner;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PeriodogramError {
    #[error("periodogram requires at least one component")]
    NoComponents,
    #[error("component {index} has {actual} samples, expected {expected}")]
    LengthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("periodogram requires at least 2 samples per component, got {actual}")]
    TooShort { actual: usize },
    #[error("component {component} sample {index} must be finite, got {value}")]
    NonFiniteSample {
        component: usize,
        index: usize,
        value: f64,
    },
    #[error("time step must be finite and > 0, got {value}")]
    InvalidTimeStep { value: f64 },
    #[error("periodogram ordinate {index} is not positive ({value}); its logarithm is undefined")]
    NonPositivePower { index: usize, value: f64 },
}

impl From<PeriodogramError> for AnalysisError {
    fn from(error: PeriodogramError) -> Self {
        AnalysisError::input_validation("INPUT.SERIES", error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticomponentPeriodogram {
    pub time_step: f64,
    /// Samples per component actually used (always even).
    pub series_len: usize,
    pub n_components: usize,
    pub frequencies: Vec<f64>,
    pub psd: Vec<f64>,
    pub log_psd: Vec<f64>,
    pub warnings: Vec<AnalysisWarning>,
}

impl MulticomponentPeriodogram {
    /// `psd[k] = dt / N * mean_m |X_m[k]|^2` over the one-sided unwindowed DFT.
    pub fn from_components(
        components: &[Vec<f64>],
        time_step: f64,
    ) -> Result<Self, PeriodogramError> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(PeriodogramError::InvalidTimeStep { value: time_step });
        }
        let first = components.first().ok_or(PeriodogramError::NoComponents)?;
        let original_len = first.len();
        for (index, component) in components.iter().enumerate() {
            if component.len() != original_len {
                return Err(PeriodogramError::LengthMismatch {
                    index,
                    expected: original_len,
                    actual: component.len(),
                });
            }
            if let Some((sample, &value)) = component
                .iter()
                .enumerate()
                .find(|(_, value)| !value.is_finite())
            {
                return Err(PeriodogramError::NonFiniteSample {
                    component: index,
                    index: sample,
                    value,
                });
            }
        }

        let mut warnings = Vec::new();
        let series_len = original_len - original_len % 2;
        if series_len != original_len {
            tracing::warn!(original_len, "odd series length, dropping last sample");
            warnings.push(AnalysisWarning::DroppedTrailingSample { original_len });
        }
        if series_len < 2 {
            return Err(PeriodogramError::TooShort {
                actual: original_len,
            });
        }

        let nf = series_len / 2 + 1;
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(series_len);
        let mut power = vec![0.0; nf];
        let mut buffer = Vec::with_capacity(series_len);

        for component in components {
            buffer.clear();
            buffer.extend(
                component[..series_len]
                    .iter()
                    .map(|&value| Complex64::new(value, 0.0)),
            );
            fft.process(&mut buffer);
            for (accumulated, value) in power.iter_mut().zip(&buffer) {
                *accumulated += value.norm_sqr();
            }
        }

        let scale = time_step / (series_len as f64 * components.len() as f64);
        let psd: Vec<f64> = power.iter().map(|value| value * scale).collect();
        if let Some((index, &value)) = psd.iter().enumerate().find(|(_, value)| **value <= 0.0) {
            return Err(PeriodogramError::NonPositivePower { index, value });
        }

        let frequency_step = 1.0 / (series_len as f64 * time_step);
        Ok(Self {
            time_step,
            series_len,
            n_components: components.len(),
            frequencies: (0..nf).map(|k| k as f64 * frequency_step).collect(),
            log_psd: psd.iter().map(|value| value.ln()).collect(),
            psd,
            warnings,
        })
    }

    pub fn nf(&self) -> usize {
        self.psd.len()
    }

    /// Null-model moments for `n_components` averaged ordinates.
    pub fn theory(&self) -> Result<TheoryTables, MomentsError> {
        multicomponent_parameters(self.nf(), self.n_components as f64)
    }
}
