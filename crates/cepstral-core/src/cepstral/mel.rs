use super::moments::BinnedCovariance;
use crate::domain::{AnalysisError, Estimate, UndefinedReason};
use crate::numerics::stable_sum;
use faer::Mat;
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

pub type DenseRealMatrix = Mat<f64>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MelError {
    #[error("filter-bank covariance must contain at least one channel")]
    EmptyCovariance,
    #[error("filter-bank off-diagonal length mismatch: expected {expected}, got {actual}")]
    OffDiagonalLength { expected: usize, actual: usize },
    #[error("filter-bank covariance '{field}' must be finite, index {index} got {value}")]
    NonFiniteCovariance {
        field: &'static str,
        index: usize,
        value: f64,
    },
}

impl From<MelError> for AnalysisError {
    fn from(error: MelError) -> Self {
        AnalysisError::input_validation("INPUT.MEL_COVARIANCE", error.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct MelVariance {
    pub pstar: usize,
    pub channels: usize,
    /// Standard deviation of the reconstructed zero-frequency log-value.
    pub std: Estimate<f64>,
    pub brute_force: Option<MelBruteForce>,
}

#[derive(Debug, Clone)]
pub struct MelBruteForce {
    pub std: f64,
    pub covariance: DenseRealMatrix,
}

/// Closed-form variance; `debug` also runs the brute-force evaluation.
pub fn mel_variance(
    covariance: &BinnedCovariance,
    pstar: usize,
    debug: bool,
) -> Result<MelVariance, MelError> {
    validate_covariance(covariance)?;
    let channels = covariance.channel_count();

    if pstar == 0 || pstar > channels {
        tracing::warn!(pstar, channels, "filter-bank variance order out of range");
        return Ok(MelVariance {
            pstar,
            channels,
            std: Estimate::Undefined(UndefinedReason::CutoffOutOfRange {
                cutoff: pstar.saturating_sub(1),
                len: channels,
            }),
            brute_force: None,
        });
    }

    let variance = closed_form_variance(covariance, pstar);
    let brute_force = if debug {
        Some(mel_variance_brute_force(covariance, pstar)?)
    } else {
        None
    };

    Ok(MelVariance {
        pstar,
        channels,
        std: Estimate::Value(variance.max(0.0).sqrt() / channels as f64),
        brute_force,
    })
}

/// Dense tridiagonal covariance matrix of the channel log-values.
pub fn covariance_matrix(covariance: &BinnedCovariance) -> DenseRealMatrix {
    let channels = covariance.channel_count();
    let mut matrix = DenseRealMatrix::zeros(channels, channels);
    for (index, value) in covariance.diagonal.iter().copied().enumerate() {
        matrix[(index, index)] = value;
    }
    for (index, value) in covariance.off_diagonal.iter().copied().enumerate() {
        matrix[(index, index + 1)] = value;
        matrix[(index + 1, index)] = value;
    }
    matrix
}

/// Direct `sum_{j,i} D_j conj(D_i) cov[j, i]` over the dense matrix.
pub fn mel_variance_brute_force(
    covariance: &BinnedCovariance,
    pstar: usize,
) -> Result<MelBruteForce, MelError> {
    validate_covariance(covariance)?;
    let channels = covariance.channel_count();
    let matrix = covariance_matrix(covariance);
    let step = 2.0 * PI / channels as f64;

    let kernel: Vec<Complex64> = (0..channels)
        .map(|j| {
            let mut value = Complex64::new(1.0, 0.0);
            for n in 1..pstar {
                value += 2.0 * Complex64::from_polar(1.0, step * (n * j) as f64);
            }
            value
        })
        .collect();

    let mut variance = 0.0;
    for j in 0..channels {
        for i in 0..channels {
            variance += (kernel[j] * kernel[i].conj()).re * matrix[(j, i)];
        }
    }

    Ok(MelBruteForce {
        std: variance.max(0.0).sqrt() / channels as f64,
        covariance: matrix,
    })
}

/// Two FFTs of the covariance bands plus `O(P*^2)` scalar work.
fn closed_form_variance(covariance: &BinnedCovariance, pstar: usize) -> f64 {
    let channels = covariance.channel_count();
    let mut alpha = covariance.off_diagonal.clone();
    alpha.push(0.0);

    let fft_diagonal = forward_fft(&covariance.diagonal);
    let fft_alpha = forward_fft(&alpha);
    let wrap = |offset: isize| offset.rem_euclid(channels as isize) as usize;
    let two_pi_over = 2.0 * PI / channels as f64;
    let pi_over = PI / channels as f64;

    let s1 = stable_sum(&covariance.diagonal) + 2.0 * stable_sum(&alpha);

    let s2: f64 = (1..pstar)
        .map(|n| fft_diagonal[n].re + fft_alpha[n].re)
        .sum();

    let mut s3 = 0.0;
    for n in 1..pstar as isize {
        for n1 in 1..pstar as isize {
            s3 += fft_diagonal[wrap(n - n1)].re;
        }
    }

    let s4: f64 = (1..pstar)
        .map(|n| (fft_alpha[n] * Complex64::from_polar(1.0, -two_pi_over * n as f64)).re)
        .sum();

    let mut s5 = 0.0;
    for n in 1..pstar as isize {
        for n1 in 1..pstar as isize {
            let phase = Complex64::from_polar(1.0, -pi_over * (n - n1) as f64);
            s5 += (pi_over * (n + n1) as f64).cos() * (phase * fft_alpha[wrap(n - n1)]).re;
        }
    }

    s1 + 4.0 * (s2 + s3 + s4) + 8.0 * s5
}

fn forward_fft(values: &[f64]) -> Vec<Complex64> {
    let mut buffer: Vec<Complex64> = values
        .iter()
        .map(|&value| Complex64::new(value, 0.0))
        .collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer
}

fn validate_covariance(covariance: &BinnedCovariance) -> Result<(), MelError> {
    let channels = covariance.channel_count();
    if channels == 0 {
        return Err(MelError::EmptyCovariance);
    }
    if covariance.off_diagonal.len() + 1 != channels {
        return Err(MelError::OffDiagonalLength {
            expected: channels - 1,
            actual: covariance.off_diagonal.len(),
        });
    }
    for (field, values) in [
        ("diagonal", &covariance.diagonal),
        ("off_diagonal", &covariance.off_diagonal),
    ] {
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(MelError::NonFiniteCovariance {
                field,
                index,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MelError, covariance_matrix, mel_variance, mel_variance_brute_force};
    use crate::cepstral::moments::{BinnedCovariance, binned_parameters};

    fn synthetic_covariance(channels: usize) -> BinnedCovariance {
        BinnedCovariance {
            diagonal: (0..channels)
                .map(|index| 0.2 + 0.05 * ((index * 7) % 5) as f64)
                .collect(),
            off_diagonal: (0..channels - 1)
                .map(|index| 0.01 + 0.02 * ((index * 3) % 4) as f64)
                .collect(),
        }
    }

    #[test]
    fn closed_form_matches_brute_force_for_every_order() {
        for channels in [1, 2, 5, 9, 16] {
            let covariance = synthetic_covariance(channels);
            for pstar in 1..=channels {
                let result = mel_variance(&covariance, pstar, true).expect("variance");
                let closed = result.std.value_or_nan();
                let brute = result.brute_force.expect("debug path").std;
                assert!(
                    (closed - brute).abs() <= 1.0e-10 * closed.abs().max(1.0e-12),
                    "channels={channels} pstar={pstar}: {closed} vs {brute}"
                );
            }
        }
    }

    #[test]
    fn first_order_variance_is_total_covariance_mass() {
        let covariance = synthetic_covariance(6);
        let result = mel_variance(&covariance, 1, false).expect("variance");
        let total: f64 = covariance.diagonal.iter().sum::<f64>()
            + 2.0 * covariance.off_diagonal.iter().sum::<f64>();
        assert!((result.std.value_or_nan() - total.sqrt() / 6.0).abs() < 1.0e-14);
        assert!(result.brute_force.is_none());
    }

    #[test]
    fn binned_theory_feeds_variance() {
        let edges = [0, 3, 7, 12, 18, 25, 33, 42];
        let theory = binned_parameters(2.0, &edges).expect("binned");
        let result = mel_variance(&theory.covariance, 3, true).expect("variance");
        let brute = mel_variance_brute_force(&theory.covariance, 3).expect("brute force");
        assert!((result.std.value_or_nan() - brute.std).abs() < 1.0e-12);
        assert!(result.std.value_or_nan() > 0.0);
    }

    #[test]
    fn covariance_matrix_is_symmetric_tridiagonal() {
        let covariance = synthetic_covariance(4);
        let matrix = covariance_matrix(&covariance);
        assert_eq!(matrix.nrows(), 4);
        assert_eq!(matrix[(0, 0)], covariance.diagonal[0]);
        assert_eq!(matrix[(1, 2)], covariance.off_diagonal[1]);
        assert_eq!(matrix[(2, 1)], covariance.off_diagonal[1]);
        assert_eq!(matrix[(0, 2)], 0.0);
    }

    #[test]
    fn order_past_channel_count_is_undefined() {
        let covariance = synthetic_covariance(4);
        let result = mel_variance(&covariance, 5, true).expect("no error");
        assert!(result.std.is_undefined());
        assert!(result.brute_force.is_none());
    }

    #[test]
    fn malformed_covariance_is_rejected() {
        let empty = BinnedCovariance {
            diagonal: Vec::new(),
            off_diagonal: Vec::new(),
        };
        assert!(matches!(
            mel_variance(&empty, 1, false),
            Err(MelError::EmptyCovariance)
        ));

        let mismatched = BinnedCovariance {
            diagonal: vec![1.0, 1.0, 1.0],
            off_diagonal: vec![0.1],
        };
        assert!(matches!(
            mel_variance(&mismatched, 1, false),
            Err(MelError::OffDiagonalLength {
                expected: 2,
                actual: 1,
            })
        ));
    }
}
