use crate::domain::{AnalysisError, Estimate, UndefinedReason};
use crate::numerics::{DctError, dct_type1};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("cepstral transform requires at least 2 frequency bins, got {actual}")]
    InsufficientPoints { actual: usize },
}

impl From<DctError> for TransformError {
    fn from(error: DctError) -> Self {
        match error {
            DctError::InsufficientPoints { actual } => Self::InsufficientPoints { actual },
        }
    }
}

impl From<TransformError> for AnalysisError {
    fn from(error: TransformError) -> Self {
        AnalysisError::input_validation("INPUT.LOG_PSD", error.to_string())
    }
}

/// `c_k = DCT-I(x)[k] * 0.5 / (NF - 1)`; a second DCT-I of the coefficients
/// reproduces the input.
pub fn forward_cepstral_transform(log_psd: &[f64]) -> Result<Vec<f64>, TransformError> {
    let mut coefficients = dct_type1(log_psd)?;
    let scale = 0.5 / (log_psd.len() - 1) as f64;
    for value in &mut coefficients {
        *value *= scale;
    }
    Ok(coefficients)
}

/// Smoothed log-spectrum keeping the coefficients `0..=cutoff`
/// (`None` keeps all of them).
///
/// A cutoff past the last coefficient is reported as undefined, not an error.
pub fn truncated_reconstruction_psd(
    log_psd: &[f64],
    cutoff: Option<usize>,
) -> Result<Estimate<Vec<f64>>, TransformError> {
    let coefficients = forward_cepstral_transform(log_psd)?;
    reconstruct_from_cepstrum(&coefficients, cutoff)
}

/// Inverse of [`forward_cepstral_transform`] after zeroing every coefficient
/// above `cutoff`.
pub fn reconstruct_from_cepstrum(
    coefficients: &[f64],
    cutoff: Option<usize>,
) -> Result<Estimate<Vec<f64>>, TransformError> {
    let len = coefficients.len();
    if len < 2 {
        return Err(TransformError::InsufficientPoints { actual: len });
    }

    let mut truncated = coefficients.to_vec();
    if let Some(cutoff) = cutoff {
        if cutoff >= len {
            tracing::warn!(cutoff, len, "cepstral reconstruction cutoff out of range");
            return Ok(Estimate::Undefined(UndefinedReason::CutoffOutOfRange {
                cutoff,
                len,
            }));
        }
        truncated[cutoff + 1..].fill(0.0);
    }

    Ok(Estimate::Value(dct_type1(&truncated)?))
}

/// `logtau[K]`: zero-frequency value of the reconstruction truncated at `K`.
pub fn cumulative_reconstruction(log_psd: &[f64]) -> Result<Vec<f64>, TransformError> {
    let coefficients = forward_cepstral_transform(log_psd)?;
    Ok(cumulative_from_cepstrum(&coefficients))
}

/// Partial sums `c0`, `c0 + 2c1`, ..., with the last coefficient counted once.
pub fn cumulative_from_cepstrum(coefficients: &[f64]) -> Vec<f64> {
    let len = coefficients.len();
    let mut cumulative = Vec::with_capacity(len);
    let Some(&first) = coefficients.first() else {
        return cumulative;
    };

    cumulative.push(first);
    if len == 1 {
        return cumulative;
    }

    let mut running = first;
    for &coefficient in &coefficients[1..len - 1] {
        running += 2.0 * coefficient;
        cumulative.push(running);
    }
    cumulative.push(running + coefficients[len - 1]);
    cumulative
}

#[cfg(test)]
mod tests {
    use super::{
        TransformError, cumulative_from_cepstrum, cumulative_reconstruction,
        forward_cepstral_transform, truncated_reconstruction_psd,
    };
    use crate::domain::{Estimate, UndefinedReason};

    fn sample(len: usize) -> Vec<f64> {
        (0..len)
            .map(|index| {
                let x = index as f64;
                (0.37 * x).sin() + 0.1 * (1.3 * x).cos() - 0.02 * x
            })
            .collect()
    }

    #[test]
    fn forward_transform_rejects_single_bin() {
        assert_eq!(
            forward_cepstral_transform(&[1.0]),
            Err(TransformError::InsufficientPoints { actual: 1 })
        );
    }

    #[test]
    fn forward_transform_of_constant_is_that_constant_in_c0() {
        let coefficients = forward_cepstral_transform(&[1.5; 17]).expect("transform");
        assert!((coefficients[0] - 1.5).abs() < 1.0e-12);
        assert!(coefficients[1..].iter().all(|value| value.abs() < 1.0e-12));
    }

    #[test]
    fn untruncated_reconstruction_round_trips() {
        for len in [2, 3, 10, 33, 64] {
            let input = sample(len);
            let full = truncated_reconstruction_psd(&input, Some(len - 1))
                .expect("reconstruction")
                .into_value()
                .expect("in range");
            let unbounded = truncated_reconstruction_psd(&input, None)
                .expect("reconstruction")
                .into_value()
                .expect("in range");
            for ((lhs, rhs), original) in full.iter().zip(&unbounded).zip(&input) {
                assert!((lhs - original).abs() < 1.0e-10);
                assert!((rhs - original).abs() < 1.0e-10);
            }
        }
    }

    #[test]
    fn cutoff_zero_reconstruction_is_flat_at_c0() {
        let input = sample(12);
        let c0 = forward_cepstral_transform(&input).expect("transform")[0];
        let flat = truncated_reconstruction_psd(&input, Some(0))
            .expect("reconstruction")
            .into_value()
            .expect("in range");
        assert!(flat.iter().all(|value| (value - c0).abs() < 1.0e-12));
    }

    #[test]
    fn out_of_range_cutoff_is_undefined_not_an_error() {
        let input = sample(8);
        let result = truncated_reconstruction_psd(&input, Some(8)).expect("no error");
        assert_eq!(
            result,
            Estimate::Undefined(UndefinedReason::CutoffOutOfRange { cutoff: 8, len: 8 })
        );
    }

    #[test]
    fn cumulative_last_entry_recovers_first_bin() {
        let input = sample(21);
        let coefficients = forward_cepstral_transform(&input).expect("transform");
        let cumulative = cumulative_reconstruction(&input).expect("cumulative");

        let last = coefficients.len() - 1;
        let interior: f64 = coefficients[1..last].iter().sum();
        let expected = coefficients[0] + 2.0 * interior + coefficients[last];

        assert!((cumulative[last] - expected).abs() < 1.0e-12);
        assert!((cumulative[last] - input[0]).abs() < 1.0e-10);
    }

    #[test]
    fn cumulative_entries_match_truncated_zero_frequency_values() {
        let input = sample(15);
        let cumulative = cumulative_reconstruction(&input).expect("cumulative");
        for (cutoff, value) in cumulative.iter().enumerate() {
            let reconstruction = truncated_reconstruction_psd(&input, Some(cutoff))
                .expect("reconstruction")
                .into_value()
                .expect("in range");
            assert!((reconstruction[0] - value).abs() < 1.0e-10, "K={cutoff}");
        }
    }

    #[test]
    fn cumulative_handles_two_coefficients() {
        assert_eq!(cumulative_from_cepstrum(&[1.0, 0.5]), vec![1.0, 1.5]);
        assert!(cumulative_from_cepstrum(&[]).is_empty());
    }
}
