use crate::domain::AnalysisError;
use crate::numerics::{digamma, trigamma};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MomentsError {
    #[error("theoretical moments require at least 2 frequency bins, got {actual}")]
    TooFewBins { actual: usize },
    #[error("number of components must be finite and >= 0.5, got {value}")]
    InvalidComponents { value: f64 },
    #[error("filter-bank moments require at least 4 bin edges, got {actual}")]
    TooFewEdges { actual: usize },
    #[error(
        "filter-bank edges must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasingEdges {
        index: usize,
        previous: usize,
        current: usize,
    },
}

impl From<MomentsError> for AnalysisError {
    fn from(error: MomentsError) -> Self {
        AnalysisError::input_validation("INPUT.THEORY", error.to_string())
    }
}

/// Per-bin null-model moments used by the cepstral filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TheoryTables {
    /// Variance of each cepstral coefficient.
    pub ck_var: Vec<f64>,
    /// Expected bias of each log-periodogram bin.
    pub psd_mean: Vec<f64>,
}

/// Covariance of the filter-bank channel log-values: tridiagonal, because only
/// adjacent triangular windows overlap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinnedCovariance {
    pub diagonal: Vec<f64>,
    pub off_diagonal: Vec<f64>,
}

impl BinnedCovariance {
    pub fn channel_count(&self) -> usize {
        self.diagonal.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinnedTheory {
    pub tables: TheoryTables,
    pub covariance: BinnedCovariance,
}

/// Interior ordinates are `chi2_{2n} / 2n`; the zero and Nyquist bins are
/// `chi2_n / n`, so the cepstral variance doubles exactly at both ends.
pub fn multicomponent_parameters(
    nf: usize,
    n_components: f64,
) -> Result<TheoryTables, MomentsError> {
    if nf < 2 {
        return Err(MomentsError::TooFewBins { actual: nf });
    }
    validate_components(n_components)?;

    let n = 2.0 * (nf - 1) as f64;
    let trigamma_n = trigamma(n_components);
    let interior_bias = digamma(n_components) - n_components.ln();
    let half = 0.5 * n_components;
    let boundary_bias = digamma(half) - half.ln();

    let mut ck_var = vec![trigamma_n / n; nf];
    ck_var[0] = 2.0 * trigamma_n / n;
    ck_var[nf - 1] = 2.0 * trigamma_n / n;

    let mut psd_mean = vec![interior_bias; nf];
    psd_mean[0] = boundary_bias;
    psd_mean[nf - 1] = boundary_bias;

    Ok(TheoryTables { ck_var, psd_mean })
}

/// Moments for a filter bank whose channel `i` spans the periodogram bins
/// `edges[i]..=edges[i + 2]` (triangular windows centred on `edges[i + 1]`).
pub fn binned_parameters(n_components: f64, edges: &[usize]) -> Result<BinnedTheory, MomentsError> {
    if edges.len() < 4 {
        return Err(MomentsError::TooFewEdges {
            actual: edges.len(),
        });
    }
    validate_components(n_components)?;
    for index in 1..edges.len() {
        if edges[index] <= edges[index - 1] {
            return Err(MomentsError::NonIncreasingEdges {
                index,
                previous: edges[index - 1],
                current: edges[index],
            });
        }
    }

    let channels = edges.len() - 2;
    let trigamma_n = trigamma(n_components);

    let inverse_widths: Vec<f64> = edges
        .windows(3)
        .map(|window| 1.0 / (window[2] - window[0] + 1) as f64)
        .collect();
    let diagonal: Vec<f64> = inverse_widths
        .iter()
        .map(|inverse| inverse * trigamma_n)
        .collect();
    let off_diagonal: Vec<f64> = (0..channels - 1)
        .map(|index| {
            let shared = (edges[index + 2] - edges[index + 1] + 1) as f64;
            shared * inverse_widths[index] * inverse_widths[index + 1] * trigamma_n
        })
        .collect();

    let n = 2.0 * (channels - 1) as f64;
    let mut ck_var = vec![trigamma_n / n; channels];
    ck_var[0] = 2.0 * trigamma_n / n;
    ck_var[channels - 1] = 2.0 * trigamma_n / n;
    let psd_mean = vec![digamma(n_components) - n_components.ln(); channels];

    Ok(BinnedTheory {
        tables: TheoryTables { ck_var, psd_mean },
        covariance: BinnedCovariance {
            diagonal,
            off_diagonal,
        },
    })
}

/// Variance of `logtau[K]`: coefficient weights are 1 at both ends and 2 in
/// the interior, so interior variances enter with a factor 4.
pub fn logtau_theoretical_variance(ck_var: &[f64]) -> Vec<f64> {
    let len = ck_var.len();
    let mut variance = Vec::with_capacity(len);
    let Some(&first) = ck_var.first() else {
        return variance;
    };

    variance.push(first);
    if len == 1 {
        return variance;
    }

    let mut running = first;
    for &value in &ck_var[1..len - 1] {
        running += 4.0 * value;
        variance.push(running);
    }
    variance.push(running + ck_var[len - 1]);
    variance
}

fn validate_components(n_components: f64) -> Result<(), MomentsError> {
    if !n_components.is_finite() || n_components < 0.5 {
        return Err(MomentsError::InvalidComponents {
            value: n_components,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        MomentsError, binned_parameters, logtau_theoretical_variance, multicomponent_parameters,
    };
    use crate::common::constants::{EULER_GAMMA, LN_2, PI, TRIGAMMA_ONE};

    #[test]
    fn single_component_tables_match_closed_forms() {
        let nf = 65;
        let n = 128.0;
        let tables = multicomponent_parameters(nf, 1.0).expect("tables");

        assert!((tables.ck_var[0] - PI * PI / 3.0 / n).abs() < 1.0e-14);
        assert!((tables.ck_var[1] - PI * PI / 6.0 / n).abs() < 1.0e-14);
        assert!((tables.psd_mean[0] + EULER_GAMMA + LN_2).abs() < 1.0e-12);
        assert!((tables.psd_mean[10] + EULER_GAMMA).abs() < 1.0e-12);
        assert_eq!(tables.psd_mean[0], tables.psd_mean[nf - 1]);
    }

    #[test]
    fn boundary_variance_is_exactly_double() {
        for n_components in [0.5, 1.0, 2.0, 3.0, 7.5, 40.0] {
            let tables = multicomponent_parameters(33, n_components).expect("tables");
            let interior = tables.ck_var[1];
            assert_eq!(tables.ck_var[0], 2.0 * interior);
            assert_eq!(tables.ck_var[32], 2.0 * interior);
            assert!(tables.ck_var[1..32].iter().all(|value| *value == interior));
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert_eq!(
            multicomponent_parameters(1, 1.0),
            Err(MomentsError::TooFewBins { actual: 1 })
        );
        assert_eq!(
            multicomponent_parameters(10, 0.25),
            Err(MomentsError::InvalidComponents { value: 0.25 })
        );
        assert!(matches!(
            multicomponent_parameters(10, f64::NAN),
            Err(MomentsError::InvalidComponents { .. })
        ));
    }

    #[test]
    fn logtau_variance_reproduces_single_component_closed_form() {
        let nf = 17;
        let n = 2.0 * (nf - 1) as f64;
        let tables = multicomponent_parameters(nf, 1.0).expect("tables");
        let variance = logtau_theoretical_variance(&tables.ck_var);

        for (k, value) in variance.iter().enumerate().take(nf - 1) {
            let expected = PI * PI / 3.0 / n * (2 * k + 1) as f64;
            assert!((value - expected).abs() < 1.0e-12, "K={k}");
        }
        assert!((variance[nf - 1] - PI * PI / 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn logtau_variance_handles_short_tables() {
        assert!(logtau_theoretical_variance(&[]).is_empty());
        assert_eq!(logtau_theoretical_variance(&[2.0]), vec![2.0]);
        assert_eq!(logtau_theoretical_variance(&[2.0, 1.0]), vec![2.0, 3.0]);
        assert_eq!(
            logtau_theoretical_variance(&[2.0, 1.0, 1.0, 2.0]),
            vec![2.0, 6.0, 10.0, 12.0]
        );
    }

    #[test]
    fn binned_parameters_follow_bin_widths() {
        let edges = [0, 2, 5, 9, 14];
        let theory = binned_parameters(1.0, &edges).expect("binned");

        assert_eq!(theory.covariance.channel_count(), 3);
        assert!((theory.covariance.diagonal[0] - TRIGAMMA_ONE / 6.0).abs() < 1.0e-14);
        assert!((theory.covariance.diagonal[1] - TRIGAMMA_ONE / 8.0).abs() < 1.0e-14);
        assert!((theory.covariance.diagonal[2] - TRIGAMMA_ONE / 10.0).abs() < 1.0e-14);

        assert_eq!(theory.covariance.off_diagonal.len(), 2);
        let expected_first = 4.0 / 6.0 / 8.0 * TRIGAMMA_ONE;
        let expected_second = 5.0 / 8.0 / 10.0 * TRIGAMMA_ONE;
        assert!((theory.covariance.off_diagonal[0] - expected_first).abs() < 1.0e-14);
        assert!((theory.covariance.off_diagonal[1] - expected_second).abs() < 1.0e-14);

        let ck_var = &theory.tables.ck_var;
        assert_eq!(ck_var.len(), 3);
        assert_eq!(ck_var[0], 2.0 * ck_var[1]);
        assert_eq!(ck_var[2], 2.0 * ck_var[1]);
        assert!(
            theory
                .tables
                .psd_mean
                .iter()
                .all(|value| (value + EULER_GAMMA).abs() < 1.0e-12)
        );
    }

    #[test]
    fn binned_parameters_validate_edges() {
        assert_eq!(
            binned_parameters(1.0, &[0, 1, 2]),
            Err(MomentsError::TooFewEdges { actual: 3 })
        );
        assert_eq!(
            binned_parameters(1.0, &[0, 3, 3, 8]),
            Err(MomentsError::NonIncreasingEdges {
                index: 2,
                previous: 3,
                current: 3,
            })
        );
    }
}
