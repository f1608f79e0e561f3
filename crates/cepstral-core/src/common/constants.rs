//! Numeric constants shared by the cepstral kernels.
//!
//! Keeping them here avoids ad hoc per-module literals for the closed-form
//! single-component moments.

pub const PI: f64 = std::f64::consts::PI;
pub const LN_2: f64 = std::f64::consts::LN_2;
pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_860_606_512_090_082_402_431_f64;

/// `trigamma(1)`: variance of `ln(chi2_2 / 2)`.
pub const TRIGAMMA_ONE: f64 = PI * PI / 6.0;

/// Half-width of the automatic log-tau density grid, in units of the widest
/// per-order standard deviation.
pub const DENSITY_SIGMA_SPAN: f64 = 5.0;
pub const DEFAULT_DENSITY_GRID_SIZE: usize = 1000;

/// Orders whose Bayesian weight falls below this fraction of the largest
/// weight do not widen the automatic density grid.
pub const DENSITY_WEIGHT_FLOOR: f64 = 1.0e-8;

#[cfg(test)]
mod tests {
    use super::{EULER_GAMMA, LN_2, PI, TRIGAMMA_ONE};

    #[test]
    fn constants_match_expected_relationships() {
        assert!((TRIGAMMA_ONE - 1.644_934_066_848_226_4).abs() <= 1.0e-15);
        assert!((LN_2 - 2.0f64.ln()).abs() <= 1.0e-15);
        assert!((PI - std::f64::consts::PI).abs() <= 1.0e-15);
        assert!((EULER_GAMMA - 0.577_215_664_901_532_9).abs() <= 1.0e-15);
    }
}
