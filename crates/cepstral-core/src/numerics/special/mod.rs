use std::f64::consts::PI;

const TRIGAMMA_ASYMPTOTIC_THRESHOLD: f64 = 20.0;

/// Digamma function `psi(x) = d/dx ln Gamma(x)`.
pub fn digamma(x: f64) -> f64 {
    statrs::function::gamma::digamma(x)
}

/// Trigamma function `psi_1(x) = d^2/dx^2 ln Gamma(x)` for `x > 0`.
///
/// Returns NaN for non-positive or non-finite arguments.
pub fn trigamma(x: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 {
        return f64::NAN;
    }

    let mut shifted = x;
    let mut accumulated = 0.0;
    while shifted < TRIGAMMA_ASYMPTOTIC_THRESHOLD {
        accumulated += 1.0 / (shifted * shifted);
        shifted += 1.0;
    }

    let inv = 1.0 / shifted;
    let inv2 = inv * inv;
    // 1/x + 1/(2x^2) + B2/x^3 + B4/x^5 + B6/x^7 + B8/x^9 + B10/x^11
    let series = inv
        + 0.5 * inv2
        + inv
            * inv2
            * (1.0 / 6.0
                + inv2
                    * (-1.0 / 30.0
                        + inv2 * (1.0 / 42.0 + inv2 * (-1.0 / 30.0 + inv2 * (5.0 / 66.0)))));

    accumulated + series
}

/// Normal probability density with mean `mean` and standard deviation `sigma`.
pub fn gaussian_pdf(x: f64, mean: f64, sigma: f64) -> f64 {
    let z = (x - mean) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
}
