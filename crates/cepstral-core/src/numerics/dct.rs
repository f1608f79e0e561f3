use num_complex::Complex64;
use rustfft::FftPlanner;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DctError {
    #[error("type-I DCT requires at least 2 samples, got {actual}")]
    InsufficientPoints { actual: usize },
}

/// Unnormalized type-I discrete cosine transform:
/// `y[k] = x[0] + (-1)^k x[n-1] + 2 * sum_{j=1}^{n-2} x[j] cos(pi k j / (n-1))`.
///
/// Evaluated as the real part of the FFT of the even extension
/// `[x0, x1, .., x(n-1), x(n-2), .., x1]` of length `2(n-1)`. Applying it
/// twice returns the input scaled by `2(n-1)`.
pub fn dct_type1(input: &[f64]) -> Result<Vec<f64>, DctError> {
    let len = input.len();
    if len < 2 {
        return Err(DctError::InsufficientPoints { actual: len });
    }

    let period = 2 * (len - 1);
    let mut buffer: Vec<Complex64> = Vec::with_capacity(period);
    buffer.extend(input.iter().map(|&value| Complex64::new(value, 0.0)));
    buffer.extend(
        input[1..len - 1]
            .iter()
            .rev()
            .map(|&value| Complex64::new(value, 0.0)),
    );

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(period);
    fft.process(&mut buffer);

    Ok(buffer.iter().take(len).map(|value| value.re).collect())
}
