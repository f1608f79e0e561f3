pub mod errors;

pub use errors::{AnalysisError, AnalysisResult, ErrorCategory};

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Why a computed quantity has no numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum UndefinedReason {
    /// The truncation order points past the last cepstral coefficient.
    CutoffOutOfRange { cutoff: usize, len: usize },
}

impl Display for UndefinedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CutoffOutOfRange { cutoff, len } => {
                write!(f, "cutoff {cutoff} is out of range for {len} coefficients")
            }
        }
    }
}

/// A quantity that was computed but may be mathematically undefined.
///
/// Quantities that were never computed are `Option::None` at the call site and
/// failed computations are `Err`, so `Estimate` only distinguishes a value from
/// a reported undefined result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "value")]
pub enum Estimate<T> {
    Value(T),
    Undefined(UndefinedReason),
}

impl<T> Estimate<T> {
    pub const fn is_defined(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Undefined(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Undefined(_) => None,
        }
    }

    pub fn undefined_reason(&self) -> Option<UndefinedReason> {
        match self {
            Self::Value(_) => None,
            Self::Undefined(reason) => Some(*reason),
        }
    }

    pub fn as_ref(&self) -> Estimate<&T> {
        match self {
            Self::Value(value) => Estimate::Value(value),
            Self::Undefined(reason) => Estimate::Undefined(*reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Estimate<U> {
        match self {
            Self::Value(value) => Estimate::Value(f(value)),
            Self::Undefined(reason) => Estimate::Undefined(reason),
        }
    }
}

impl Estimate<f64> {
    /// Plotting helper: undefined estimates render as NaN.
    pub fn value_or_nan(&self) -> f64 {
        match self {
            Self::Value(value) => *value,
            Self::Undefined(_) => f64::NAN,
        }
    }
}

impl Estimate<Vec<f64>> {
    pub fn to_vec_or_nan(&self, len: usize) -> Vec<f64> {
        match self {
            Self::Value(values) => values.clone(),
            Self::Undefined(_) => vec![f64::NAN; len],
        }
    }
}

/// Non-fatal condition attached to the result it affected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AnalysisWarning {
    CutoffOutOfRange {
        context: &'static str,
        cutoff: usize,
        len: usize,
    },
    /// AICc is undefined for every order from `from` on.
    AiccUndefinedTail { from: usize, len: usize },
    DroppedTrailingSample { original_len: usize },
}

impl Display for AnalysisWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CutoffOutOfRange {
                context,
                cutoff,
                len,
            } => write!(f, "{context} ({cutoff}) is out of range (NF = {len})"),
            Self::AiccUndefinedTail { from, len } => write!(
                f,
                "AICc is undefined for orders {from}..{len} (K >= NF-2)"
            ),
            Self::DroppedTrailingSample { original_len } => write!(
                f,
                "series length {original_len} is odd, last sample dropped"
            ),
        }
    }
}
