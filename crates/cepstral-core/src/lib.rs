pub mod cepstral;
pub mod common;
pub mod config;
pub mod domain;
pub mod numerics;

pub use cepstral::{
    AicCurve, AicType, AicWeights, CosFilter, CosFilterOptions, DensityOptions, FilterError,
    LogtauDensity, MelVariance, MulticomponentPeriodogram, PsdScan, TauScan, WeightMethod,
};
pub use config::{AnalysisConfig, load_analysis_config};
pub use domain::{
    AnalysisError, AnalysisResult, AnalysisWarning, ErrorCategory, Estimate, UndefinedReason,
};
