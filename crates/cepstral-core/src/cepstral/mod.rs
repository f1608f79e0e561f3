pub mod aic;
pub mod filter;
pub mod mel;
pub mod moments;
pub mod periodogram;
pub mod transform;

pub use aic::{AicCurve, AicError, AicType, AicWeights, GridStatistics, WeightMethod};
pub use filter::{
    CosFilter, CosFilterOptions, DensityGrid, DensityOptions, FilterError, LogtauDensity,
    PsdColumn, PsdScan, TauScan,
};
pub use mel::{DenseRealMatrix, MelBruteForce, MelError, MelVariance};
pub use moments::{
    BinnedCovariance, BinnedTheory, MomentsError, TheoryTables, binned_parameters,
    logtau_theoretical_variance, multicomponent_parameters,
};
pub use periodogram::{MulticomponentPeriodogram, PeriodogramError};
pub use transform::{
    TransformError, cumulative_reconstruction, forward_cepstral_transform,
    truncated_reconstruction_psd,
};
