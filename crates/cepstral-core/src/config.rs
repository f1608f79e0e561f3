use crate::cepstral::{
    AicType, CosFilterOptions, DensityOptions, MomentsError, TheoryTables, WeightMethod,
    multicomponent_parameters,
};
use crate::common::constants::DEFAULT_DENSITY_GRID_SIZE;
use crate::domain::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub aic_type: AicType,
    #[serde(default = "default_kmin_corrfactor")]
    pub kmin_corrfactor: f64,
    /// Number of independent periodogram components averaged per ordinate.
    #[serde(default = "default_n_components")]
    pub n_components: f64,
    /// Explicit cutoff replacing the AIC-selected order.
    #[serde(default)]
    pub k_psd: Option<usize>,
    #[serde(default = "default_correct_mean")]
    pub correct_mean: bool,
    #[serde(default)]
    pub bayesian: Option<BayesianConfig>,
    #[serde(default)]
    pub cutoff_scan: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BayesianConfig {
    #[serde(default)]
    pub method: WeightMethod,
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    #[serde(default)]
    pub only_stats: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            aic_type: AicType::Aic,
            kmin_corrfactor: default_kmin_corrfactor(),
            n_components: default_n_components(),
            k_psd: None,
            correct_mean: default_correct_mean(),
            bayesian: None,
            cutoff_scan: Vec::new(),
        }
    }
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            method: WeightMethod::BayesianAkaike,
            grid_size: default_grid_size(),
            only_stats: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.kmin_corrfactor.is_finite() || self.kmin_corrfactor < 0.0 {
            return Err(ConfigError::Invalid {
                field: "kminCorrfactor",
                message: format!("must be finite and >= 0, got {}", self.kmin_corrfactor),
            });
        }
        if !self.n_components.is_finite() || self.n_components < 0.5 {
            return Err(ConfigError::Invalid {
                field: "nComponents",
                message: format!("must be finite and >= 0.5, got {}", self.n_components),
            });
        }
        if let Some(bayesian) = &self.bayesian {
            if !bayesian.only_stats && bayesian.grid_size < 2 {
                return Err(ConfigError::Invalid {
                    field: "bayesian.gridSize",
                    message: format!("must be >= 2, got {}", bayesian.grid_size),
                });
            }
        }
        Ok(())
    }

    /// Null-model tables for `nf` frequency bins and `n_components`.
    pub fn theory(&self, nf: usize) -> Result<TheoryTables, MomentsError> {
        multicomponent_parameters(nf, self.n_components)
    }

    pub fn filter_options(&self, theory: TheoryTables) -> CosFilterOptions {
        CosFilterOptions::default()
            .with_theory(theory)
            .with_aic_type(self.aic_type)
            .with_kmin_corrfactor(self.kmin_corrfactor)
    }

    pub fn density_options(&self) -> Option<DensityOptions> {
        self.bayesian.as_ref().map(|bayesian| DensityOptions {
            only_stats: bayesian.only_stats,
            grid: None,
            grid_size: bayesian.grid_size,
            correct_mean: self.correct_mean,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read analysis config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse analysis config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid analysis config field '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl From<ConfigError> for AnalysisError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Read { .. } => AnalysisError::io_system("IO.CONFIG", error.to_string()),
            ConfigError::Parse { .. } | ConfigError::Invalid { .. } => {
                AnalysisError::input_validation("INPUT.CONFIG", error.to_string())
            }
        }
    }
}

pub fn load_analysis_config(config_path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    let config: AnalysisConfig =
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

fn default_kmin_corrfactor() -> f64 {
    1.0
}

fn default_n_components() -> f64 {
    1.0
}

fn default_correct_mean() -> bool {
    true
}

fn default_grid_size() -> usize {
    DEFAULT_DENSITY_GRID_SIZE
}

#[cfg(test)]
mod tests {
    use super::{AnalysisConfig, BayesianConfig, ConfigError, load_analysis_config};
    use crate::cepstral::{AicType, WeightMethod};
    use crate::domain::{AnalysisError, ErrorCategory};
    use std::fs;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("analysis.json");
        fs::write(&path, contents).expect("config should be written");
        (temp, path)
    }

    #[test]
    fn empty_object_yields_defaults() {
        let (_temp, path) = write_config("{}");
        let config = load_analysis_config(&path).expect("config should load");
        assert_eq!(config, AnalysisConfig::default());
        assert!(config.correct_mean);
        assert!(config.density_options().is_none());
    }

    #[test]
    fn camel_case_fields_are_parsed() {
        let (_temp, path) = write_config(
            r#"{
                "aicType": "aicc",
                "kminCorrfactor": 1.5,
                "nComponents": 3,
                "kPsd": 7,
                "correctMean": false,
                "bayesian": { "method": "min", "onlyStats": true },
                "cutoffScan": [0, 4, 8]
            }"#,
        );
        let config = load_analysis_config(&path).expect("config should load");
        assert_eq!(config.aic_type, AicType::Aicc);
        assert_eq!(config.kmin_corrfactor, 1.5);
        assert_eq!(config.n_components, 3.0);
        assert_eq!(config.k_psd, Some(7));
        assert_eq!(config.cutoff_scan, vec![0, 4, 8]);
        assert_eq!(
            config.bayesian,
            Some(BayesianConfig {
                method: WeightMethod::Minimum,
                grid_size: 1000,
                only_stats: true,
            })
        );

        let density = config.density_options().expect("density options");
        assert!(density.only_stats);
        assert!(!density.correct_mean);

        let theory = config.theory(9).expect("theory");
        let options = config.filter_options(theory.clone());
        assert_eq!(options.aic_type, AicType::Aicc);
        assert_eq!(options.ck_theory_var, Some(theory.ck_var));
    }

    #[test]
    fn unknown_aic_type_is_a_parse_error() {
        let (_temp, path) = write_config(r#"{ "aicType": "bic" }"#);
        let error = load_analysis_config(&path).expect_err("unknown aic type");
        assert!(matches!(error, ConfigError::Parse { .. }));
        let analysis: AnalysisError = error.into();
        assert_eq!(analysis.category(), ErrorCategory::InputValidation);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let (_temp, path) = write_config(r#"{ "kminCorrfactor": -0.5 }"#);
        assert!(matches!(
            load_analysis_config(&path),
            Err(ConfigError::Invalid {
                field: "kminCorrfactor",
                ..
            })
        ));

        let (_temp, path) = write_config(r#"{ "nComponents": 0.25 }"#);
        assert!(matches!(
            load_analysis_config(&path),
            Err(ConfigError::Invalid {
                field: "nComponents",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = load_analysis_config(temp.path().join("absent.json")).expect_err("missing");
        assert!(matches!(error, ConfigError::Read { .. }));
        let analysis: AnalysisError = error.into();
        assert_eq!(analysis.category(), ErrorCategory::IoSystem);
        assert_eq!(analysis.exit_code(), 3);
    }
}
