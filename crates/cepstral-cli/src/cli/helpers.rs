use super::CliError;
use anyhow::Context;
use cepstral_core::domain::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct InputDocument {
    #[serde(default)]
    log_psd: Option<Vec<f64>>,
    #[serde(default)]
    series: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    time_step: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum AnalysisInput {
    LogPsd(Vec<f64>),
    Series {
        components: Vec<Vec<f64>>,
        time_step: f64,
    },
}

pub(super) fn compute_error(error: impl Into<AnalysisError>) -> CliError {
    CliError::Compute(error.into())
}

pub(super) fn load_analysis_input(path: &Path) -> Result<AnalysisInput, CliError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read analysis input '{}'", path.display()))?;
    let document: InputDocument = serde_json::from_str(&content).map_err(|source| {
        compute_error(AnalysisError::input_validation(
            "INPUT.DOCUMENT",
            format!("failed to parse analysis input '{}': {source}", path.display()),
        ))
    })?;

    match (document.log_psd, document.series) {
        (Some(log_psd), None) => Ok(AnalysisInput::LogPsd(log_psd)),
        (None, Some(components)) => Ok(AnalysisInput::Series {
            components,
            time_step: document.time_step.unwrap_or(1.0),
        }),
        _ => Err(compute_error(AnalysisError::input_validation(
            "INPUT.DOCUMENT",
            format!(
                "analysis input '{}' must contain exactly one of 'logPsd' or 'series'",
                path.display()
            ),
        ))),
    }
}

pub(super) fn write_json_report(path: &Path, report: &impl Serialize) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    let content =
        serde_json::to_string_pretty(report).context("failed to serialize analysis report")?;
    fs::write(path, content)
        .with_context(|| format!("failed to write analysis report '{}'", path.display()))?;
    Ok(())
}
