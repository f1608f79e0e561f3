use super::CliError;
use super::helpers::{AnalysisInput, compute_error, load_analysis_input, write_json_report};
use cepstral_core::cepstral::{
    AicCurve, AicType, AicWeights, CosFilter, LogtauDensity, MulticomponentPeriodogram, PsdScan,
    TauScan, WeightMethod,
};
use cepstral_core::config::{AnalysisConfig, BayesianConfig, load_analysis_config};
use cepstral_core::domain::AnalysisWarning;
use serde::Serialize;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct AnalyzeArgs {
    /// Input JSON: `{"logPsd": [...]}` or `{"series": [[...], ...], "timeStep": dt}`
    #[arg(long)]
    input: PathBuf,

    /// Analysis config JSON; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// AIC variant (`aic` or `aicc`)
    #[arg(long)]
    aic_type: Option<String>,

    /// Factor applied to the AIC-minimizing order
    #[arg(long)]
    kmin_corrfactor: Option<f64>,

    /// Explicit cutoff replacing the AIC-selected order
    #[arg(long)]
    k_psd: Option<usize>,

    /// Periodogram components averaged per ordinate (log-PSD input only)
    #[arg(long)]
    n_components: Option<f64>,

    /// Bayesian model averaging over cutoffs (`ba` or `min`)
    #[arg(long)]
    bayesian: Option<String>,

    /// Comma-separated cutoffs for the reconstruction scan
    #[arg(long, value_delimiter = ',')]
    cutoff_scan: Vec<usize>,

    /// Report zero-mean log values instead of adding back the theoretical bias
    #[arg(long)]
    no_mean_correction: bool,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn resolve_config(&self) -> Result<AnalysisConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => load_analysis_config(path).map_err(compute_error)?,
            None => AnalysisConfig::default(),
        };

        if let Some(aic_type) = &self.aic_type {
            config.aic_type = aic_type.parse::<AicType>().map_err(compute_error)?;
        }
        if let Some(kmin_corrfactor) = self.kmin_corrfactor {
            config.kmin_corrfactor = kmin_corrfactor;
        }
        if let Some(k_psd) = self.k_psd {
            config.k_psd = Some(k_psd);
        }
        if let Some(n_components) = self.n_components {
            config.n_components = n_components;
        }
        if let Some(method) = &self.bayesian {
            let method = method.parse::<WeightMethod>().map_err(compute_error)?;
            let bayesian = config.bayesian.get_or_insert_with(BayesianConfig::default);
            bayesian.method = method;
        }
        if !self.cutoff_scan.is_empty() {
            config.cutoff_scan = self.cutoff_scan.clone();
        }
        if self.no_mean_correction {
            config.correct_mean = false;
        }

        config.validate().map_err(compute_error)?;
        Ok(config)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReport<'a> {
    config: &'a AnalysisConfig,
    nf: usize,
    periodogram: Option<&'a MulticomponentPeriodogram>,
    coefficients: &'a [f64],
    aic: &'a AicCurve,
    aic_argmin: usize,
    tau_scan: &'a TauScan,
    psd_scan: Option<&'a PsdScan>,
    aic_weights: Option<&'a AicWeights>,
    logtau_density: Option<&'a LogtauDensity>,
    warnings: Vec<AnalysisWarning>,
}

pub(super) fn run_analyze_command(args: AnalyzeArgs) -> Result<i32, CliError> {
    let config = args.resolve_config()?;
    tracing::debug!(
        aic_type = %config.aic_type,
        kmin_corrfactor = config.kmin_corrfactor,
        k_psd = ?config.k_psd,
        correct_mean = config.correct_mean,
        "resolved analysis config"
    );

    let (log_psd, periodogram) = match load_analysis_input(&args.input)? {
        AnalysisInput::LogPsd(log_psd) => (log_psd, None),
        AnalysisInput::Series {
            components,
            time_step,
        } => {
            let periodogram = MulticomponentPeriodogram::from_components(&components, time_step)
                .map_err(compute_error)?;
            (periodogram.log_psd.clone(), Some(periodogram))
        }
    };

    // Series input fixes the component count; it overrides `nComponents`.
    let theory = match &periodogram {
        Some(periodogram) => periodogram.theory(),
        None => config.theory(log_psd.len()),
    }
    .map_err(compute_error)?;

    tracing::debug!(nf = log_psd.len(), series = periodogram.is_some(), "loaded input");

    let mut filter =
        CosFilter::new(&log_psd, config.filter_options(theory)).map_err(compute_error)?;
    let tau_scan = filter
        .scan_filter_tau(config.k_psd, config.correct_mean)
        .map_err(compute_error)?;
    let psd_scan = if config.cutoff_scan.is_empty() {
        None
    } else {
        Some(
            filter
                .scan_filter_psd(&config.cutoff_scan, config.correct_mean)
                .map_err(compute_error)?,
        )
    };

    let logtau_density = match (&config.bayesian, config.density_options()) {
        (Some(bayesian), Some(options)) => {
            filter
                .compute_p_aic(bayesian.method)
                .map_err(compute_error)?;
            Some(
                filter
                    .compute_logtau_density(&options)
                    .map_err(compute_error)?,
            )
        }
        _ => None,
    };

    let mut warnings: Vec<AnalysisWarning> = periodogram
        .iter()
        .flat_map(|periodogram| periodogram.warnings.iter().cloned())
        .collect();
    warnings.extend(filter.warnings().iter().cloned());
    warnings.extend(tau_scan.warnings.iter().cloned());
    if let Some(scan) = &psd_scan {
        warnings.extend(scan.warnings.iter().cloned());
    }
    for warning in &warnings {
        eprintln!("WARNING: {warning}");
    }

    println!("{tau_scan}");
    if let Some(density) = &logtau_density {
        println!(
            "  Bayesian ({}): L_0 = {:.6} +/- {:.6}   S_0 = {:.6} +/- {:.6}",
            density.method,
            density.logtau_mean,
            density.logtau_std,
            density.tau_mean,
            density.tau_std
        );
    }

    if let Some(report_path) = &args.report {
        let report = AnalysisReport {
            config: &config,
            nf: filter.nf(),
            periodogram: periodogram.as_ref(),
            coefficients: filter.coefficients(),
            aic: filter.aic(),
            aic_argmin: filter.aic_argmin(),
            tau_scan: &tau_scan,
            psd_scan: psd_scan.as_ref(),
            aic_weights: filter.p_aic(),
            logtau_density: logtau_density.as_ref(),
            warnings,
        };
        write_json_report(report_path, &report)?;
        tracing::debug!(path = %report_path.display(), "wrote JSON report");
        println!("JSON report: {}", report_path.display());
    }

    Ok(0)
}
