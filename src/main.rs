use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use stock_forecast::data::MissingValuePolicy;
use stock_forecast::ml::TrainingReport;
use stock_forecast::pipeline::{LogObserver, Pipeline, PipelineConfig, PipelineRequest};

/// Forecast per-product demand from a flat file and a SQL source.
#[derive(Parser, Debug)]
#[command(name = "stock-forecast", version, about, long_about = None)]
struct Cli {
    /// Inventory file (.csv, .json or .parquet)
    #[arg(long)]
    file: PathBuf,

    /// Database URI, e.g. sqlite:///inventory.db
    #[arg(long)]
    db_uri: String,

    /// Query whose rows are appended to the file's rows
    #[arg(long)]
    query: String,

    /// Feature columns in model order, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,

    /// Column to predict
    #[arg(long)]
    target: String,

    /// Where to write the processed table
    #[arg(short, long)]
    output: PathBuf,

    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the dashboard projection here
    #[arg(long)]
    dashboard: Option<PathBuf>,

    /// Missing-value policy: mean, median or drop (overrides the config file)
    #[arg(long)]
    impute_policy: Option<String>,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    output: &'a PathBuf,
    rows: usize,
    report: TrainingReport,
    dashboard: Option<&'a PathBuf>,
}

/// Exit status when the pipeline succeeded but the dashboard export did not.
const DASHBOARD_FAILED: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(policy) = &cli.impute_policy {
        config.impute_policy = policy.parse::<MissingValuePolicy>()?;
    }

    let request = PipelineRequest {
        file_path: cli.file,
        connection_uri: cli.db_uri,
        query: cli.query,
        feature_columns: cli.features,
        target_column: cli.target,
        output_path: cli.output,
        dashboard_path: cli.dashboard,
    };

    let mut observer = LogObserver;
    let outcome = Pipeline::new(config, &mut observer)?.run(&request)?;

    let summary = RunSummary {
        output: &request.output_path,
        rows: outcome.table.n_rows(),
        report: outcome.report,
        dashboard: request.dashboard_path.as_ref(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(err) = outcome.dashboard_error {
        log::error!("pipeline output is complete but the dashboard export failed: {err}");
        return Ok(ExitCode::from(DASHBOARD_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}
