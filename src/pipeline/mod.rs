//! Pipeline orchestration.
//!
//! A run walks `Idle → Ingesting → Cleaning → FeaturePreparing → Training →
//! Predicting → Exporting → Done`. The first component error moves the run
//! to `Failed` and is returned, tagged with the stage it came from. Nothing
//! is written unless every stage before `Exporting` succeeded.

pub mod config;
pub mod observer;
pub mod state;

use std::path::{Path, PathBuf};

use thiserror::Error as ThisError;

use crate::data::clean::{impute, normalize_category, normalize_dates};
use crate::data::loader::{load_file, merge};
use crate::data::model::Table;
use crate::data::query::load_query;
use crate::data::writer::write_file;
use crate::error::{Error, Result};
use crate::export::export_dashboard;
use crate::ml::features::prepare;
use crate::ml::predict::predict;
use crate::ml::trainer::{train, TrainingReport};

pub use config::PipelineConfig;
pub use observer::{LogLevel, LogObserver, MemoryObserver, PipelineObserver};
pub use state::{RunState, Stage};

/// Column the predictions are merged into.
pub const PREDICTION_COLUMN: &str = "predicted_demand";

/// Inputs of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub file_path: PathBuf,
    pub connection_uri: String,
    pub query: String,
    /// Feature columns, in model order.
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub output_path: PathBuf,
    /// Where to write the dashboard projection after a successful run.
    pub dashboard_path: Option<PathBuf>,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The cleaned table with `predicted_demand` appended, as written.
    pub table: Table,
    pub report: TrainingReport,
    /// Set when the dashboard export ran and failed; the main output stays.
    pub dashboard_error: Option<Error>,
}

/// A run that stopped in `stage` because of `source`.
#[derive(Debug, ThisError)]
#[error("pipeline failed during {stage}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

/// The orchestrator. Owns no data between runs.
pub struct Pipeline<'a> {
    config: PipelineConfig,
    observer: &'a mut dyn PipelineObserver,
    state: RunState,
}

impl<'a> Pipeline<'a> {
    /// Fails with [`Error::Config`] when `config` is out of range, before
    /// any run starts.
    pub fn new(config: PipelineConfig, observer: &'a mut dyn PipelineObserver) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            observer,
            state: RunState::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage of the current (or last) run.
    pub fn stage(&self) -> Stage {
        self.state.current()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Execute every stage in order. Each call starts over from `Idle`.
    pub fn run(
        &mut self,
        request: &PipelineRequest,
    ) -> std::result::Result<PipelineOutcome, PipelineFailure> {
        self.state = RunState::default();

        match self.execute(request) {
            Ok(outcome) => Ok(outcome),
            Err(source) => {
                let stage = self.state.current();
                if let Some((from, to)) = self.state.fail() {
                    self.observer.stage_changed(from, to);
                }
                self.observer.event(
                    LogLevel::Error,
                    &format!("{} failed ({}): {source}", stage, source.kind()),
                );
                Err(PipelineFailure { stage, source })
            }
        }
    }

    fn advance(&mut self) {
        if let Some((from, to)) = self.state.advance() {
            self.observer.stage_changed(from, to);
        }
    }

    fn info(&mut self, message: String) {
        self.observer.event(LogLevel::Info, &message);
    }

    fn execute(&mut self, request: &PipelineRequest) -> Result<PipelineOutcome> {
        self.advance();
        let table = self.ingest(request)?;

        self.advance();
        let mut table = self.clean(table)?;

        self.advance();
        let split = prepare(&table, &request.target_column, &request.feature_columns)?;
        self.info(format!(
            "prepared {} features for target '{}'",
            split.features.n_features(),
            request.target_column
        ));

        self.advance();
        let trainer_config = self.config.trainer_config();
        let (model, report) = train(&split.features, &split.target, &trainer_config)?;
        self.info(format!(
            "model trained on {} rows, held-out mean squared error {}",
            report.train_rows, report.mse
        ));

        self.advance();
        let predictions = predict(&model, &split.features)?;
        table.set_column(predictions.into_column(PREDICTION_COLUMN))?;
        self.info(format!("generated {} predictions", table.n_rows()));

        self.advance();
        write_file(&table, &request.output_path)?;
        self.info(format!(
            "processed data saved to {}",
            request.output_path.display()
        ));

        self.advance();
        let dashboard_error = match &request.dashboard_path {
            Some(path) => self.run_dashboard_export(&table, path),
            None => None,
        };

        Ok(PipelineOutcome {
            table,
            report,
            dashboard_error,
        })
    }

    fn ingest(&mut self, request: &PipelineRequest) -> Result<Table> {
        let file_table = load_file(&request.file_path)?;
        self.info(format!(
            "loaded {} rows from {}",
            file_table.n_rows(),
            request.file_path.display()
        ));
        let query_table = load_query(&request.connection_uri, &request.query)?;
        self.info(format!("loaded {} rows from query", query_table.n_rows()));
        let merged = merge(vec![file_table, query_table])?;
        self.info(format!(
            "ingestion completed: {} rows x {} columns",
            merged.n_rows(),
            merged.n_cols()
        ));
        Ok(merged)
    }

    fn clean(&mut self, table: Table) -> Result<Table> {
        let config = &self.config;
        let table = impute(table, config.impute_policy, &config.impute_columns)?;
        let table = normalize_dates(table, &config.date_column, &config.date_format)?;
        let table = normalize_category(table, &config.category_column)?;
        let message = format!(
            "cleaning completed ({} imputation on {} columns): {} rows",
            self.config.impute_policy,
            self.config.impute_columns.len(),
            table.n_rows()
        );
        self.info(message);
        Ok(table)
    }

    /// Dashboard failures are reported, never propagated.
    fn run_dashboard_export(&mut self, table: &Table, path: &Path) -> Option<Error> {
        match export_dashboard(table, path) {
            Ok(_) => None,
            Err(e) => {
                self.observer.event(
                    LogLevel::Error,
                    &format!("dashboard export to {} failed: {e}", path.display()),
                );
                Some(e)
            }
        }
    }
}
