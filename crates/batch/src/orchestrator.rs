//! # Batch Orchestrator
//!
//! This module coordinates one offline run of the recommender:
//! 1. Load and prepare the rating data (fatal on failure)
//! 2. Encode item categories into feature vectors
//! 3. Train the content models and the factorization model in parallel
//! 4. Evaluate the content models in-sample
//! 5. Rank per-user top-N lists for both model families and for observed ratings
//! 6. Persist the three tables and a JSON run summary
//!
//! Both training stages are CPU-bound, so each runs on the blocking pool via
//! `spawn_blocking` while `tokio::join!` waits on the pair. Nothing is
//! written until every table has been computed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use data_loader::{DataIndex, PrepareReport};
use models::{
    CategoryVocabulary, ContentModelTrainer, ContentModels, FactorizationModel, ItemFeatureMatrix,
    SvdTrainer,
};
use pipeline::persist::{
    COLLABORATIVE_TABLE_FILE, CONTENT_TABLE_FILE, RATING_COLUMN, SCORE_COLUMN, TOP_RATED_TABLE_FILE,
};
use pipeline::{
    EvaluationReport, TOP_N, TopNTable, collaborative_top_n, content_top_n, evaluate_in_sample,
    top_rated, write_file_atomic, write_top_n,
};

use crate::config::PipelineConfig;

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Wall-clock time of each stage, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub load_ms: u64,
    pub encode_ms: u64,
    pub train_ms: u64,
    pub evaluate_ms: u64,
    pub rank_ms: u64,
    pub persist_ms: u64,
    pub total_ms: u64,
}

/// What a run did, written next to the tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub users: usize,
    pub items: usize,
    pub ratings: usize,
    pub preparation: PrepareReport,
    pub vocabulary: Vec<String>,
    pub content_models: usize,
    pub cold_start_users: usize,
    pub content_in_sample_rmse: Option<f64>,
    pub collaborative_training_rmse: Option<f64>,
    pub content_rows: usize,
    pub collaborative_rows: usize,
    pub top_rated_rows: usize,
    pub top_n: usize,
    pub timings: StageTimings,
}

/// Output of both training stages
struct TrainedModels {
    content: ContentModels,
    collaborative: FactorizationModel,
}

/// The three ranked tables, computed before anything is written
struct RankedTables {
    content: TopNTable,
    collaborative: TopNTable,
    top_rated: TopNTable,
}

/// Drives a full batch run from raw files to persisted tables
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    config: PipelineConfig,
}

impl BatchOrchestrator {
    /// Create an orchestrator, rejecting invalid settings up front
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and return the summary that was written
    pub async fn run(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut timings = StageTimings::default();

        // Load
        let stage = Instant::now();
        let (index, preparation) = self.load_data().await?;
        timings.load_ms = elapsed_ms(stage.elapsed());

        // Encode
        let stage = Instant::now();
        let vocabulary = CategoryVocabulary::from_items(index.items());
        let features = Arc::new(ItemFeatureMatrix::build(&index, &vocabulary));
        timings.encode_ms = elapsed_ms(stage.elapsed());
        info!(
            "Encoded {} items over {} categories",
            features.num_items(),
            features.num_features()
        );

        // Train
        let stage = Instant::now();
        let trained = self.train_models(index.clone(), features.clone()).await?;
        timings.train_ms = elapsed_ms(stage.elapsed());

        // Evaluate
        let stage = Instant::now();
        let evaluation = evaluate_in_sample(&index, &trained.content, &features);
        let collaborative_rmse = trained.collaborative.training_rmse(&index);
        timings.evaluate_ms = elapsed_ms(stage.elapsed());
        info!("Collaborative training RMSE {:?}", collaborative_rmse);

        // Rank
        let stage = Instant::now();
        let tables = rank_tables(&index, &trained, &features)?;
        timings.rank_ms = elapsed_ms(stage.elapsed());

        // Persist
        let stage = Instant::now();
        self.persist_tables(&tables)?;
        timings.persist_ms = elapsed_ms(stage.elapsed());

        timings.total_ms = elapsed_ms(start_time.elapsed());
        let summary = build_summary(
            &index,
            preparation,
            &vocabulary,
            &trained,
            &evaluation,
            collaborative_rmse,
            &tables,
            timings,
        );
        self.write_summary(&summary)?;

        info!(
            "Run finished in {:.2?}: {} content rows, {} collaborative rows, {} top-rated rows",
            start_time.elapsed(),
            summary.content_rows,
            summary.collaborative_rows,
            summary.top_rated_rows
        );
        Ok(summary)
    }

    /// Load the dataset on the blocking pool; any failure aborts the run
    #[instrument(skip(self))]
    async fn load_data(&self) -> Result<(Arc<DataIndex>, PrepareReport)> {
        let data_dir = self.config.data_dir.clone();
        let options = self.config.load_options();
        let (index, report) = tokio::task::spawn_blocking(move || {
            DataIndex::load_from_files(&data_dir, &options)
        })
        .await
        .context("Data loading task panicked")?
        .with_context(|| format!("Failed to load data from {}", self.config.data_dir.display()))?;

        if report.cold_start_users > 0 {
            warn!(
                "{} users have no usable ratings and will get no content model",
                report.cold_start_users
            );
        }
        Ok((Arc::new(index), report))
    }

    /// Train the content models and the factorization model in parallel
    #[instrument(skip_all)]
    async fn train_models(
        &self,
        index: Arc<DataIndex>,
        features: Arc<ItemFeatureMatrix>,
    ) -> Result<TrainedModels> {
        let svd = SvdTrainer::new(self.config.svd);

        let (content_result, collaborative_result) = tokio::join!(
            tokio::task::spawn_blocking({
                let index = index.clone();
                let features = features.clone();
                move || ContentModelTrainer::new().train(&index, &features)
            }),
            tokio::task::spawn_blocking({
                let index = index.clone();
                move || svd.fit(&index)
            })
        );

        // Unwrap the spawn_blocking results, then the inner model results
        let content = content_result
            .context("Content training task panicked")?
            .context("Content model training failed")?;
        let collaborative = collaborative_result
            .context("Factorization task panicked")?
            .context("Factorization training failed")?;

        Ok(TrainedModels {
            content,
            collaborative,
        })
    }

    fn table_path(&self, file: &str) -> PathBuf {
        self.config.output_dir.join(file)
    }

    #[instrument(skip_all)]
    fn persist_tables(&self, tables: &RankedTables) -> Result<()> {
        let outputs = [
            (CONTENT_TABLE_FILE, SCORE_COLUMN, &tables.content),
            (COLLABORATIVE_TABLE_FILE, SCORE_COLUMN, &tables.collaborative),
            (TOP_RATED_TABLE_FILE, RATING_COLUMN, &tables.top_rated),
        ];
        for (file, column, table) in outputs {
            let path = self.table_path(file);
            write_top_n(&path, column, table)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }

    fn write_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = self.table_path(RUN_SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        write_file_atomic(&path, json.as_bytes())
    }
}

#[instrument(skip_all)]
fn rank_tables(
    index: &DataIndex,
    trained: &TrainedModels,
    features: &ItemFeatureMatrix,
) -> Result<RankedTables> {
    Ok(RankedTables {
        content: content_top_n(index, &trained.content, features, TOP_N)?,
        collaborative: collaborative_top_n(index, &trained.collaborative, TOP_N)?,
        top_rated: top_rated(index, TOP_N),
    })
}

#[allow(clippy::too_many_arguments)]
fn build_summary(
    index: &DataIndex,
    preparation: PrepareReport,
    vocabulary: &CategoryVocabulary,
    trained: &TrainedModels,
    evaluation: &EvaluationReport,
    collaborative_rmse: Option<f64>,
    tables: &RankedTables,
    timings: StageTimings,
) -> RunSummary {
    let (users, items, ratings) = index.counts();
    RunSummary {
        users,
        items,
        ratings,
        preparation,
        vocabulary: vocabulary.tags().to_vec(),
        content_models: trained.content.len(),
        cold_start_users: trained.content.cold_start_users().len(),
        content_in_sample_rmse: evaluation.rmse,
        collaborative_training_rmse: collaborative_rmse,
        content_rows: tables.content.num_rows(),
        collaborative_rows: tables.collaborative.num_rows(),
        top_rated_rows: tables.top_rated.num_rows(),
        top_n: TOP_N,
        timings,
    }
}

fn elapsed_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
