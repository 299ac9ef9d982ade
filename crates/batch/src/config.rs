//! Settings for one batch run.

use anyhow::{Context, Result, bail};
use data_loader::{LoadOptions, RatingScale};
use models::SvdConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a run needs besides the fixed constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding ratings.csv, links.csv and movies.csv
    pub data_dir: PathBuf,
    /// Where the tables and the run summary are written
    pub output_dir: PathBuf,
    pub sample_fraction: f64,
    pub seed: u64,
    pub scale: RatingScale,
    pub svd: SvdConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/ml-latest-small"),
            output_dir: PathBuf::from("output"),
            sample_fraction: 1.0,
            seed: 42,
            scale: RatingScale::default(),
            svd: SvdConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = fraction;
        self
    }

    /// Seeds both the subsample and the factor initialization
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.svd = self.svd.with_seed(seed);
        self
    }

    pub fn with_scale(mut self, scale: RatingScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_svd(mut self, svd: SvdConfig) -> Self {
        self.svd = svd;
        self
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::default()
            .with_scale(self.scale)
            .with_sample_fraction(self.sample_fraction)
            .with_seed(self.seed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            bail!("Output directory must not be empty");
        }
        self.load_options()
            .validate()
            .context("Invalid data preparation settings")?;
        self.svd
            .validate()
            .context("Invalid factorization settings")?;
        Ok(())
    }
}
