use anyhow::{Context, Result, bail};
use batch::{BatchOrchestrator, PipelineConfig, RunSummary};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{DataIndex, LoadOptions, PrepareReport, RatingScale, UserId};
use models::SvdConfig;
use pipeline::persist::{COLLABORATIVE_TABLE_FILE, CONTENT_TABLE_FILE, TOP_RATED_TABLE_FILE};
use pipeline::{TableRow, read_table};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// ReelRecs - Offline Movie Recommender
#[derive(Parser)]
#[command(name = "reel-recs")]
#[command(about = "Offline content-based and collaborative movie recommender", long_about = None)]
struct Cli {
    /// Path to MovieLens latest-small dataset directory
    #[arg(short, long, default_value = "data/ml-latest-small")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train both models and write the top-N tables
    Train {
        /// Directory the tables and run summary are written to
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Fraction of rating rows to keep, in [0, 1]
        #[arg(long, default_value = "1.0")]
        sample_fraction: f64,

        /// Seed for subsampling and factor initialization
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Latent dimension of the factorization
        #[arg(long, default_value = "100")]
        factors: usize,

        #[arg(long, default_value = "20")]
        epochs: usize,

        #[arg(long, default_value = "0.005")]
        learning_rate: f64,

        #[arg(long, default_value = "0.02")]
        regularization: f64,

        /// Keep raw factorization estimates instead of clipping to the rating scale
        #[arg(long)]
        no_clamp: bool,

        #[arg(long, default_value = "0.5")]
        min_rating: f64,

        #[arg(long, default_value = "5.0")]
        max_rating: f64,
    },

    /// Show one user's rows from a written table
    Show {
        #[arg(long, value_enum)]
        table: TableKind,

        #[arg(long)]
        user_id: UserId,

        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Maximum number of rows to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Load the dataset and print what preparation kept and dropped
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableKind {
    Content,
    Collab,
    TopRated,
}

impl TableKind {
    fn file_name(self) -> &'static str {
        match self {
            TableKind::Content => CONTENT_TABLE_FILE,
            TableKind::Collab => COLLABORATIVE_TABLE_FILE,
            TableKind::TopRated => TOP_RATED_TABLE_FILE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Train {
            output_dir,
            sample_fraction,
            seed,
            factors,
            epochs,
            learning_rate,
            regularization,
            no_clamp,
            min_rating,
            max_rating,
        } => {
            let scale = RatingScale::new(min_rating, max_rating)?;
            let svd = SvdConfig::default()
                .with_factors(factors)
                .with_epochs(epochs)
                .with_learning_rate(learning_rate)
                .with_regularization(regularization)
                .with_clamp(!no_clamp);
            let config = PipelineConfig::default()
                .with_data_dir(cli.data_dir)
                .with_output_dir(output_dir)
                .with_sample_fraction(sample_fraction)
                .with_scale(scale)
                .with_svd(svd)
                .with_seed(seed);
            handle_train(config).await?
        }
        Commands::Show {
            table,
            user_id,
            output_dir,
            limit,
        } => handle_show(output_dir, table, user_id, limit)?,
        Commands::Stats => handle_stats(cli.data_dir)?,
    }

    Ok(())
}

/// Handle the 'train' command
async fn handle_train(config: PipelineConfig) -> Result<()> {
    println!("Training on {}...", config.data_dir.display());
    let output_dir = config.output_dir.clone();
    let orchestrator = BatchOrchestrator::new(config)?;

    let start = Instant::now();
    let summary = orchestrator.run().await?;
    println!("{} Finished in {:?}", "✓".green(), start.elapsed());

    print_summary(&summary);
    println!("Tables written to {}", output_dir.display());
    Ok(())
}

/// Handle the 'show' command
fn handle_show(output_dir: PathBuf, table: TableKind, user_id: UserId, limit: usize) -> Result<()> {
    let path = output_dir.join(table.file_name());
    let (column, rows) = read_table(&path)
        .with_context(|| format!("Run `reel-recs train` first to create {}", path.display()))?;

    let wanted = user_id.to_string();
    let user_rows: Vec<&TableRow> = rows
        .iter()
        .filter(|r| r.user_id == wanted)
        .take(limit)
        .collect();
    if user_rows.is_empty() {
        bail!("User {} has no rows in {}", user_id, path.display());
    }

    print!("{}", format!("User {} ({}):\n", user_id, table.file_name()).bold().blue());
    for (i, row) in user_rows.iter().enumerate() {
        println!(
            "{}. item {:<8} {} {:.3}",
            (i + 1).to_string().green(),
            row.item_id,
            column,
            row.value
        );
    }
    info!("Printed {} rows for user {}", user_rows.len(), user_id);
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(data_dir: PathBuf) -> Result<()> {
    println!("Loading MovieLens dataset from {}...", data_dir.display());
    let start = Instant::now();
    let (index, report) = DataIndex::load_from_files(&data_dir, &LoadOptions::default())
        .context("Failed to load MovieLens dataset")?;
    println!("{} Loaded dataset in {:?}", "✓".green(), start.elapsed());

    let (users, items, ratings) = index.counts();
    print!("{}", "Dataset:\n".bold().blue());
    println!("{}Users: {}", "• ".cyan(), users);
    println!("{}Items: {}", "• ".cyan(), items);
    println!("{}Ratings: {}", "• ".cyan(), ratings);
    print_preparation(&report);
    Ok(())
}

fn print_preparation(report: &PrepareReport) {
    print!("{}", "Preparation:\n".bold().blue());
    println!("{}Raw ratings: {}", "• ".green(), report.raw_ratings);
    println!("{}Sampled ratings: {}", "• ".green(), report.sampled_ratings);
    println!("{}Unmapped items: {}", "• ".yellow(), report.unmapped_items);
    println!("{}Uncategorized items: {}", "• ".yellow(), report.uncategorized_items);
    println!("{}Merged items: {}", "• ".yellow(), report.merged_items);
    println!("{}Dropped ratings: {}", "• ".yellow(), report.dropped_ratings);
    println!("{}Out-of-scale ratings: {}", "• ".yellow(), report.out_of_scale_ratings);
    println!("{}Averaged duplicates: {}", "• ".yellow(), report.duplicate_ratings);
    println!("{}Cold-start users: {}", "• ".yellow(), report.cold_start_users);
}

fn print_summary(summary: &RunSummary) {
    print!("{}", "Run summary:\n".bold().blue());
    println!(
        "{}{} users, {} items, {} ratings",
        "• ".cyan(),
        summary.users,
        summary.items,
        summary.ratings
    );
    println!("{}Categories: {}", "• ".cyan(), summary.vocabulary.join(", "));
    println!(
        "{}Content models: {} ({} cold-start users)",
        "• ".cyan(),
        summary.content_models,
        summary.cold_start_users
    );
    println!(
        "{}Content in-sample RMSE: {}",
        "• ".cyan(),
        format_rmse(summary.content_in_sample_rmse)
    );
    println!(
        "{}Collaborative training RMSE: {}",
        "• ".cyan(),
        format_rmse(summary.collaborative_training_rmse)
    );
    println!(
        "{}Rows: content {}, collaborative {}, top-rated {}",
        "• ".cyan(),
        summary.content_rows,
        summary.collaborative_rows,
        summary.top_rated_rows
    );
    print_preparation(&summary.preparation);
}

fn format_rmse(rmse: Option<f64>) -> String {
    rmse.map(|v| format!("{:.4}", v))
        .unwrap_or_else(|| "n/a".to_string())
}
