//! Example: fit and inspect one user's content model
//!
//! Run with: cargo run --package models --example train_user -- 1
//!
//! This example shows how to:
//! 1. Load the MovieLens dataset
//! 2. Build the category vocabulary and item features
//! 3. Fit a single user's ridge model with its cross-validated alpha
//! 4. Display the highest-scoring unrated items

use data_loader::{DataIndex, LoadOptions, UserId};
use models::{CategoryVocabulary, ContentModelTrainer, ItemFeatureMatrix};
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let user_id: UserId = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(1);

    println!("=== ReelRecs Content Model Example ===\n");

    let start = Instant::now();
    let (index, _) = DataIndex::load_from_files(
        Path::new("data/ml-latest-small"),
        &LoadOptions::default(),
    )?;
    println!("Loaded dataset in {:?}", start.elapsed());

    let vocabulary = CategoryVocabulary::from_items(index.items());
    let features = ItemFeatureMatrix::build(&index, &vocabulary);
    println!("{} categories: {}", vocabulary.len(), vocabulary.tags().join(", "));

    let start = Instant::now();
    let Some(model) = ContentModelTrainer::new().train_user(&index, &features, user_id)? else {
        println!("User {} has no ratings; no content model.", user_id);
        return Ok(());
    };
    println!(
        "Fitted user {} on {} ratings in {:?} (alpha = {}, {:?})",
        user_id,
        model.rating_count,
        start.elapsed(),
        model.alpha(),
        model.selection.strategy
    );

    println!("\nCategory weights:");
    for (tag, weight) in vocabulary.tags().iter().zip(model.model.coefficients().iter()) {
        println!("  {:<20} {:+.3}", tag, weight);
    }

    let mut unrated: Vec<(f64, String)> = index
        .items()
        .filter(|item| !index.is_rated(user_id, item.id))
        .filter_map(|item| {
            let vector = features.vector(item.id)?;
            Some((model.model.predict_one(vector), item.title.clone()))
        })
        .collect();
    unrated.sort_by(|a, b| b.0.total_cmp(&a.0));

    println!("\nTop 10 unrated items:");
    for (i, (score, title)) in unrated.iter().take(10).enumerate() {
        println!("  {}. {} ({:.2})", i + 1, title, score);
    }
    Ok(())
}
