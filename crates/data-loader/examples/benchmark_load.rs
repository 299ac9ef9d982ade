use data_loader::{DataIndex, LoadOptions};
use std::path::Path;
use std::time::Instant;

fn main() {
    let data_dir = Path::new("data/ml-latest-small");

    println!("Loading MovieLens latest-small dataset...\n");

    let start = Instant::now();
    let (index, report) = DataIndex::load_from_files(data_dir, &LoadOptions::default())
        .expect("Failed to load dataset");
    let elapsed = start.elapsed();

    let (users, items, ratings) = index.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {} ({} cold-start)", users, report.cold_start_users);
    println!("Items: {}", items);
    println!("Ratings: {} ({} duplicates averaged)", ratings, report.duplicate_ratings);
    println!("\nPerformance: {:.0} ratings/second",
             report.raw_ratings as f64 / elapsed.as_secs_f64());
}
