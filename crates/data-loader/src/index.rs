//! Building the DataIndex from raw MovieLens tables.
//!
//! Preparation joins internal movie ids to canonical TMDb ids, drops what
//! cannot be joined or has no categories, and collapses repeated ratings of
//! the same (user, item) pair into their mean. Nothing here is fatal except
//! failing to read the files themselves.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Knobs applied while preparing the dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub scale: RatingScale,
    /// Fraction of raw rating rows to keep, in [0.0, 1.0]
    pub sample_fraction: f64,
    /// Seed for the subsample; ignored when the fraction is 1.0
    pub seed: u64,
}

impl LoadOptions {
    pub fn with_scale(mut self, scale: RatingScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sample_fraction) {
            return Err(DataLoadError::InvalidValue {
                field: "sample_fraction".to_string(),
                value: self.sample_fraction.to_string(),
            });
        }
        RatingScale::new(self.scale.min, self.scale.max)?;
        Ok(())
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            scale: RatingScale::default(),
            sample_fraction: 1.0,
            seed: 42,
        }
    }
}

impl DataIndex {
    /// Load and prepare the MovieLens dataset from a directory
    ///
    /// The three files are parsed in parallel; any read or parse failure
    /// aborts the load.
    #[instrument(skip(options))]
    pub fn load_from_files(data_dir: &Path, options: &LoadOptions) -> Result<(Self, PrepareReport)> {
        options.validate()?;
        info!("Loading rating dataset from {:?}", data_dir);

        let ratings_path = data_dir.join(parser::RATINGS_FILE);
        let links_path = data_dir.join(parser::LINKS_FILE);
        let movies_path = data_dir.join(parser::MOVIES_FILE);

        let ((links, movies), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_links(&links_path),
                    || parser::parse_movies(&movies_path),
                )
            },
            || parser::parse_ratings(&ratings_path),
        );

        let raw = RawDataset {
            ratings: ratings?,
            links: links?,
            movies: movies?,
        };
        info!(
            "Parsed {} ratings, {} links, {} movies",
            raw.ratings.len(),
            raw.links.len(),
            raw.movies.len()
        );

        let (index, report) = Self::prepare(raw, options)?;
        index.validate()?;
        Ok((index, report))
    }

    /// Join, filter and deduplicate raw tables into a DataIndex
    pub fn prepare(raw: RawDataset, options: &LoadOptions) -> Result<(Self, PrepareReport)> {
        options.validate()?;
        let mut report = PrepareReport {
            raw_ratings: raw.ratings.len(),
            ..Default::default()
        };

        let ratings = subsample(raw.ratings, options.sample_fraction, options.seed);
        report.sampled_ratings = ratings.len();

        // movieId -> tmdbId, first link row wins
        let mut canonical: HashMap<MovieId, ItemId> = HashMap::new();
        for link in &raw.links {
            if let Some(tmdb_id) = link.tmdb_id {
                canonical.entry(link.movie_id).or_insert(tmdb_id);
            }
        }

        let mut index = DataIndex::new(options.scale);
        // Movies whose ratings may survive: mapped, categorized, kept or merged
        let mut rateable: HashSet<MovieId> = HashSet::new();

        let mut movies = raw.movies;
        movies.sort_by_key(|m| m.movie_id);
        for movie in &movies {
            let Some(&item_id) = canonical.get(&movie.movie_id) else {
                report.unmapped_items += 1;
                continue;
            };
            let categories = movie.category_set();
            if categories.is_empty() {
                report.uncategorized_items += 1;
                continue;
            }
            rateable.insert(movie.movie_id);
            if index.items.contains_key(&item_id) {
                report.merged_items += 1;
                continue;
            }
            index.insert_item(Item {
                id: item_id,
                title: movie.title.clone(),
                categories,
            });
        }

        // (user, item) -> (sum, count) for averaging repeated events
        let mut accumulated: BTreeMap<(UserId, ItemId), (f64, u32)> = BTreeMap::new();
        for rating in &ratings {
            index.insert_user(rating.user_id);
            if !options.scale.contains(rating.rating) {
                report.out_of_scale_ratings += 1;
                continue;
            }
            let item_id = match canonical.get(&rating.movie_id) {
                Some(&item_id) if rateable.contains(&rating.movie_id) => item_id,
                _ => {
                    report.dropped_ratings += 1;
                    continue;
                }
            };
            let entry = accumulated.entry((rating.user_id, item_id)).or_insert((0.0, 0));
            entry.0 += rating.rating;
            entry.1 += 1;
        }

        let kept: usize = accumulated.values().map(|(_, count)| *count as usize).sum();
        report.duplicate_ratings = kept - accumulated.len();

        for ((user_id, item_id), (sum, count)) in accumulated {
            index.insert_rating(Rating {
                user_id,
                item_id,
                rating: sum / count as f64,
            });
        }

        report.cold_start_users = index.cold_start_users().count();

        if report.unmapped_items + report.uncategorized_items > 0 {
            warn!(
                "Dropped {} unmappable and {} uncategorized items",
                report.unmapped_items, report.uncategorized_items
            );
        }
        if report.dropped_ratings + report.out_of_scale_ratings > 0 {
            warn!(
                "Dropped {} ratings of unknown items and {} out-of-scale ratings",
                report.dropped_ratings, report.out_of_scale_ratings
            );
        }
        let (users, items, total) = index.counts();
        info!(
            "Prepared {} users ({} cold-start), {} items, {} ratings ({} duplicates averaged)",
            users, report.cold_start_users, items, total, report.duplicate_ratings
        );

        Ok((index, report))
    }

    /// Validate data integrity
    ///
    /// Check that every rating references a known item and lies on the scale.
    pub fn validate(&self) -> Result<()> {
        for rating in self.all_ratings() {
            if !self.items.contains_key(&rating.item_id) {
                return Err(DataLoadError::ValidationError(format!(
                    "rating by user {} references unknown item {}",
                    rating.user_id, rating.item_id
                )));
            }
            if !self.scale.contains(rating.rating) {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating.rating.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Keep `round(fraction * n)` rows chosen by a seeded RNG, in original order
fn subsample(ratings: Vec<RawRating>, fraction: f64, seed: u64) -> Vec<RawRating> {
    if fraction >= 1.0 {
        return ratings;
    }
    let n = ratings.len();
    let amount = ((fraction * n as f64).round() as usize).min(n);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, n, amount).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| ratings[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_rating(user_id: UserId, movie_id: MovieId, rating: f64) -> RawRating {
        RawRating {
            user_id,
            movie_id,
            rating,
            timestamp: 964982703,
        }
    }

    fn link(movie_id: MovieId, tmdb_id: Option<ItemId>) -> RawLink {
        RawLink {
            movie_id,
            imdb_id: None,
            tmdb_id,
        }
    }

    fn movie(movie_id: MovieId, genres: &str) -> RawMovie {
        RawMovie {
            movie_id,
            title: format!("Movie {}", movie_id),
            genres: genres.to_string(),
        }
    }

    fn sample_raw() -> RawDataset {
        RawDataset {
            ratings: vec![
                raw_rating(1, 1, 4.0),
                raw_rating(1, 1, 5.0), // repeated event, averaged
                raw_rating(1, 2, 3.0),
                raw_rating(2, 3, 2.0), // movie 3 has no tmdb id
                raw_rating(2, 4, 5.0), // movie 4 has no genres
                raw_rating(3, 2, 9.0), // out of scale
            ],
            links: vec![link(1, Some(862)), link(2, Some(8844)), link(3, None), link(4, Some(15602))],
            movies: vec![
                movie(1, "Adventure|Animation"),
                movie(2, "Adventure|Fantasy"),
                movie(3, "Comedy"),
                movie(4, NO_CATEGORY_TAG),
            ],
        }
    }

    #[test]
    fn test_prepare_joins_and_dedups() {
        let (index, report) = DataIndex::prepare(sample_raw(), &LoadOptions::default()).unwrap();

        assert_eq!(index.counts(), (3, 2, 2));
        assert_eq!(index.rating_of(1, 862), Some(4.5));
        assert_eq!(index.rating_of(1, 8844), Some(3.0));
        assert!(index.get_item(15602).is_none());

        assert_eq!(report.unmapped_items, 1);
        assert_eq!(report.uncategorized_items, 1);
        assert_eq!(report.dropped_ratings, 2);
        assert_eq!(report.out_of_scale_ratings, 1);
        assert_eq!(report.duplicate_ratings, 1);
        assert_eq!(report.cold_start_users, 2);
    }

    #[test]
    fn test_users_without_surviving_ratings_are_kept() {
        let (index, _) = DataIndex::prepare(sample_raw(), &LoadOptions::default()).unwrap();
        let cold: Vec<UserId> = index.cold_start_users().collect();
        assert_eq!(cold, vec![2, 3]);
        assert!(index.get_user_ratings(2).is_empty());
    }

    #[test]
    fn test_duplicate_tmdb_ids_merge_into_lowest_movie() {
        let raw = RawDataset {
            ratings: vec![raw_rating(1, 10, 2.0), raw_rating(1, 20, 4.0)],
            links: vec![link(10, Some(500)), link(20, Some(500))],
            movies: vec![movie(20, "Drama"), movie(10, "Comedy")],
        };
        let (index, report) = DataIndex::prepare(raw, &LoadOptions::default()).unwrap();

        assert_eq!(report.merged_items, 1);
        let item = index.get_item(500).unwrap();
        assert_eq!(item.title, "Movie 10");
        assert_eq!(index.rating_of(1, 500), Some(3.0));
    }

    #[test]
    fn test_uncategorized_duplicate_does_not_lend_ratings() {
        let raw = RawDataset {
            ratings: vec![raw_rating(1, 10, 1.0), raw_rating(1, 20, 5.0), raw_rating(2, 10, 2.0)],
            links: vec![link(10, Some(500)), link(20, Some(500))],
            movies: vec![movie(10, NO_CATEGORY_TAG), movie(20, "Drama")],
        };
        let (index, report) = DataIndex::prepare(raw, &LoadOptions::default()).unwrap();

        assert_eq!(report.uncategorized_items, 1);
        assert_eq!(report.merged_items, 0);
        assert_eq!(report.dropped_ratings, 2);
        assert_eq!(index.get_item(500).unwrap().title, "Movie 20");
        assert_eq!(index.rating_of(1, 500), Some(5.0));
        assert!(index.get_user_ratings(2).is_empty());
    }

    #[test]
    fn test_subsample_is_deterministic() {
        let ratings: Vec<RawRating> = (0..100).map(|i| raw_rating(i, 1, 3.0)).collect();
        let a = subsample(ratings.clone(), 0.25, 7);
        let b = subsample(ratings.clone(), 0.25, 7);

        assert_eq!(a.len(), 25);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].user_id < w[1].user_id));
        assert_eq!(subsample(ratings, 1.0, 7).len(), 100);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let options = LoadOptions::default().with_sample_fraction(1.5);
        assert!(DataIndex::prepare(sample_raw(), &options).is_err());
    }

    #[test]
    fn test_load_dataset() {
        // This test requires the actual dataset files
        // Place ml-latest-small data in ../../data/ml-latest-small/
        let data_dir = Path::new("../../data/ml-latest-small");

        if data_dir.exists() {
            let (index, _) = DataIndex::load_from_files(data_dir, &LoadOptions::default()).unwrap();
            let (users, items, ratings) = index.counts();

            assert_eq!(users, 610);
            assert!(items > 9000);
            assert!(ratings > 100_000);
        }
    }
}
