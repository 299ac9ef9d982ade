//! Core domain types for the rating dataset.
//!
//! Raw records mirror the MovieLens CSV files one-to-one. Prepared types
//! (`Item`, `Rating`) only ever carry canonical external identifiers and
//! are what every model downstream consumes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DataLoadError, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Internal MovieLens movie identifier (only meaningful inside the raw files)
pub type MovieId = u32;

/// Canonical external item identifier (the TMDb id)
pub type ItemId = u32;

/// Tag carried by MovieLens for movies without any genre
pub const NO_CATEGORY_TAG: &str = "(no genres listed)";

// =============================================================================
// Raw records, as found in the CSV files
// =============================================================================

/// One line of `ratings.csv`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    pub rating: f64,
    /// Unix timestamp when rating was made (unused by the models)
    pub timestamp: i64,
}

/// One line of `links.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    #[serde(rename = "imdbId")]
    pub imdb_id: Option<String>,
    /// Empty in the source file for a handful of movies
    #[serde(rename = "tmdbId")]
    pub tmdb_id: Option<ItemId>,
}

/// One line of `movies.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMovie {
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    pub title: String,
    /// Pipe-separated genre list, e.g. `Adventure|Animation|Children`
    pub genres: String,
}

impl RawMovie {
    /// Split the genre column into a tag set, ignoring the "no genres" marker.
    pub fn category_set(&self) -> BTreeSet<String> {
        self.genres
            .split('|')
            .map(str::trim)
            .filter(|tag| !tag.is_empty() && *tag != NO_CATEGORY_TAG)
            .map(str::to_string)
            .collect()
    }
}

/// The three raw tables, before any joining
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub ratings: Vec<RawRating>,
    pub links: Vec<RawLink>,
    pub movies: Vec<RawMovie>,
}

// =============================================================================
// Prepared types
// =============================================================================

/// An item that survived preparation: canonical id plus a non-empty category set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub categories: BTreeSet<String>,
}

/// A single deduplicated rating keyed by canonical item id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
}

/// Closed interval every rating value must lie in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl RatingScale {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(DataLoadError::InvalidValue {
                field: "rating_scale".to_string(),
                value: format!("[{}, {}]", min, max),
            });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 0.5, max: 5.0 }
    }
}

/// Counters describing what preparation dropped or merged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareReport {
    pub raw_ratings: usize,
    pub sampled_ratings: usize,
    pub unmapped_items: usize,
    pub uncategorized_items: usize,
    pub merged_items: usize,
    pub dropped_ratings: usize,
    pub out_of_scale_ratings: usize,
    pub duplicate_ratings: usize,
    pub cold_start_users: usize,
}

// =============================================================================
// DataIndex - the prepared, read-only rating table
// =============================================================================

/// Holds the prepared dataset and the lookups every stage needs.
///
/// Users are tracked independently from ratings so that a user whose every
/// rating was dropped still exists (as a cold-start user). Everything is kept
/// in ordered maps so iteration order is deterministic across runs.
#[derive(Debug, Clone)]
pub struct DataIndex {
    pub(crate) scale: RatingScale,
    pub(crate) users: BTreeSet<UserId>,
    pub(crate) items: BTreeMap<ItemId, Item>,
    /// Ratings made by each user, sorted by item id, one per item
    pub(crate) user_ratings: BTreeMap<UserId, Vec<Rating>>,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new(scale: RatingScale) -> Self {
        Self {
            scale,
            users: BTreeSet::new(),
            items: BTreeMap::new(),
            user_ratings: BTreeMap::new(),
        }
    }

    pub fn rating_scale(&self) -> RatingScale {
        self.scale
    }

    /// All known users in ascending order, including those without ratings
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.iter().copied()
    }

    /// Users that have no ratings at all
    pub fn cold_start_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users
            .iter()
            .copied()
            .filter(|user_id| self.get_user_ratings(*user_id).is_empty())
    }

    /// All items in ascending id order
    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.items.values()
    }

    pub fn get_item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Get all ratings made by a user, sorted by item id
    ///
    /// Returns an empty slice if user has no ratings
    pub fn get_user_ratings(&self, user_id: UserId) -> &[Rating] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Observed rating for a (user, item) pair
    pub fn rating_of(&self, user_id: UserId, item_id: ItemId) -> Option<f64> {
        let ratings = self.get_user_ratings(user_id);
        ratings
            .binary_search_by_key(&item_id, |r| r.item_id)
            .ok()
            .map(|pos| ratings[pos].rating)
    }

    pub fn is_rated(&self, user_id: UserId, item_id: ItemId) -> bool {
        self.rating_of(user_id, item_id).is_some()
    }

    /// Every observed rating in (user, item) order
    pub fn all_ratings(&self) -> impl Iterator<Item = &Rating> + '_ {
        self.user_ratings.values().flatten()
    }

    // Mutators - used by preparation and by test fixtures

    /// Register a user, with or without ratings
    pub fn insert_user(&mut self, user_id: UserId) {
        self.users.insert(user_id);
    }

    pub fn insert_item(&mut self, item: Item) {
        self.items.insert(item.id, item);
    }

    /// Insert a rating, replacing any previous value for the same pair
    pub fn insert_rating(&mut self, rating: Rating) {
        self.users.insert(rating.user_id);
        let ratings = self.user_ratings.entry(rating.user_id).or_default();
        match ratings.binary_search_by_key(&rating.item_id, |r| r.item_id) {
            Ok(pos) => ratings[pos] = rating,
            Err(pos) => ratings.insert(pos, rating),
        }
    }

    /// Get counts for debugging/validation: (users, items, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_ratings = self.user_ratings.values().map(|v| v.len()).sum();
        (self.users.len(), self.items.len(), total_ratings)
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new(RatingScale::default())
    }
}
