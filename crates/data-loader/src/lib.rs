//! # Data Loader Crate
//!
//! This crate loads the MovieLens "latest-small" rating dataset and prepares
//! it for model training.
//!
//! ## Main Components
//!
//! - **types**: Raw CSV records, prepared items/ratings, and the `DataIndex`
//! - **parser**: Parse the CSV files into raw records
//! - **index**: Join to canonical item ids, drop unusable rows, average duplicates
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{DataIndex, LoadOptions};
//! use std::path::Path;
//!
//! let (index, report) = DataIndex::load_from_files(
//!     Path::new("data/ml-latest-small"),
//!     &LoadOptions::default().with_sample_fraction(0.5),
//! )?;
//!
//! for rating in index.get_user_ratings(1) {
//!     println!("{} -> {}", rating.item_id, rating.rating);
//! }
//! ```
//!
//! After preparation every rating references an item that has a canonical id
//! and at least one category, and there is at most one rating per
//! (user, item) pair. The index is read-only from then on.

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use index::LoadOptions;
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    ItemId,
    // Raw records
    RawRating,
    RawLink,
    RawMovie,
    RawDataset,
    // Prepared types
    Item,
    Rating,
    RatingScale,
    PrepareReport,
    DataIndex,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn item(id: ItemId, tags: &[&str]) -> Item {
        Item {
            id,
            title: format!("Item {}", id),
            categories: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_data_index_creation() {
        let index = DataIndex::default();
        let (users, items, ratings) = index.counts();

        assert_eq!(users, 0);
        assert_eq!(items, 0);
        assert_eq!(ratings, 0);
        assert_eq!(index.rating_scale(), RatingScale { min: 0.5, max: 5.0 });
    }

    #[test]
    fn test_insert_rating_replaces_pair() {
        let mut index = DataIndex::default();
        index.insert_item(item(7, &["Drama"]));
        index.insert_rating(Rating { user_id: 1, item_id: 7, rating: 2.0 });
        index.insert_rating(Rating { user_id: 1, item_id: 7, rating: 4.0 });

        assert_eq!(index.get_user_ratings(1).len(), 1);
        assert_eq!(index.rating_of(1, 7), Some(4.0));
    }

    #[test]
    fn test_user_ratings_sorted_by_item() {
        let mut index = DataIndex::default();
        for id in [30, 10, 20] {
            index.insert_item(item(id, &["Drama"]));
            index.insert_rating(Rating { user_id: 1, item_id: id, rating: 3.0 });
        }
        let ids: Vec<ItemId> = index.get_user_ratings(1).iter().map(|r| r.item_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert!(index.is_rated(1, 20));
        assert!(!index.is_rated(1, 40));
    }

    #[test]
    fn test_empty_queries() {
        let index = DataIndex::default();

        assert!(index.get_item(999).is_none());
        assert!(index.get_user_ratings(999).is_empty());
        assert_eq!(index.rating_of(999, 1), None);
    }

    #[test]
    fn test_rating_scale_validation() {
        assert!(RatingScale::new(1.0, 5.0).is_ok());
        assert!(RatingScale::new(5.0, 1.0).is_err());
        assert!(RatingScale::new(f64::NAN, 1.0).is_err());
        assert_eq!(RatingScale::default().clamp(7.0), 5.0);
    }

    #[test]
    fn test_validate_catches_unknown_item() {
        let mut index = DataIndex::default();
        index.insert_rating(Rating { user_id: 1, item_id: 3, rating: 3.0 });
        assert!(matches!(index.validate(), Err(DataLoadError::ValidationError(_))));
    }
}
