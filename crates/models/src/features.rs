//! Category feature encoding.
//!
//! The vocabulary is computed once from the prepared item set and frozen
//! before any model trains. Tags are ordered lexicographically, so the
//! same item set always produces the same vectors.

use data_loader::{DataIndex, Item, ItemId};
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::{BTreeSet, HashMap};

/// Binary vector over the vocabulary: 1.0 where the item carries the tag
pub type CategoryVector = Array1<f64>;

/// Sorted set of every distinct category tag
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryVocabulary {
    tags: Vec<String>,
    positions: HashMap<String, usize>,
}

impl CategoryVocabulary {
    /// Build the vocabulary from every item's categories
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let tags: BTreeSet<&str> = items
            .into_iter()
            .flat_map(|item| item.categories.iter().map(String::as_str))
            .collect();
        let tags: Vec<String> = tags.into_iter().map(str::to_string).collect();
        let positions = tags
            .iter()
            .enumerate()
            .map(|(pos, tag)| (tag.clone(), pos))
            .collect();
        Self { tags, positions }
    }

    /// Number of features, i.e. the length of every encoded vector
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn position(&self, tag: &str) -> Option<usize> {
        self.positions.get(tag).copied()
    }

    /// Encode an item; tags outside the vocabulary are ignored
    pub fn encode(&self, item: &Item) -> CategoryVector {
        let mut vector = Array1::zeros(self.len());
        for tag in &item.categories {
            if let Some(pos) = self.position(tag) {
                vector[pos] = 1.0;
            }
        }
        vector
    }
}

/// Every item's category vector stacked row-wise, rows in ascending item id
#[derive(Debug, Clone)]
pub struct ItemFeatureMatrix {
    item_ids: Vec<ItemId>,
    rows: HashMap<ItemId, usize>,
    matrix: Array2<f64>,
}

impl ItemFeatureMatrix {
    pub fn build(index: &DataIndex, vocabulary: &CategoryVocabulary) -> Self {
        let item_ids: Vec<ItemId> = index.items().map(|item| item.id).collect();
        let mut matrix = Array2::zeros((item_ids.len(), vocabulary.len()));
        for (row, item) in index.items().enumerate() {
            matrix.row_mut(row).assign(&vocabulary.encode(item));
        }
        let rows = item_ids
            .iter()
            .enumerate()
            .map(|(row, id)| (*id, row))
            .collect();
        Self {
            item_ids,
            rows,
            matrix,
        }
    }

    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    pub fn num_features(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn vector(&self, item_id: ItemId) -> Option<ArrayView1<'_, f64>> {
        self.rows.get(&item_id).map(|&row| self.matrix.row(row))
    }

    /// Gather the rows for the given items, in the given order
    pub fn select(&self, item_ids: &[ItemId]) -> Array2<f64> {
        let mut out = Array2::zeros((item_ids.len(), self.num_features()));
        for (i, id) in item_ids.iter().enumerate() {
            if let Some(row) = self.vector(*id) {
                out.row_mut(i).assign(&row);
            }
        }
        out
    }
}
