//! Ranking and truncation of per-user predictions.
//!
//! Lists are sorted by descending score with a stable sort, so entries with
//! equal scores keep the order in which they were enumerated (ascending item
//! id everywhere in this crate).

use data_loader::{DataIndex, UserId};
use models::PredictionEntry;
use std::collections::BTreeMap;

/// Number of entries kept per user in every output table
pub const TOP_N: usize = 20;

/// Sort one user's entries by descending score and keep the first `n`
pub fn top_n(mut entries: Vec<PredictionEntry>, n: usize) -> Vec<PredictionEntry> {
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(n);
    entries
}

/// Ranked lists keyed by user, iterated in ascending user id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopNTable {
    lists: BTreeMap<UserId, Vec<PredictionEntry>>,
}

impl TopNTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge independently ranked per-user lists; empty lists are skipped
    pub fn from_lists(lists: impl IntoIterator<Item = (UserId, Vec<PredictionEntry>)>) -> Self {
        Self {
            lists: lists
                .into_iter()
                .filter(|(_, list)| !list.is_empty())
                .collect(),
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<&[PredictionEntry]> {
        self.lists.get(&user_id).map(|v| v.as_slice())
    }

    /// Number of users with a list
    pub fn num_users(&self) -> usize {
        self.lists.len()
    }

    /// Number of entries across all lists
    pub fn num_rows(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.lists.keys().copied()
    }

    /// All entries, user by user, each list in rank order
    pub fn rows(&self) -> impl Iterator<Item = &PredictionEntry> + '_ {
        self.lists.values().flatten()
    }
}

/// Group a flat prediction set by user, then rank and truncate each group.
///
/// Within a user, the input order is the tie-breaking order.
pub fn group_top_n(entries: impl IntoIterator<Item = PredictionEntry>, n: usize) -> TopNTable {
    let mut grouped: BTreeMap<UserId, Vec<PredictionEntry>> = BTreeMap::new();
    for entry in entries {
        grouped.entry(entry.user_id).or_default().push(entry);
    }
    TopNTable::from_lists(
        grouped
            .into_iter()
            .map(|(user_id, list)| (user_id, top_n(list, n))),
    )
}

/// Each user's own highest observed ratings, scored by the rating itself
pub fn top_rated(index: &DataIndex, n: usize) -> TopNTable {
    TopNTable::from_lists(index.users().map(|user_id| {
        let observed = index
            .get_user_ratings(user_id)
            .iter()
            .map(|r| PredictionEntry::new(r.user_id, r.item_id, r.rating))
            .collect();
        (user_id, top_n(observed, n))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Item, Rating};

    #[test]
    fn test_top_n_sorts_and_truncates() {
        let entries: Vec<PredictionEntry> = (0..30)
            .map(|i| PredictionEntry::new(1, i, (i % 7) as f64))
            .collect();
        let ranked = top_n(entries, TOP_N);

        assert_eq!(ranked.len(), TOP_N);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ranked[0].score, 6.0);
    }

    #[test]
    fn test_ties_keep_enumeration_order() {
        let entries = vec![
            PredictionEntry::new(1, 10, 3.0),
            PredictionEntry::new(1, 11, 4.0),
            PredictionEntry::new(1, 12, 3.0),
            PredictionEntry::new(1, 13, 3.0),
        ];
        let ids: Vec<u32> = top_n(entries, 3).iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec![11, 10, 12]);
    }

    #[test]
    fn test_group_top_n() {
        let entries = vec![
            PredictionEntry::new(2, 1, 1.0),
            PredictionEntry::new(1, 1, 2.0),
            PredictionEntry::new(2, 2, 5.0),
            PredictionEntry::new(1, 2, 1.0),
        ];
        let table = group_top_n(entries, 1);

        assert_eq!(table.num_users(), 2);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.get(1).unwrap()[0].item_id, 1);
        assert_eq!(table.get(2).unwrap()[0].item_id, 2);
        let users: Vec<UserId> = table.rows().map(|e| e.user_id).collect();
        assert_eq!(users, vec![1, 2]);
    }

    #[test]
    fn test_top_rated_skips_users_without_ratings() {
        let mut index = DataIndex::default();
        for id in 1..=25 {
            index.insert_item(Item {
                id,
                title: format!("Item {}", id),
                categories: ["Drama".to_string()].into_iter().collect(),
            });
            let rating = 0.5 + (id % 10) as f64 * 0.5;
            index.insert_rating(Rating { user_id: 1, item_id: id, rating });
        }
        index.insert_user(2);

        let table = top_rated(&index, TOP_N);
        assert!(table.get(2).is_none());
        let list = table.get(1).unwrap();
        assert_eq!(list.len(), TOP_N);
        assert_eq!(list[0].score, 5.0);
        assert!(list.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
