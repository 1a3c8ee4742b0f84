//! User -> items and item -> users index derived from a rating set
//!
//! Built once per `fit` so that each sweep only visits observed pairs instead
//! of the full `num_users x num_items` grid.

use std::collections::BTreeMap;

use crate::ratings::Ratings;
use crate::{ItemId, UserId};

/// Observed neighbours of one row, paired with the rating value
pub(crate) type Neighbours = BTreeMap<usize, Vec<(usize, f64)>>;

#[derive(Debug, Clone, Default)]
pub struct AdjacencyIndex {
    by_user: Neighbours,
    by_item: Neighbours,
}

impl AdjacencyIndex {
    /// Build the index in one pass over `ratings`
    ///
    /// Because ratings iterate in ascending (user, item) order, every
    /// neighbour list comes out sorted and free of duplicates.
    pub fn build(ratings: &Ratings) -> Self {
        let mut by_user: Neighbours = BTreeMap::new();
        let mut by_item: Neighbours = BTreeMap::new();

        for ((user, item), rating) in ratings.iter() {
            by_user.entry(user).or_default().push((item, rating));
            by_item.entry(item).or_default().push((user, rating));
        }

        Self { by_user, by_item }
    }

    /// Items rated by `user` with their ratings; empty when the user has none
    pub fn user_items(&self, user: UserId) -> &[(ItemId, f64)] {
        self.by_user.get(&user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Users who rated `item` with their ratings; empty when nobody did
    pub fn item_users(&self, item: ItemId) -> &[(UserId, f64)] {
        self.by_item.get(&item).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Users with at least one rating, ascending
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.by_user.keys().copied()
    }

    /// Items with at least one rating, ascending
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.by_item.keys().copied()
    }

    /// Number of distinct users observed
    pub fn num_users(&self) -> usize {
        self.by_user.len()
    }

    /// Number of distinct items observed
    pub fn num_items(&self) -> usize {
        self.by_item.len()
    }

    pub(crate) fn by_user(&self) -> &Neighbours {
        &self.by_user
    }

    pub(crate) fn by_item(&self) -> &Neighbours {
        &self.by_item
    }
}
