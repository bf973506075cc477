use crate::models::{Item, ItemId, Rating, Recommendation};
use crate::services::catalog::Catalog;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct ColdStartCatalog {
    items: Vec<Item>,
}

impl ColdStartCatalog {
    /// Ranks every catalog item by the sum of its rating values, descending.
    /// Equal sums keep catalog order. Ratings of items outside the catalog
    /// are ignored.
    pub fn compute(catalog: &Catalog, ratings: &[Rating], size: usize) -> Self {
        let mut totals: HashMap<ItemId, f64> = HashMap::with_capacity(catalog.len());
        for rating in ratings {
            *totals.entry(rating.item_id).or_insert(0.0) += rating.value as f64;
        }

        let mut ranked: Vec<(&Item, f64)> = catalog
            .iter()
            .map(|item| (item, totals.get(&item.id).copied().unwrap_or(0.0)))
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            items: ranked
                .into_iter()
                .take(size)
                .map(|(item, _)| item.clone())
                .collect(),
        }
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.items.iter().cloned().map(Recommendation::unscored).collect()
    }

    pub fn excluding(&self, seen: &HashSet<ItemId>, limit: usize) -> Vec<Recommendation> {
        self.items
            .iter()
            .filter(|item| !seen.contains(&item.id))
            .take(limit)
            .cloned()
            .map(Recommendation::unscored)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_items(
            (1..=6)
                .map(|id| Item::new(id, format!("Movie {}", id), vec!["Drama".into()]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_ranks_by_total_rating_sum() {
        let ratings = vec![
            Rating::new(1, 3, 5.0),
            Rating::new(2, 3, 4.0),
            Rating::new(1, 5, 5.0),
            Rating::new(3, 1, 2.0),
        ];
        let cold = ColdStartCatalog::compute(&catalog(), &ratings, 3);
        let ids: Vec<ItemId> = cold.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 5, 1]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let ratings = vec![Rating::new(1, 4, 3.0), Rating::new(1, 2, 3.0)];
        let cold = ColdStartCatalog::compute(&catalog(), &ratings, 4);
        let ids: Vec<ItemId> = cold.items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_unknown_items_ignored_and_size_capped() {
        let ratings = vec![Rating::new(1, 99, 5.0)];
        let cold = ColdStartCatalog::compute(&catalog(), &ratings, 20);
        assert_eq!(cold.len(), 6);
        assert!(cold.items().iter().all(|i| i.id != 99));
    }

    #[test]
    fn test_excluding_seen() {
        let cold = ColdStartCatalog::compute(&catalog(), &[], 6);
        let seen: HashSet<ItemId> = [1, 2].into_iter().collect();
        let recs = cold.excluding(&seen, 3);
        let ids: Vec<ItemId> = recs.iter().map(|r| r.item.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert!(recs.iter().all(|r| r.prediction.is_none()));
    }
}
