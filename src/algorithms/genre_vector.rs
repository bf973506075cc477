use crate::algorithms::taxonomy::Taxonomy;
use crate::error::{RecError, RecResult};
use crate::models::{ItemId, Rating, TasteVector};
use crate::services::catalog::Catalog;
use std::collections::HashMap;
use std::sync::Arc;

/// Every rating adds its value to each category of the rated item; the sums
/// are then divided by `max_rating * |catalog|`. Item category indices are
/// resolved once at construction.
#[derive(Debug, Clone)]
pub struct GenreVectorBuilder {
    taxonomy: Arc<Taxonomy>,
    item_categories: HashMap<ItemId, Vec<usize>>,
    normalizer: f64,
}

impl GenreVectorBuilder {
    pub fn new(taxonomy: Arc<Taxonomy>, catalog: &Catalog, max_rating: f64) -> RecResult<Self> {
        if !(max_rating > 0.0) {
            return Err(RecError::Config(format!("max_rating must be positive, got {}", max_rating)));
        }

        let mut item_categories = HashMap::with_capacity(catalog.len());
        for item in catalog.iter() {
            let indices = item
                .categories
                .iter()
                .map(|name| {
                    taxonomy
                        .index_of(name)
                        .ok_or_else(|| RecError::UnknownCategory(name.clone()))
                })
                .collect::<RecResult<Vec<usize>>>()?;
            item_categories.insert(item.id, indices);
        }

        Ok(Self {
            taxonomy,
            item_categories,
            normalizer: max_rating * catalog.len() as f64,
        })
    }

    pub fn dimension(&self) -> usize {
        self.taxonomy.len()
    }

    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }

    pub fn build<'a, I>(&self, ratings: I) -> RecResult<TasteVector>
    where
        I: IntoIterator<Item = &'a Rating>,
    {
        let mut vector = TasteVector::zeros(self.dimension());
        let components = vector.components_mut();

        for rating in ratings {
            let indices = self
                .item_categories
                .get(&rating.item_id)
                .ok_or(RecError::UnknownItem(rating.item_id))?;

            for &i in indices {
                components[i] += rating.value as f64;
            }
        }

        // An empty catalog can only have produced an empty history.
        if self.normalizer > 0.0 {
            for c in components.iter_mut() {
                *c /= self.normalizer;
            }
        }

        Ok(vector)
    }
}
