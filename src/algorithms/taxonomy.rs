use crate::error::{RecError, RecResult};
use crate::models::Category;
use std::collections::HashMap;

pub const DEFAULT_GENRES: [&str; 20] = [
    "Action",
    "Adventure",
    "Animation",
    "Children",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "Film-Noir",
    "Horror",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "War",
    "Western",
    "IMAX",
    "(no genres listed)",
];

#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl Taxonomy {
    pub fn new<I, S>(labels: I) -> RecResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories = Vec::new();
        let mut index = HashMap::new();

        for label in labels {
            let name = label.into();
            if name.trim().is_empty() {
                return Err(RecError::Config("empty category label".to_string()));
            }
            if index.contains_key(&name) {
                return Err(RecError::Config(format!("duplicate category label '{}'", name)));
            }
            index.insert(name.clone(), categories.len());
            categories.push(Category {
                name,
                index: categories.len(),
            });
        }

        if categories.is_empty() {
            return Err(RecError::Config("taxonomy has no categories".to_string()));
        }

        Ok(Self { categories, index })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn category(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        let categories: Vec<Category> = DEFAULT_GENRES
            .iter()
            .enumerate()
            .map(|(index, name)| Category {
                name: name.to_string(),
                index,
            })
            .collect();
        let index = categories
            .iter()
            .map(|c| (c.name.clone(), c.index))
            .collect();

        Self { categories, index }
    }
}
