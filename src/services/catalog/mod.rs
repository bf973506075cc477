use crate::error::{RecError, RecResult};
use crate::models::{Item, ItemId};
use crate::utils::{csv_error, csv_reader, is_header_row, record_line};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    positions: HashMap<ItemId, usize>,
}

impl Catalog {
    pub fn from_items(items: Vec<Item>) -> RecResult<Self> {
        let mut positions = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if positions.insert(item.id, i).is_some() {
                return Err(RecError::InvalidInput(format!("duplicate item id {}", item.id)));
            }
        }
        Ok(Self { items, positions })
    }

    pub fn load(path: impl AsRef<Path>) -> RecResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_items(parse_records(&content, &path.display().to_string())?)?;
        info!(path = %path.display(), items = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    pub fn get(&self, item_id: ItemId) -> Option<&Item> {
        self.positions.get(&item_id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.positions.contains_key(&item_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
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
}

const HEADER: [&str; 3] = ["movieId", "title", "genres"];

#[derive(Debug, Serialize, Deserialize)]
struct CatalogRecord {
    #[serde(rename = "movieId")]
    id: ItemId,
    title: String,
    genres: String,
}

impl CatalogRecord {
    fn into_item(self) -> Result<Item, String> {
        let categories: Vec<String> = self.genres.split('|').map(|c| c.trim().to_string()).collect();
        if categories.iter().any(|c| c.is_empty()) {
            return Err("empty category".to_string());
        }
        Ok(Item::new(self.id, self.title, categories))
    }
}

impl From<&Item> for CatalogRecord {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            genres: item.categories.join("|"),
        }
    }
}

/// Parses `movieId,title,genres` records with `|`-separated genres. Only the
/// exact `movieId,title,genres` header is skipped.
pub fn parse_records(content: &str, source_name: &str) -> RecResult<Vec<Item>> {
    let mut items = Vec::new();

    for (i, result) in csv_reader(content).into_records().enumerate() {
        let record = result.map_err(|e| csv_error(source_name, e))?;
        if i == 0 && is_header_row(&record, &HEADER, HEADER.len()) {
            continue;
        }

        let line = record_line(&record);
        if record.len() != HEADER.len() {
            return Err(RecError::parse(
                source_name,
                line,
                format!("expected {} fields, found {}", HEADER.len(), record.len()),
            ));
        }

        let item = record
            .deserialize::<CatalogRecord>(None)
            .map_err(|e| e.to_string())
            .and_then(CatalogRecord::into_item)
            .map_err(|reason| RecError::parse(source_name, line, reason))?;
        items.push(item);
    }

    Ok(items)
}

pub fn write_records(path: impl AsRef<Path>, items: &[Item]) -> RecResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for item in items {
        writer.serialize(CatalogRecord::from(item))?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), items = items.len(), "Wrote item records");
    Ok(())
}
