//! Category-partitioned JSON database
//!
//! One `<category>.json` file per output bucket holds `{category, count, items}`
//! with items sorted by name, next to a `summary.json` run report and a
//! minified `recipes_bundle.json` keyed by item name. Loading is forgiving: an
//! unreadable file or item is logged and treated as absent, so the next run
//! re-extracts it.

mod error;
pub mod merge;

pub use error::StoreError;
pub use merge::{Unresolved, merge, should_overwrite};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::categorize::Category;
use crate::record::ItemRecord;

type Result<T> = std::result::Result<T, StoreError>;

/// File name of the run summary
pub const SUMMARY_FILE: &str = "summary.json";

/// File name of the combined bundle
pub const BUNDLE_FILE: &str = "recipes_bundle.json";

/// Records keyed by normalized item name
pub type RecordMap = BTreeMap<String, ItemRecord>;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the category files
    pub output_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
        }
    }
}

/// One per-category output document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryFile {
    /// Display name of the bucket
    pub category: String,
    pub count: usize,
    pub items: Vec<ItemRecord>,
}

/// Discovery part of the run summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySummary {
    pub pages_found: usize,
    pub categories_visited: usize,
    pub failed_categories: usize,
    pub failed_list_pages: usize,
    /// Pages credited to each strategy
    pub strategies: BTreeMap<String, usize>,
}

/// End-of-run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    pub mode: String,
    pub total_items: usize,
    pub categories: BTreeMap<String, usize>,
    pub discovery: DiscoverySummary,
    pub pages_scraped: usize,
    pub failed_pages: usize,
}

/// Storage manager for the category database
#[derive(Debug, Clone)]
pub struct Store {
    config: StoreConfig,
}

impl Default for Store {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl Store {
    /// Create a store rooted at `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(StoreConfig {
            output_dir: output_dir.into(),
        })
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Path of a bucket's file
    pub fn category_path(&self, category: Category) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}.json", category.slug()))
    }

    async fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config.output_dir).await?;
        Ok(())
    }

    /// Records of one category file. Items that fail to parse are skipped.
    pub async fn load_category(&self, category: Category) -> Result<Vec<ItemRecord>> {
        let path = self.category_path(category);
        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(&path).await?;
        let document: Value =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let items = match document.get("items") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(StoreError::Corrupt {
                    path,
                    message: "missing items array".to_string(),
                });
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match serde_json::from_value::<ItemRecord>(item.clone()) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable item {} in {}: {}",
                    index,
                    path.display(),
                    e
                ),
            }
        }
        Ok(records)
    }

    /// Every persisted record, keyed by normalized name. Missing or corrupt
    /// files count as empty.
    pub async fn load_all(&self) -> Result<RecordMap> {
        let mut records = RecordMap::new();

        for category in Category::ALL {
            let loaded = match self.load_category(category).await {
                Ok(loaded) => loaded,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => {
                    warn!("Ignoring {}: {}", category, e);
                    continue;
                }
            };

            for record in loaded {
                let key = record.key();
                match records.get(&key) {
                    Some(existing) => {
                        let merged = merge(existing, &record);
                        records.insert(key, merged);
                    }
                    None => {
                        records.insert(key, record);
                    }
                }
            }
        }

        debug!("Loaded {} persisted records", records.len());
        Ok(records)
    }

    /// Write one file per category; returns the per-category counts
    pub async fn write_categories(&self, records: &RecordMap) -> Result<BTreeMap<Category, usize>> {
        self.ensure_output_dir().await?;

        let mut grouped: BTreeMap<Category, Vec<&ItemRecord>> =
            Category::ALL.into_iter().map(|c| (c, Vec::new())).collect();
        for record in records.values() {
            grouped.entry(record.category).or_default().push(record);
        }

        let mut counts = BTreeMap::new();
        for (category, mut items) in grouped {
            items.sort_by(|a, b| a.name.cmp(&b.name));
            let file = CategoryFile {
                category: category.display_name(),
                count: items.len(),
                items: items.into_iter().cloned().collect(),
            };

            let json = serde_json::to_string_pretty(&file)?;
            fs::write(self.category_path(category), json).await?;
            counts.insert(category, file.count);
        }

        info!(
            "Wrote {} records to {}",
            records.len(),
            self.config.output_dir.display()
        );
        Ok(counts)
    }

    pub async fn write_summary(&self, summary: &Summary) -> Result<()> {
        self.ensure_output_dir().await?;
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(self.config.output_dir.join(SUMMARY_FILE), json).await?;
        Ok(())
    }

    pub async fn load_summary(&self) -> Result<Summary> {
        let path = self.config.output_dir.join(SUMMARY_FILE);
        let content = fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Minified bundle of every record keyed by item name; returns its path
    pub async fn write_bundle(&self, records: &RecordMap) -> Result<PathBuf> {
        self.ensure_output_dir().await?;

        let bundle: BTreeMap<&str, &ItemRecord> = records
            .values()
            .map(|record| (record.name.as_str(), record))
            .collect();

        let path = self.config.output_dir.join(BUNDLE_FILE);
        fs::write(&path, serde_json::to_string(&bundle)?).await?;
        info!("Wrote bundle of {} items to {}", bundle.len(), path.display());
        Ok(path)
    }

    /// Rebuild the bundle from the category files on disk
    pub async fn rebuild_bundle(&self) -> Result<(PathBuf, usize)> {
        let records = self.load_all().await?;
        let path = self.write_bundle(&records).await?;
        Ok((path, records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ItemType, Quantity};
    use tempfile::tempdir;

    fn record(name: &str, category: Category) -> ItemRecord {
        let mut record = ItemRecord::minimal(
            name,
            format!("https://icarus.fandom.com/wiki/{}", name.replace(' ', "_")),
        );
        record.category = category;
        record
    }

    fn map(records: Vec<ItemRecord>) -> RecordMap {
        records.into_iter().map(|r| (r.key(), r)).collect()
    }

    #[tokio::test]
    async fn test_write_and_load_categories() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());

        let mut spear = record("Wood Spear", Category::Weapons);
        spear.item_type = ItemType::Weapon;
        spear
            .base_recipe
            .ingredients
            .insert("Stick".to_string(), Quantity::new(12.0).unwrap());
        let records = map(vec![
            spear,
            record("Bow", Category::Weapons),
            record("Stone", Category::RawMaterials),
        ]);

        let counts = store.write_categories(&records).await.unwrap();
        assert_eq!(counts[&Category::Weapons], 2);
        assert_eq!(counts[&Category::RawMaterials], 1);
        assert_eq!(counts[&Category::Armor], 0);

        let content = std::fs::read_to_string(store.category_path(Category::Weapons)).unwrap();
        let file: CategoryFile = serde_json::from_str(&content).unwrap();
        assert_eq!(file.category, "Weapons");
        assert_eq!(file.count, 2);
        assert_eq!(file.items[0].name, "Bow");
        assert_eq!(file.items[1].name, "Wood Spear");

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_load_all_on_empty_dir() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path().join("missing"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_items_are_skipped() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());

        std::fs::write(
            store.category_path(Category::Tools),
            r#"{"category":"Tools","count":3,"items":[
                {"name":"Stone Axe","tier":1,"notes":"curated"},
                {"tier":2},
                {"name":"Bad","baseRecipe":{"ingredients":{"Stone":-1}}}
            ]}"#,
        )
        .unwrap();
        std::fs::write(store.category_path(Category::Armor), "{not json").unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let axe = &loaded["stone axe"];
        assert_eq!(axe.tier, 1);
        assert_eq!(axe.extra["notes"], "curated");

        assert!(matches!(
            store.load_category(Category::Armor).await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_bundle_and_summary() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let records = map(vec![
            record("Wood Spear", Category::Weapons),
            record("Stone", Category::RawMaterials),
        ]);
        store.write_categories(&records).await.unwrap();

        let (path, count) = store.rebuild_bundle().await.unwrap();
        assert_eq!(count, 2);
        let content = std::fs::read_to_string(path).unwrap();
        assert!(!content.contains('\n'));
        let bundle: BTreeMap<String, ItemRecord> = serde_json::from_str(&content).unwrap();
        assert!(bundle.contains_key("Wood Spear"));

        let summary = Summary {
            generated_at: Utc::now(),
            mode: "full".to_string(),
            total_items: 2,
            categories: BTreeMap::from([("weapons".to_string(), 1), ("raw_materials".to_string(), 1)]),
            discovery: DiscoverySummary::default(),
            pages_scraped: 2,
            failed_pages: 0,
        };
        store.write_summary(&summary).await.unwrap();
        assert_eq!(store.load_summary().await.unwrap(), summary);
    }
}
