//! Field-level reconciliation of a fresh record into a persisted one
//!
//! Merging only fills gaps: a persisted value is replaced only when
//! [`should_overwrite`] says it is unresolved. `name` and `source_url` are the
//! exceptions and always take the latest crawl's value.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::record::{ItemRecord, ItemType, UNKNOWN};

/// A value that can be absent, empty or the unknown sentinel
pub trait Unresolved {
    fn is_unresolved(&self) -> bool;
}

impl Unresolved for String {
    fn is_unresolved(&self) -> bool {
        let trimmed = self.trim();
        trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
    }
}

impl<T: Unresolved> Unresolved for Option<T> {
    fn is_unresolved(&self) -> bool {
        self.as_ref().is_none_or(Unresolved::is_unresolved)
    }
}

impl<T> Unresolved for Vec<T> {
    fn is_unresolved(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Unresolved for BTreeMap<K, V> {
    fn is_unresolved(&self) -> bool {
        self.is_empty()
    }
}

impl Unresolved for u32 {
    fn is_unresolved(&self) -> bool {
        *self == 0
    }
}

impl Unresolved for u64 {
    fn is_unresolved(&self) -> bool {
        false
    }
}

impl Unresolved for ItemType {
    fn is_unresolved(&self) -> bool {
        *self == ItemType::Unknown
    }
}

impl Unresolved for Value {
    fn is_unresolved(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty() || s.trim().eq_ignore_ascii_case(UNKNOWN),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

/// Whether a persisted value may be replaced by freshly scraped data
pub fn should_overwrite<T: Unresolved>(existing: &T) -> bool {
    existing.is_unresolved()
}

fn fill<T: Unresolved + Clone>(existing: &mut T, fresh: &T) {
    if should_overwrite(existing) {
        *existing = fresh.clone();
    }
}

fn fill_map(existing: &mut BTreeMap<String, Value>, fresh: &BTreeMap<String, Value>) {
    for (key, value) in fresh {
        match existing.get_mut(key) {
            Some(current) => fill(current, value),
            None => {
                existing.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Reconcile `fresh` into `existing`, never regressing a resolved value
pub fn merge(existing: &ItemRecord, fresh: &ItemRecord) -> ItemRecord {
    let mut merged = existing.clone();

    merged.name = fresh.name.clone();
    merged.source_url = fresh.source_url.clone();

    fill(&mut merged.description, &fresh.description);
    fill(&mut merged.item_type, &fresh.item_type);
    fill(&mut merged.tier, &fresh.tier);

    fill(&mut merged.base_recipe.crafted_at, &fresh.base_recipe.crafted_at);
    fill(&mut merged.base_recipe.ingredients, &fresh.base_recipe.ingredients);
    fill(&mut merged.talent_recipes, &fresh.talent_recipes);
    fill(&mut merged.crafting_stations, &fresh.crafting_stations);

    fill_map(&mut merged.stats, &fresh.stats);
    fill(&mut merged.harvested_from, &fresh.harvested_from);
    fill(&mut merged.research_cost, &fresh.research_cost);
    fill(&mut merged.purchase_cost, &fresh.purchase_cost);
    fill(&mut merged.wiki_categories, &fresh.wiki_categories);
    fill_map(&mut merged.extra, &fresh.extra);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::Category;
    use crate::record::Quantity;

    fn record(crafted_at: &str) -> ItemRecord {
        let mut record = ItemRecord::minimal("Iron Ingot", "https://icarus.fandom.com/wiki/Iron_Ingot");
        record.base_recipe.crafted_at = crafted_at.to_string();
        record
    }

    #[test]
    fn test_should_overwrite() {
        assert!(should_overwrite(&String::new()));
        assert!(should_overwrite(&"unknown".to_string()));
        assert!(should_overwrite(&"UNKNOWN".to_string()));
        assert!(!should_overwrite(&"Forge".to_string()));
        assert!(should_overwrite(&None::<String>));
        assert!(should_overwrite(&BTreeMap::<String, Value>::new()));
        assert!(should_overwrite(&0u32));
        assert!(!should_overwrite(&Some(0u64)));
        assert!(should_overwrite(&Value::Null));
        assert!(!should_overwrite(&Value::from(1.5)));
    }

    #[test]
    fn test_fills_unknown_station() {
        let merged = merge(&record("Unknown"), &record("Forge"));
        assert_eq!(merged.base_recipe.crafted_at, "Forge");
    }

    #[test]
    fn test_never_regresses_to_unknown() {
        let merged = merge(&record("Forge"), &record("Unknown"));
        assert_eq!(merged.base_recipe.crafted_at, "Forge");
    }

    #[test]
    fn test_name_and_url_always_refresh() {
        let mut fresh = record("Forge");
        fresh.name = "Iron Ingot (Refined)".to_string();
        fresh.source_url = "https://icarus.wiki.gg/wiki/Iron_Ingot".to_string();

        let merged = merge(&record("Forge"), &fresh);
        assert_eq!(merged.name, "Iron Ingot (Refined)");
        assert_eq!(merged.source_url, "https://icarus.wiki.gg/wiki/Iron_Ingot");
    }

    #[test]
    fn test_curated_fields_survive() {
        let mut existing = record("Unknown");
        existing.description = Some("Hand written".to_string());
        existing.category = Category::Materials;
        existing.extra.insert("notes".to_string(), Value::from("keep me"));
        existing.stats.insert("weight".to_string(), Value::from("0.5 kg"));
        existing.stats.insert("durability".to_string(), Value::from("Unknown"));

        let mut fresh = record("Furnace");
        fresh.description = Some("Scraped".to_string());
        fresh.category = Category::RawMaterials;
        fresh.tier = 2;
        fresh
            .base_recipe
            .ingredients
            .insert("Iron Ore".to_string(), Quantity::new(2.0).unwrap());
        fresh.stats.insert("weight".to_string(), Value::from("1 kg"));
        fresh.stats.insert("durability".to_string(), Value::from(100));
        fresh.stats.insert("stackSize".to_string(), Value::from(100));

        let merged = merge(&existing, &fresh);
        assert_eq!(merged.description.as_deref(), Some("Hand written"));
        assert_eq!(merged.category, Category::Materials);
        assert_eq!(merged.extra["notes"], "keep me");
        assert_eq!(merged.tier, 2);
        assert_eq!(merged.base_recipe.crafted_at, "Furnace");
        assert_eq!(merged.base_recipe.ingredients.len(), 1);
        assert_eq!(merged.stats["weight"], "0.5 kg");
        assert_eq!(merged.stats["durability"], 100);
        assert_eq!(merged.stats["stackSize"], 100);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut existing = record("Unknown");
        existing.tier = 3;
        existing.harvested_from = vec!["Caves".to_string()];

        let mut fresh = record("Machining Bench");
        fresh.tier = 4;
        fresh.item_type = ItemType::Craftable;
        fresh.research_cost = Some(40);
        fresh.stats.insert("weight".to_string(), Value::from(2));

        let once = merge(&existing, &fresh);
        let twice = merge(&once, &fresh);
        assert_eq!(once, twice);
        assert_eq!(once.tier, 3);
        assert_eq!(once.item_type, ItemType::Craftable);
    }
}
