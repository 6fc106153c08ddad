//! Item records and page identifiers
//!
//! [`ItemRecord`] is the unit of persisted knowledge about one game item. The
//! JSON field names are camelCase because the records are consumed as-is by the
//! calculator front-end.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::categorize::Category;

/// Sentinel for any text field whose value could not be recovered
pub const UNKNOWN: &str = "Unknown";

/// Per-unit ingredient quantity
///
/// Always strictly positive. Batch normalization can produce fractional
/// amounts, which are kept to two decimal places; integral amounts serialize
/// as JSON integers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quantity(f64);

impl Quantity {
    /// Accepts only strictly positive, finite amounts
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    /// Quantity after dividing by a batch size, rounded to two decimals
    pub fn per_unit(self, batch_size: u32) -> Option<Self> {
        if batch_size <= 1 {
            return Some(self);
        }
        let divided = self.0 / f64::from(batch_size);
        Self::new((divided * 100.0).round() / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Integral value, if the quantity is a whole number
    pub fn as_integer(self) -> Option<u64> {
        (self.0.fract() == 0.0).then_some(self.0 as u64)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_integer() {
            Some(n) => write!(f, "{}", n),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_integer() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_f64(self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Quantity::new(value)
            .ok_or_else(|| serde::de::Error::custom(format!("non-positive quantity {}", value)))
    }
}

/// Ingredient name to per-unit quantity
pub type Ingredients = BTreeMap<String, Quantity>;

/// Coarse item type inferred from page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Craftable,
    Harvestable,
    Orbital,
    Weapon,
    Armor,
    Tool,
    Consumable,
    Resource,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemType::Craftable => "craftable",
            ItemType::Harvestable => "harvestable",
            ItemType::Orbital => "orbital",
            ItemType::Weapon => "weapon",
            ItemType::Armor => "armor",
            ItemType::Tool => "tool",
            ItemType::Consumable => "consumable",
            ItemType::Resource => "resource",
            ItemType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One way of crafting an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default)]
    pub ingredients: Ingredients,

    /// Station name or [`UNKNOWN`]; never absent
    #[serde(default = "unknown_string")]
    pub crafted_at: String,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            ingredients: Ingredients::new(),
            crafted_at: UNKNOWN.to_string(),
        }
    }
}

/// Sum of all ingredient quantities
pub fn total_cost(ingredients: &Ingredients) -> f64 {
    ingredients.values().map(|q| q.value()).sum()
}

/// Recipe variant unlocked by a character talent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentRecipe {
    #[serde(default)]
    pub ingredients: Ingredients,

    #[serde(default = "unknown_string")]
    pub crafted_at: String,

    #[serde(default = "unknown_string")]
    pub talent_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talent_effect: Option<String>,
}

fn unknown_string() -> String {
    UNKNOWN.to_string()
}

/// Everything known about one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub name: String,

    #[serde(default)]
    pub source_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub item_type: ItemType,

    #[serde(default)]
    pub category: Category,

    /// 0 means unknown or not tech-gated
    #[serde(default)]
    pub tier: u32,

    #[serde(default)]
    pub base_recipe: Recipe,

    #[serde(default)]
    pub talent_recipes: Vec<TalentRecipe>,

    /// Every station the page names for this item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crafting_stations: Vec<String>,

    #[serde(default)]
    pub stats: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub harvested_from: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_cost: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_cost: Option<u64>,

    /// Category link text from the wiki page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wiki_categories: Vec<String>,

    /// Fields added by hand to the persisted JSON, carried through merges untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ItemRecord {
    /// Empty record for a page; every field at its unknown sentinel
    pub fn minimal(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            description: None,
            item_type: ItemType::Unknown,
            category: Category::default(),
            tier: 0,
            base_recipe: Recipe::default(),
            talent_recipes: Vec::new(),
            crafting_stations: Vec::new(),
            stats: BTreeMap::new(),
            harvested_from: Vec::new(),
            research_cost: None,
            purchase_cost: None,
            wiki_categories: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Whether a re-scrape could still fill something in
    pub fn has_unresolved_fields(&self) -> bool {
        self.item_type == ItemType::Unknown
            || self.base_recipe.crafted_at.eq_ignore_ascii_case(UNKNOWN)
            || (self.base_recipe.ingredients.is_empty() && self.harvested_from.is_empty())
            || self.description.as_deref().is_none_or(str::is_empty)
    }

    /// Identity key shared by page refs and records
    pub fn key(&self) -> String {
        normalize_title(&self.name)
    }
}

/// Which discovery strategy first found a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CategoryApi,
    ListPage,
    Pagination,
    /// Re-scrape of an already persisted record
    Update,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::CategoryApi => "category_api",
            Strategy::ListPage => "list_page",
            Strategy::Pagination => "pagination",
            Strategy::Update => "update",
        };
        f.write_str(name)
    }
}

/// A discovered item page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    /// Human-readable page title
    pub title: String,

    /// Absolute page URL
    pub url: String,

    /// First strategy that found the page; diagnostics only
    pub strategy: Strategy,

    /// Seed category or list page the page was reached from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl PageRef {
    pub fn new(title: impl Into<String>, url: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            strategy,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Normalized identity for a page title or slug: percent-decoded, underscores
/// as spaces, whitespace collapsed, lowercase
pub fn normalize_title(title: &str) -> String {
    let decoded = urlencoding::decode(title)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| title.to_string());
    decoded
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Human title from a `/wiki/Some_Page` slug
pub fn title_from_slug(slug: &str) -> String {
    let last = slug.rsplit("/wiki/").next().unwrap_or(slug);
    let last = last.split(['#', '?']).next().unwrap_or(last);
    let decoded = urlencoding::decode(last)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string());
    decoded
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_rejects_non_positive() {
        assert!(Quantity::new(0.0).is_none());
        assert!(Quantity::new(-3.0).is_none());
        assert!(Quantity::new(f64::NAN).is_none());
        assert_eq!(Quantity::new(4.0).unwrap().as_integer(), Some(4));
    }

    #[test]
    fn test_quantity_per_unit() {
        let four = Quantity::new(4.0).unwrap();
        assert_eq!(four.per_unit(2).unwrap().as_integer(), Some(2));

        let five = Quantity::new(5.0).unwrap();
        assert_eq!(five.per_unit(2).unwrap().value(), 2.5);

        let one = Quantity::new(1.0).unwrap();
        assert_eq!(one.per_unit(3).unwrap().value(), 0.33);
        assert!(one.per_unit(1000).is_none());
    }

    #[test]
    fn test_quantity_serializes_integers_as_integers() {
        let mut ingredients = Ingredients::new();
        ingredients.insert("Fiber".to_string(), Quantity::new(12.0).unwrap());
        ingredients.insert("Stick".to_string(), Quantity::new(2.5).unwrap());

        let json = serde_json::to_string(&ingredients).unwrap();
        assert_eq!(json, r#"{"Fiber":12,"Stick":2.5}"#);

        assert!(serde_json::from_str::<Ingredients>(r#"{"Fiber":0}"#).is_err());
        assert_eq!(total_cost(&ingredients), 14.5);
    }

    #[test]
    fn test_record_json_shape() {
        let mut record = ItemRecord::minimal("Wood Spear", "https://icarus.fandom.com/wiki/Wood_Spear");
        record.tier = 1;
        record
            .extra
            .insert("notes".to_string(), serde_json::json!("hand curated"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["name"], "Wood Spear");
        assert_eq!(value["sourceUrl"], "https://icarus.fandom.com/wiki/Wood_Spear");
        assert_eq!(value["itemType"], "unknown");
        assert_eq!(value["category"], "raw_materials");
        assert_eq!(value["baseRecipe"]["craftedAt"], "Unknown");
        assert_eq!(value["notes"], "hand curated");

        let back: ItemRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_tolerates_sparse_json() {
        let record: ItemRecord =
            serde_json::from_str(r#"{"name":"Stone","itemType":"gizmo"}"#).unwrap();
        assert_eq!(record.item_type, ItemType::Unknown);
        assert_eq!(record.base_recipe.crafted_at, UNKNOWN);
        assert!(record.has_unresolved_fields());
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Wood_Spear"), "wood spear");
        assert_eq!(normalize_title("  Wood   Spear "), "wood spear");
        assert_eq!(normalize_title("Anti-Poison%20Pill"), "anti-poison pill");
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("/wiki/Crafting_Bench"), "Crafting Bench");
        assert_eq!(
            title_from_slug("https://icarus.fandom.com/wiki/Fish_%26_Chips#Recipe"),
            "Fish & Chips"
        );
    }
}
