//! Output taxonomy and item categorization
//!
//! Every record lands in exactly one of 21 buckets. Classification is a
//! keyword scan over the item name, the wiki category text and the crafting
//! station text, tested in the declared order of [`RULES`]; the first bucket
//! with any keyword hit wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::ItemRecord;

/// Output bucket for a record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ammunition,
    Armor,
    Building,
    Consumables,
    Cooking,
    Decoration,
    Deployables,
    ElectricitySources,
    Farming,
    FuelSources,
    Furniture,
    Inventory,
    LightSources,
    Materials,
    Medicine,
    #[default]
    RawMaterials,
    SpecializedEquipment,
    Storage,
    Tools,
    WaterSources,
    Weapons,
}

impl Category {
    /// All buckets, in file order
    pub const ALL: [Category; 21] = [
        Category::Ammunition,
        Category::Armor,
        Category::Building,
        Category::Consumables,
        Category::Cooking,
        Category::Decoration,
        Category::Deployables,
        Category::ElectricitySources,
        Category::Farming,
        Category::FuelSources,
        Category::Furniture,
        Category::Inventory,
        Category::LightSources,
        Category::Materials,
        Category::Medicine,
        Category::RawMaterials,
        Category::SpecializedEquipment,
        Category::Storage,
        Category::Tools,
        Category::WaterSources,
        Category::Weapons,
    ];

    /// snake_case identifier, also the output file stem
    pub fn slug(self) -> &'static str {
        match self {
            Category::Ammunition => "ammunition",
            Category::Armor => "armor",
            Category::Building => "building",
            Category::Consumables => "consumables",
            Category::Cooking => "cooking",
            Category::Decoration => "decoration",
            Category::Deployables => "deployables",
            Category::ElectricitySources => "electricity_sources",
            Category::Farming => "farming",
            Category::FuelSources => "fuel_sources",
            Category::Furniture => "furniture",
            Category::Inventory => "inventory",
            Category::LightSources => "light_sources",
            Category::Materials => "materials",
            Category::Medicine => "medicine",
            Category::RawMaterials => "raw_materials",
            Category::SpecializedEquipment => "specialized_equipment",
            Category::Storage => "storage",
            Category::Tools => "tools",
            Category::WaterSources => "water_sources",
            Category::Weapons => "weapons",
        }
    }

    /// Title-cased name used in the per-category documents
    pub fn display_name(self) -> String {
        self.slug()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == wanted)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Priority-ordered keyword table. More specific buckets come first; a name
/// matching several buckets takes the earliest one. Keywords padded with a
/// space only match at word edges of the padded haystack.
pub const RULES: &[(Category, &[&str])] = &[
    (
        Category::Ammunition,
        &["arrow", "bolt", "round", "shell", "ammo", "bullet", "cartridge"],
    ),
    (
        Category::Cooking,
        &[
            "cooked", "grilled", "barbecue", "barbeque", "roasted", "smoked", "dried", "soup",
            "stew", "meal", "salad", " pie ", "bread",
        ],
    ),
    (
        Category::Medicine,
        &["bandage", "pill", "medicine", "antibiotic", "tonic", "cure", "anti-"],
    ),
    (
        Category::Armor,
        &[
            "armor", "helmet", "chestpiece", "chest piece", "boots", "gloves", "suit", "vest",
            "pants", "clothing",
        ],
    ),
    (
        Category::Weapons,
        &["bow", "rifle", "spear", "gun", "pistol", "shotgun", "crossbow", "sword"],
    ),
    (
        Category::Tools,
        &["pickaxe", "axe", "knife", "hammer", "sickle", "shovel", "chainsaw", "drill"],
    ),
    (
        Category::LightSources,
        &["torch", "flashlight", "headlamp", "lamp", "lantern", "floodlight"],
    ),
    (
        Category::WaterSources,
        &["water tank", "reservoir", "purifier", "water pump", "water borer", "rainwater"],
    ),
    (
        Category::ElectricitySources,
        &["battery", "solar panel", "generator", "power cell"],
    ),
    (Category::FuelSources, &["biofuel can", "fuel can"]),
    (
        Category::Farming,
        &["seed", "seedling", "crop", "fertilizer", "planter"],
    ),
    (
        Category::Storage,
        &["storage", "chest", "crate", "box", "container", "locker", "dropbox", "refrigerator"],
    ),
    (Category::Inventory, &["backpack", "pouch", "bag"]),
    (
        Category::Furniture,
        &["chair", "table", "bed", "desk", "bookshelf", "dresser", "nightstand", "couch"],
    ),
    (
        Category::Decoration,
        &["decorative", "trophy", "rug", "painting"],
    ),
    (
        Category::Building,
        &[
            "foundation", "wall", "roof", "door", "floor", "beam", "ramp", "stairs", "window",
            "halfpiece", "halfpitch", "ladder", "railing", "trapdoor",
        ],
    ),
    (
        Category::SpecializedEquipment,
        &["detector", "scanner", "radar", "attachment", "module"],
    ),
    (
        Category::Consumables,
        &["bladder", "oxygen bladder", "waterskin"],
    ),
    (
        Category::Materials,
        &[
            "ingot", "screw", "wire", "paste", "concrete mix", "bloom", "bar", "composite",
            "epoxy", "nail", "rope", "glass",
        ],
    ),
    (
        Category::Deployables,
        &[
            "bench", "furnace", "station", "processor", "refinery", "extractor", "mixer",
            "dehumidifier", "composter",
        ],
    ),
    (
        Category::RawMaterials,
        &[
            " ore", "wood", "stone", "bone", "leather", "fur", "stick", "fiber", "clay", "coal",
            "sulfur",
        ],
    ),
];

/// Maps records onto the output taxonomy
#[derive(Debug, Clone, Copy, Default)]
pub struct Categorizer {
    fallback: Category,
}

impl Categorizer {
    /// Categorizer whose catch-all bucket is `fallback`
    pub fn new(fallback: Category) -> Self {
        Self { fallback }
    }

    /// Classify from the raw page signals
    pub fn categorize(&self, name: &str, wiki_categories: &str, stations: &str) -> Category {
        let name = name.to_lowercase();
        let wiki = wiki_categories.to_lowercase();
        let stations = stations.to_lowercase();
        let haystack = format!(" {} {} {} ", name, wiki, stations);

        for (category, keywords) in RULES {
            if keywords.iter().any(|k| haystack.contains(k)) {
                return *category;
            }
        }

        if wiki.contains("food")
            || ["barbecue", "smoker", "grill"]
                .iter()
                .any(|w| stations.contains(w))
        {
            return Category::Cooking;
        }

        if ["canteen", "thermos"].iter().any(|w| name.contains(w)) {
            return Category::Consumables;
        }

        if wiki.contains("building") {
            return Category::Building;
        }

        self.fallback
    }

    /// Classify a record from its name, wiki categories and stations
    pub fn categorize_record(&self, record: &ItemRecord) -> Category {
        let mut stations = record.crafting_stations.join(" ");
        if !record.base_recipe.crafted_at.eq_ignore_ascii_case(crate::record::UNKNOWN) {
            stations.push(' ');
            stations.push_str(&record.base_recipe.crafted_at);
        }
        self.categorize(&record.name, &record.wiki_categories.join(" "), &stations)
    }
}
