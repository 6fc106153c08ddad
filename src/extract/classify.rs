//! Item type, harvest sources, orbital costs and infobox stats

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::page::InfoboxRow;
use crate::record::ItemType;

const ORBITAL_KEYWORDS: &[&str] = &["orbital", "workshop", " ren "];

const AMMUNITION_WORDS: &[&str] = &["round", "arrow", "shell", "bolt", "bullet", "cartridge"];

/// Type keywords in priority order
const TYPE_KEYWORDS: &[(ItemType, &[&str])] = &[
    (ItemType::Weapon, &["weapon", "ammunition"]),
    (ItemType::Armor, &["armor", "armour"]),
    (ItemType::Tool, &["tool"]),
    (ItemType::Consumable, &["consumable", "food", "drink", "medicine"]),
    (ItemType::Resource, &["resource", "material", "ore"]),
];

/// Infobox labels copied into the record's stats
const STAT_LABELS: &[&str] = &[
    "weight",
    "durability",
    "damage",
    "armor",
    "stack",
    "insulation",
    "speed",
    "range",
    "decay",
    "food",
    "water",
    "oxygen",
    "health",
    "stamina",
];

const MAX_HARVEST_LOCATIONS: usize = 10;

static HARVEST_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:harvest(?:s|ed|ing|able)?|gathered|mined|chopped|foraged|skinned|dropped\s+by|looted\s+from)\b",
    )
    .expect("valid harvest regex")
});

static HARVEST_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:harvested|gathered|mined|obtained|collected|foraged|chopped|found|dropped|looted)\s+(?:from|by|in|on)\s+(?:the\s+|an?\s+)?(?P<list>[^.;:()]{3,160})",
    )
    .expect("valid harvest regex")
});

static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:,|\bor\b|\band\b|/)\s*").expect("valid separator regex"));

static RESEARCH_COST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bresearch(?:\s+cost)?\s*[:\-]?\s*(?P<n>\d[\d,]*)").expect("valid cost regex")
});

static PURCHASE_COST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:purchase|buy)(?:\s+(?:cost|price))?\s*(?:for\s+)?[:\-]?\s*(?P<n>\d[\d,]*)")
        .expect("valid cost regex")
});

static REN_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<n>\d[\d,]*)\s*ren\b").expect("valid cost regex")
});

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*").expect("valid number regex"));

/// Orbital workshop costs found on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrbitalCosts {
    pub research: Option<u64>,
    pub purchase: Option<u64>,
}

impl OrbitalCosts {
    pub fn has_cost(&self) -> bool {
        self.research.is_some() || self.purchase.is_some()
    }
}

fn parse_number(text: &str) -> Option<u64> {
    text.replace(',', "").parse().ok()
}

/// Whether the name or page text marks the item as ammunition
pub fn is_ammunition(name: &str, text: &str) -> bool {
    let name = name.to_lowercase();
    name.split(|c: char| !c.is_alphanumeric())
        .any(|word| {
            AMMUNITION_WORDS
                .iter()
                .any(|a| word == *a || word.strip_suffix('s') == Some(*a))
        })
        || text.to_lowercase().contains("is a type of ammunition")
}

fn type_keyword(text: &str) -> Option<ItemType> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    TYPE_KEYWORDS
        .iter()
        .find(|(_, words)| {
            words
                .iter()
                .any(|w| tokens.iter().any(|t| t.starts_with(w)))
        })
        .map(|(item_type, _)| *item_type)
}

/// Type named by the infobox, the wiki categories or the item name
pub fn declared_type(name: &str, infobox: &[InfoboxRow], wiki_categories: &[String]) -> Option<ItemType> {
    let from_infobox = infobox
        .iter()
        .filter(|r| {
            let label = r.label.to_lowercase();
            label.contains("type") || label.contains("category")
        })
        .find_map(|r| type_keyword(&r.value));

    from_infobox
        .or_else(|| type_keyword(&wiki_categories.join(" ")))
        .or_else(|| is_ammunition(name, "").then_some(ItemType::Weapon))
}

/// Harvest signal and source locations
pub fn harvest_sources(text: &str, infobox: &[InfoboxRow]) -> (bool, Vec<String>) {
    let mentioned = HARVEST_WORD.is_match(text);

    let mut locations: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let cleaned = candidate
            .trim()
            .trim_start_matches("the ")
            .trim_start_matches("The ")
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .trim();
        let words = cleaned.split_whitespace().count();
        if (1..=5).contains(&words)
            && cleaned.chars().next().is_some_and(char::is_alphabetic)
            && !locations.iter().any(|l| l.eq_ignore_ascii_case(cleaned))
            && locations.len() < MAX_HARVEST_LOCATIONS
        {
            locations.push(cleaned.to_string());
        }
    };

    for row in infobox.iter().filter(|r| {
        let label = r.label.to_lowercase();
        ["source", "harvest", "found", "dropped", "gathered"]
            .iter()
            .any(|k| label.contains(k))
    }) {
        for value in row.values() {
            push(&value);
        }
    }

    for caps in HARVEST_PHRASE.captures_iter(text) {
        if let Some(list) = caps.name("list") {
            for part in LIST_SEPARATOR.split(list.as_str()) {
                push(part);
            }
        }
    }

    (mentioned || !locations.is_empty(), locations)
}

/// Whether any whole word of the label is one of `keys`
fn label_has_word(label: &str, keys: &[&str]) -> bool {
    label
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| keys.iter().any(|k| word.eq_ignore_ascii_case(k)))
}

fn number_from_rows(infobox: &[InfoboxRow], keys: &[&str]) -> Option<u64> {
    infobox
        .iter()
        .filter(|r| label_has_word(&r.label, keys))
        .find_map(|r| LEADING_NUMBER.find(&r.value))
        .and_then(|m| parse_number(m.as_str()))
}

fn number_from_text(re: &Regex, text: &str) -> Option<u64> {
    re.captures(text)
        .and_then(|c| c.name("n"))
        .and_then(|m| parse_number(m.as_str()))
}

/// Orbital workshop mention and the research/purchase costs
pub fn orbital_costs(text: &str, infobox: &[InfoboxRow]) -> (bool, OrbitalCosts) {
    let padded = format!(" {} ", text.to_lowercase());
    let mentioned = ORBITAL_KEYWORDS.iter().any(|k| padded.contains(k));

    let costs = OrbitalCosts {
        research: number_from_rows(infobox, &["research"])
            .or_else(|| number_from_text(&RESEARCH_COST, text)),
        purchase: number_from_rows(infobox, &["purchase", "price", "ren"])
            .or_else(|| number_from_text(&PURCHASE_COST, text))
            .or_else(|| number_from_text(&REN_AMOUNT, text)),
    };

    (mentioned, costs)
}

/// Final item type. Orbital needs cost evidence; harvestable applies only
/// without a recipe; craftable only with ingredients.
pub fn item_type(
    declared: Option<ItemType>,
    orbital: bool,
    costs: &OrbitalCosts,
    harvestable: bool,
    has_ingredients: bool,
) -> ItemType {
    if orbital && costs.has_cost() {
        return ItemType::Orbital;
    }
    if let Some(item_type) = declared {
        return item_type;
    }
    if harvestable && !has_ingredients {
        return ItemType::Harvestable;
    }
    if has_ingredients {
        return ItemType::Craftable;
    }
    ItemType::Unknown
}

fn stat_key(label: &str) -> String {
    let mut key = String::new();
    for (i, word) in label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        let word = word.to_lowercase();
        if i == 0 {
            key.push_str(&word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                key.extend(first.to_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }
    key
}

/// Numeric and textual attributes from the infobox
pub fn stats(infobox: &[InfoboxRow]) -> BTreeMap<String, Value> {
    let mut stats = BTreeMap::new();
    for row in infobox {
        let label = row.label.to_lowercase();
        if !STAT_LABELS.iter().any(|s| label.contains(s)) {
            continue;
        }
        let key = stat_key(&row.label);
        if key.is_empty() || row.value.is_empty() {
            continue;
        }
        let value = row
            .value
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .unwrap_or_else(|| Value::String(row.value.clone()));
        stats.entry(key).or_insert(value);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, value: &str) -> InfoboxRow {
        InfoboxRow {
            label: label.to_string(),
            value: value.to_string(),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_ammunition_names() {
        assert!(is_ammunition("Stone Arrow", ""));
        assert!(is_ammunition("9mm Rounds", ""));
        assert!(is_ammunition("Shotgun Shell", ""));
        assert!(!is_ammunition("Seashell Necklace", ""));
        assert!(!is_ammunition("Wood Spear", ""));
        assert!(is_ammunition("Slug", "This is a type of ammunition for shotguns."));
    }

    #[test]
    fn test_declared_type_sources() {
        assert_eq!(
            declared_type("Thing", &[row("Type", "Tool")], &[]),
            Some(ItemType::Tool)
        );
        assert_eq!(
            declared_type("Thing", &[], &["Armor".to_string()]),
            Some(ItemType::Armor)
        );
        assert_eq!(declared_type("Iron Arrow", &[], &[]), Some(ItemType::Weapon));
        assert_eq!(declared_type("Thing", &[], &[]), None);
    }

    #[test]
    fn test_harvest_sources() {
        let text = "Wood is harvested from trees, bushes and fallen logs. It is a resource.";
        let (harvestable, locations) = harvest_sources(text, &[]);
        assert!(harvestable);
        assert_eq!(locations, vec!["trees", "bushes", "fallen logs"]);

        let (harvestable, locations) =
            harvest_sources("A crafted tool.", &[row("Source", "Arctic, Desert")]);
        assert!(harvestable);
        assert_eq!(locations, vec!["Arctic", "Desert"]);

        assert_eq!(harvest_sources("A crafted tool.", &[]), (false, Vec::new()));
    }

    #[test]
    fn test_harvest_words_need_word_boundaries() {
        assert_eq!(
            harvest_sources("Its final use has not been determined yet.", &[]),
            (false, Vec::new())
        );
        assert!(!harvest_sources("A sharpened stick, undropped by design.", &[]).0);
        assert!(harvest_sources("Fiber can be harvested by hand.", &[]).0);
        assert!(harvest_sources("Copper ore is Mined with a pickaxe.", &[]).0);
    }

    #[test]
    fn test_orbital_requires_cost() {
        let (mentioned, costs) = orbital_costs("Bought from the Orbital Workshop.", &[]);
        assert!(mentioned);
        assert!(!costs.has_cost());
        assert_eq!(item_type(None, mentioned, &costs, false, true), ItemType::Craftable);

        let (mentioned, costs) =
            orbital_costs("Available from the Orbital Workshop. Research: 1,200. Purchase for 450 Ren.", &[]);
        assert!(mentioned);
        assert_eq!(costs.research, Some(1200));
        assert_eq!(costs.purchase, Some(450));
        assert_eq!(item_type(None, mentioned, &costs, false, false), ItemType::Orbital);
    }

    #[test]
    fn test_cost_rows_match_whole_label_words() {
        let infobox = [row("Current Durability", "100"), row("Research", "30")];
        let (mentioned, costs) = orbital_costs("Sold at the Orbital Workshop.", &infobox);
        assert!(mentioned);
        assert_eq!(costs.research, Some(30));
        assert_eq!(costs.purchase, None);

        let (_, costs) = orbital_costs("Orbital item.", &[row("Ren Cost", "250")]);
        assert_eq!(costs.purchase, Some(250));
    }

    #[test]
    fn test_item_type_precedence() {
        let none = OrbitalCosts::default();
        assert_eq!(item_type(Some(ItemType::Weapon), false, &none, true, true), ItemType::Weapon);
        assert_eq!(item_type(None, false, &none, true, false), ItemType::Harvestable);
        assert_eq!(item_type(None, false, &none, true, true), ItemType::Craftable);
        assert_eq!(item_type(None, false, &none, false, false), ItemType::Unknown);
    }

    #[test]
    fn test_stats() {
        let stats = stats(&[
            row("Weight", "1.5 kg"),
            row("Stack Size", "100"),
            row("Crafted at", "Character"),
        ]);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["weight"], Value::String("1.5 kg".to_string()));
        assert_eq!(stats["stackSize"], serde_json::json!(100.0));
    }
}
