//! Recipe-table detection
//!
//! A table qualifies as a recipe when its header row names an amount or a
//! material column. The first qualifying table is the base recipe and later
//! ones are talent variants. Quantities are read from the first integer cell of
//! each row and the ingredient name from the nearest neighbouring cell.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::page::Table;
use crate::record::{Ingredients, Quantity, UNKNOWN, total_cost};

/// Header labels that mark a recipe table
pub const RECIPE_HEADER_LABELS: &[&str] = &["amount", "quantity", "material", "resource", "materials"];

/// Cell texts that are column labels, never ingredient names
const HEADER_WORDS: &[&str] = &[
    "amount",
    "quantity",
    "material",
    "materials",
    "resource",
    "resources",
    "total",
    "item",
    "ingredient",
    "ingredients",
];

static BATCH_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)crafted\s+in\s+batch(?:es)?\s+of\s+(\d+)").expect("valid batch regex")
});

/// Phrasings that name a talent, most specific first
static TALENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"\b(?i:with|using|requires|require|if you have)\s+(?i:the\s+)?["“']?(?P<name>[A-Z][\w'’-]*(?:\s+[A-Z][\w'’-]*){0,5})["”']?\s+(?i:talent)"#,
        r#"(?i:talent)\s*[:\-–]\s*["“']?(?P<name>[A-Z][\w'’-]*(?:\s+[A-Z][\w'’-]*){0,5})"#,
        r#"["“](?P<name>[A-Z][^"”]{2,40})["”]\s+(?i:talent)"#,
        r#"(?P<name>[A-Z][\w'’-]*(?:\s+[A-Z][\w'’-]*){0,4})\s+(?i:talent)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid talent regex"))
    .collect()
});

static TALENT_EFFECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<effect>[^.,;!?]*?[-+]?\d+(?:\.\d+)?\s*%[^.,;!?]*)").expect("valid effect regex")
});

/// Talent attribution found near a variant table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TalentInfo {
    pub name: Option<String>,
    pub effect: Option<String>,
}

/// A variant table after parsing
#[derive(Debug, Clone, PartialEq)]
pub struct VariantTable {
    pub ingredients: Ingredients,
    pub talent: TalentInfo,
}

/// All recipes found on a page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageRecipes {
    pub base: Ingredients,
    pub variants: Vec<VariantTable>,
}

/// Whether the header row names a quantity or material column
pub fn is_recipe_table(table: &Table) -> bool {
    table
        .headers
        .iter()
        .any(|h| RECIPE_HEADER_LABELS.iter().any(|label| h.contains(label)))
}

/// Batch size stated on the page, if any
pub fn batch_size(text: &str) -> Option<u32> {
    BATCH_SIZE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|n| *n > 1)
}

/// Integer value of a quantity cell; commas and multiplication glyphs are ignored
pub fn parse_quantity(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches(['x', 'X', '×', '✕', '*'])
        .trim_end_matches(['x', 'X', '×', '✕', '*'])
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<i64>().ok()
}

/// Strip embedded digits and multiplication glyphs from an ingredient name
pub fn normalize_ingredient_name(raw: &str) -> String {
    let without_digits: String = raw
        .chars()
        .filter(|c| !c.is_ascii_digit() && !matches!(c, '×' | '✕' | '*'))
        .collect();

    without_digits
        .split_whitespace()
        .filter(|token| {
            !token
                .chars()
                .all(|c| matches!(c, 'x' | 'X' | '(' | ')' | '[' | ']' | ':' | ',' | '.'))
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, ':' | '-' | ',' | '.'))
        .trim()
        .to_string()
}

fn cell_name(cell: &crate::page::Cell) -> Option<String> {
    let from_title = cell
        .link_titles
        .iter()
        .filter(|t| !t.starts_with("File:") && !t.starts_with("Category:"))
        .map(|t| normalize_ingredient_name(t))
        .find(|t| !t.is_empty());

    let name = from_title.or_else(|| {
        let text = normalize_ingredient_name(&cell.text);
        (!text.is_empty()).then_some(text)
    })?;

    let lower = name.to_lowercase();
    if HEADER_WORDS.contains(&lower.as_str()) || !name.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(name)
}

/// Ingredients of one recipe table, divided by the page batch size
pub fn table_ingredients(table: &Table, batch: Option<u32>) -> Ingredients {
    let mut ingredients = Ingredients::new();

    for row in &table.rows {
        let Some((index, amount)) = row
            .iter()
            .enumerate()
            .find_map(|(i, cell)| parse_quantity(&cell.text).map(|q| (i, q)))
        else {
            continue;
        };

        if amount <= 0 {
            debug!("Dropping row with non-positive quantity {}", amount);
            continue;
        }

        let neighbours = [index.checked_sub(1), Some(index + 1)];
        let Some(name) = neighbours
            .into_iter()
            .flatten()
            .filter_map(|j| row.get(j))
            .find_map(cell_name)
        else {
            continue;
        };

        let quantity =
            Quantity::new(amount as f64).and_then(|q| q.per_unit(batch.unwrap_or(1)));
        match quantity {
            Some(quantity) => {
                ingredients.insert(name, quantity);
            }
            None => debug!("Dropping {} after batch normalization", name),
        }
    }

    ingredients
}

/// Talent name and effect mentioned in a table's surrounding text
pub fn talent_info(context: &str) -> TalentInfo {
    let name = TALENT_PATTERNS.iter().find_map(|re| {
        re.captures(context)
            .and_then(|c| c.name("name"))
            .map(|m| m.as_str().trim().to_string())
            .filter(|n| !n.eq_ignore_ascii_case("the") && !n.is_empty())
    });

    let effect = name.as_ref().and_then(|_| {
        TALENT_EFFECT
            .captures(context)
            .and_then(|c| c.name("effect"))
            .map(|m| m.as_str().trim().to_string())
    });

    TalentInfo { name, effect }
}

/// Parse every recipe table on the page into a base recipe and its variants
pub fn extract_recipes(tables: &[Table], batch: Option<u32>) -> PageRecipes {
    let mut parsed: Vec<(Ingredients, &Table)> = tables
        .iter()
        .filter(|t| is_recipe_table(t))
        .map(|t| (table_ingredients(t, batch), t))
        .filter(|(ingredients, _)| !ingredients.is_empty())
        .collect();

    if parsed.is_empty() {
        return PageRecipes::default();
    }

    let (base, _) = parsed.remove(0);
    let mut recipes = PageRecipes {
        base,
        variants: parsed
            .into_iter()
            .map(|(ingredients, table)| VariantTable {
                ingredients,
                talent: talent_info(&table.context),
            })
            .collect(),
    };

    // With exactly one variant, a base costlier than its variant means the
    // detected order is reversed; the talent attribution stays on the variant.
    if recipes.variants.len() == 1 {
        let base_total = total_cost(&recipes.base);
        let variant_total = total_cost(&recipes.variants[0].ingredients);
        if base_total > variant_total {
            debug!(
                "Swapping base ({}) and talent variant ({}) recipes",
                base_total, variant_total
            );
            std::mem::swap(&mut recipes.base, &mut recipes.variants[0].ingredients);
        }
    }

    recipes
}

/// Talent name for storage, with the unknown sentinel
pub fn talent_name_or_unknown(info: &TalentInfo) -> String {
    info.name.clone().unwrap_or_else(|| UNKNOWN.to_string())
}
