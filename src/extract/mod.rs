//! Item-page extraction
//!
//! [`Extractor`] turns one fetched item page into an [`ItemRecord`]. Every
//! sub-step is best-effort: a lookup that finds nothing leaves its field at the
//! unknown sentinel and the remaining steps still run. The only failure mode is
//! a fetch failure, which [`Extractor::extract`] folds into a minimal record and
//! [`Extractor::try_extract`] reports to the caller.

pub mod classify;
pub mod recipe;
pub mod station;

use tracing::{debug, instrument, warn};

use crate::fetch::{FetchError, Fetcher};
use crate::page::Page;
use crate::record::{ItemRecord, PageRef, Recipe, TalentRecipe, UNKNOWN};

/// Longest description kept on a record, in characters
pub const MAX_DESCRIPTION_CHARS: usize = 300;

/// Shortest paragraph accepted as a description
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Fetches item pages and parses them into records
#[derive(Debug, Clone)]
pub struct Extractor<F> {
    fetcher: F,
}

impl<F: Fetcher> Extractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Fetch and parse one page; a fetch failure is returned to the caller
    #[instrument(skip(self), fields(title = %page_ref.title), level = "debug")]
    pub async fn try_extract(&self, page_ref: &PageRef) -> Result<ItemRecord, FetchError> {
        let html = self.fetcher.fetch(&page_ref.url).await?;
        Ok(extract_html(page_ref, &html))
    }

    /// Fetch and parse one page; a fetch failure yields the minimal unknown record
    pub async fn extract(&self, page_ref: &PageRef) -> ItemRecord {
        match self.try_extract(page_ref).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to fetch {}: {}", page_ref.url, e);
                ItemRecord::minimal(&page_ref.title, &page_ref.url)
            }
        }
    }
}

/// Parse already-fetched HTML into a record
pub fn extract_html(page_ref: &PageRef, html: &str) -> ItemRecord {
    let page = Page::parse(html);
    extract_page(&page, page_ref)
}

/// Run every extraction step over a parsed page
pub fn extract_page(page: &Page, page_ref: &PageRef) -> ItemRecord {
    let name = page
        .heading()
        .unwrap_or_else(|| page_ref.title.clone());
    let mut record = ItemRecord::minimal(name, &page_ref.url);

    let text = page.text();
    let infobox = page.infobox_rows();
    record.wiki_categories = page.category_links();
    record.description = description(page, &infobox);

    let batch = recipe::batch_size(&text);
    let recipes = recipe::extract_recipes(&page.tables(), batch);

    let mut crafted_at = station::detect_station(&text, &infobox);
    if crafted_at.is_none() && classify::is_ammunition(&record.name, &text) {
        debug!("No station found for ammunition {}", record.name);
        crafted_at = Some(station::AMMUNITION_STATION.to_string());
    }
    let crafted_at = crafted_at.unwrap_or_else(|| UNKNOWN.to_string());

    record.crafting_stations = station::infobox_stations(&infobox);
    if record.crafting_stations.is_empty() && crafted_at != UNKNOWN {
        record.crafting_stations.push(crafted_at.clone());
    }
    record.tier = station::tier(&infobox, &crafted_at);

    let has_ingredients = !recipes.base.is_empty();
    record.base_recipe = Recipe {
        ingredients: recipes.base,
        crafted_at: crafted_at.clone(),
    };
    record.talent_recipes = recipes
        .variants
        .into_iter()
        .map(|variant| TalentRecipe {
            talent_name: recipe::talent_name_or_unknown(&variant.talent),
            talent_effect: variant.talent.effect,
            ingredients: variant.ingredients,
            crafted_at: crafted_at.clone(),
        })
        .collect();

    let (harvestable, locations) = classify::harvest_sources(&text, &infobox);
    let (orbital, costs) = classify::orbital_costs(&text, &infobox);
    let declared = classify::declared_type(&record.name, &infobox, &record.wiki_categories);
    record.item_type = classify::item_type(declared, orbital, &costs, harvestable, has_ingredients);

    if harvestable && !has_ingredients {
        record.harvested_from = locations;
    }
    if orbital && costs.has_cost() {
        record.research_cost = costs.research;
        record.purchase_cost = costs.purchase;
    }
    record.stats = classify::stats(&infobox);

    debug!(
        "Extracted {} ({}, {} ingredients, {} variants)",
        record.name,
        record.item_type,
        record.base_recipe.ingredients.len(),
        record.talent_recipes.len()
    );
    record
}

fn description(page: &Page, infobox: &[crate::page::InfoboxRow]) -> Option<String> {
    infobox
        .iter()
        .find(|r| r.label.eq_ignore_ascii_case("description"))
        .map(|r| r.value.clone())
        .filter(|d| !d.is_empty())
        .or_else(|| page.meta_description())
        .or_else(|| page.first_paragraph(MIN_PARAGRAPH_CHARS))
        .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}
