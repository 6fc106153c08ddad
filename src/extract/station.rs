//! Crafting-station detection and tech tier

use std::sync::LazyLock;

use regex::Regex;

use crate::page::InfoboxRow;

/// Station assumed for ammunition pages that name none
pub const AMMUNITION_STATION: &str = "Machining Bench";

/// Known stations with their tech tier. Longer names come before any name
/// they contain so tier lookup by substring hits the specific one first.
pub const STATIONS: &[(&str, u32)] = &[
    ("Character", 1),
    ("Mortar and Pestle", 1),
    ("Campfire", 1),
    ("Drying Rack", 1),
    ("Crafting Bench", 2),
    ("Anvil Bench", 2),
    ("Masonry Bench", 2),
    ("Carpentry Bench", 2),
    ("Textiles Bench", 2),
    ("Skinning Bench", 2),
    ("Herbalism Bench", 2),
    ("Kitchen Bench", 2),
    ("Cooking Station", 2),
    ("Stone Furnace", 2),
    ("Machining Bench", 3),
    ("Concrete Furnace", 3),
    ("Cement Mixer", 3),
    ("Kitchen Stove", 3),
    ("Glassworking Bench", 3),
    ("Electric Furnace", 4),
    ("Material Processor", 4),
    ("Fabricator", 4),
];

/// Words a free-form station phrase may end with
const STATION_SUFFIXES: &[&str] = &["bench", "station", "furnace", "forge", "menu"];

static CRAFTED_AT_THE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:crafted\s+at\s+the)\s+(?P<station>[A-Z][\w'’-]*(?:\s+(?:[A-Z][\w'’-]*|and|of)){0,4})")
        .expect("valid station regex")
});

static CRAFTED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)crafted\s+(?:at|in|on|using)\s+(?:an?\s+|the\s+)?(?P<station>(?:[\w'’-]+\s+){0,3}?(?:bench|station|furnace|forge|menu))\b",
    )
    .expect("valid station regex")
});

static TIER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid tier regex"));

/// Canonical spelling for a case-insensitive known station name
fn canonical(name: &str) -> Option<&'static str> {
    STATIONS
        .iter()
        .map(|(station, _)| *station)
        .find(|station| station.eq_ignore_ascii_case(name.trim()))
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
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

fn looks_like_station(value: &str) -> bool {
    let lower = value.to_lowercase();
    canonical(value).is_some() || STATION_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

fn tidy(name: &str) -> String {
    let trimmed = name
        .trim()
        .trim_end_matches(" and")
        .trim_end_matches(" of")
        .trim();
    canonical(trimmed)
        .map(str::to_string)
        .unwrap_or_else(|| title_case(trimmed))
}

/// Earliest known station named anywhere in `text`, excluding the bare
/// "Character" which is too common a word
fn earliest_known(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    STATIONS
        .iter()
        .filter(|(station, _)| *station != "Character")
        .filter_map(|(station, _)| {
            let needle = station.to_lowercase();
            lower
                .match_indices(&needle)
                .find(|(pos, _)| is_word_boundary(&lower, *pos, needle.len()))
                .map(|(pos, _)| (pos, *station))
        })
        .min_by_key(|(pos, station)| (*pos, std::cmp::Reverse(station.len())))
        .map(|(_, station)| station)
}

fn is_word_boundary(text: &str, start: usize, len: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[start + len..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Station values from infobox rows whose label mentions crafting
pub fn infobox_stations(infobox: &[InfoboxRow]) -> Vec<String> {
    let mut stations: Vec<String> = Vec::new();
    for row in infobox
        .iter()
        .filter(|r| r.label.to_lowercase().contains("craft"))
    {
        for value in row.values() {
            if !looks_like_station(&value) {
                continue;
            }
            let name = tidy(&value);
            if !stations.contains(&name) {
                stations.push(name);
            }
        }
    }
    stations
}

/// Crafting station named by the page. Sources are tried in order: a
/// "crafted at the X" phrase, a "crafted at ... bench" phrase, the first
/// known station in the text, then the infobox.
pub fn detect_station(text: &str, infobox: &[InfoboxRow]) -> Option<String> {
    if let Some(m) = CRAFTED_AT_THE.captures(text).and_then(|c| c.name("station")) {
        let name = tidy(m.as_str());
        if !name.is_empty() {
            return Some(name);
        }
    }

    if let Some(m) = CRAFTED_SUFFIX.captures(text).and_then(|c| c.name("station")) {
        return Some(tidy(m.as_str()));
    }

    if let Some(station) = earliest_known(text) {
        return Some(station.to_string());
    }

    infobox_stations(infobox).into_iter().next()
}

/// Tech tier from an explicit infobox tier row, else from the station name;
/// 0 when neither is known
pub fn tier(infobox: &[InfoboxRow], crafted_at: &str) -> u32 {
    let explicit = infobox
        .iter()
        .filter(|r| r.label.to_lowercase().contains("tier"))
        .find_map(|r| TIER_NUMBER.find(&r.value))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    if let Some(tier) = explicit {
        return tier;
    }

    let lower = crafted_at.to_lowercase();
    STATIONS
        .iter()
        .find(|(station, _)| lower.contains(&station.to_lowercase()))
        .map(|(_, tier)| *tier)
        .unwrap_or(0)
}
