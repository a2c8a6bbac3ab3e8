//! Display records: raw API records enriched with presentation fields.

use crate::colors::{Rgb, SECONDARY_DARKEN, UNKNOWN_COLOR, resolve_color};
use crate::pokemon::{NamedAPIResource, Pokemon, PokemonSpecies, PokemonSprites};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const NO_DESCRIPTION: &str = "No description available.";
pub const DEFAULT_GENUS: &str = "Pokémon";
pub const UNKNOWN_TYPE: &str = "unknown";
const LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    pub slot_index: u32,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub slot_index: u32,
    pub ability_name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub stat_name: String,
    pub base_stat: u32,
    pub effort: u32,
}

/// One creature as fetched, with nested API fields flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    pub image_url: Option<String>,
    /// Ordered by slot; the first slot is the primary type.
    pub types: Vec<TypeSlot>,
    pub abilities: Vec<AbilitySlot>,
    pub stats: Vec<StatEntry>,
    /// Decimetres.
    pub height: u32,
    /// Hectograms.
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub primary_color: Rgb,
    pub secondary_color: Rgb,
    /// Set on records substituted for a failed fetch.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

/// A favorite is a display record held by the favorites store.
pub type FavoriteEntry = DisplayRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterLocation {
    pub display_name: String,
    pub api_name: String,
}

/// A named row of a reference list (moves, items, abilities...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub name: String,
    pub display_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Id,
    Name,
}

/// Official artwork if present, else the default sprite.
pub fn resolve_image(sprites: &PokemonSprites) -> Option<String> {
    let artwork = sprites
        .other
        .as_ref()
        .and_then(|other| other.official_artwork.as_ref())
        .and_then(|art| art.front_default.as_deref());

    artwork
        .filter(|url| !url.is_empty())
        .or_else(|| sprites.front_default.as_deref().filter(|url| !url.is_empty()))
        .map(str::to_string)
}

impl CatalogEntry {
    pub fn from_pokemon(pokemon: &Pokemon) -> Self {
        let mut types: Vec<TypeSlot> = pokemon
            .types
            .iter()
            .map(|t| TypeSlot {
                slot_index: t.slot,
                type_name: t.r#type.name.to_lowercase(),
            })
            .collect();
        types.sort_by_key(|t| t.slot_index);

        Self {
            id: pokemon.id,
            name: pokemon.name.clone(),
            image_url: resolve_image(&pokemon.sprites),
            types,
            abilities: pokemon
                .abilities
                .iter()
                .map(|a| AbilitySlot {
                    slot_index: a.slot,
                    ability_name: a.ability.name.clone(),
                    is_hidden: a.is_hidden,
                })
                .collect(),
            stats: pokemon
                .stats
                .iter()
                .map(|s| StatEntry {
                    stat_name: s.stat.name.clone(),
                    base_stat: s.base_stat,
                    effort: s.effort,
                })
                .collect(),
            height: pokemon.height,
            weight: pokemon.weight,
        }
    }

    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(|t| t.type_name.as_str())
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types
            .iter()
            .any(|t| t.type_name.eq_ignore_ascii_case(type_name))
    }
}

impl DisplayRecord {
    pub fn from_entry(entry: CatalogEntry) -> Self {
        let primary = entry.primary_type().map(resolve_color).unwrap_or(UNKNOWN_COLOR);
        Self {
            entry,
            primary_color: primary,
            secondary_color: primary.darken(SECONDARY_DARKEN),
            placeholder: false,
        }
    }

    pub fn from_pokemon(pokemon: &Pokemon) -> Self {
        Self::from_entry(CatalogEntry::from_pokemon(pokemon))
    }

    /// Record shown in place of one whose fetch failed.
    pub fn placeholder(id: u32, name: &str) -> Self {
        let mut record = Self::from_entry(CatalogEntry {
            id,
            name: name.to_string(),
            image_url: None,
            types: vec![TypeSlot {
                slot_index: 1,
                type_name: UNKNOWN_TYPE.to_string(),
            }],
            abilities: Vec::new(),
            stats: Vec::new(),
            height: 0,
            weight: 0,
        });
        record.placeholder = true;
        record
    }

    pub fn id(&self) -> u32 {
        self.entry.id
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }
}

impl From<&NamedAPIResource> for ReferenceEntry {
    fn from(resource: &NamedAPIResource) -> Self {
        Self {
            name: resource.name.clone(),
            display_name: display_name(&resource.name),
            url: resource.url.clone(),
        }
    }
}

impl EncounterLocation {
    pub fn from_area(api_name: &str) -> Self {
        Self {
            display_name: display_name(api_name),
            api_name: api_name.to_string(),
        }
    }

    /// Single row shown when encounters could not be loaded.
    pub fn none_found() -> Self {
        Self {
            display_name: "No locations found.".to_string(),
            api_name: String::new(),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub fn sort_records(records: &mut [DisplayRecord], order: SortOrder) {
    match order {
        SortOrder::Id => records.sort_by_key(DisplayRecord::id),
        SortOrder::Name => records.sort_by(|a, b| {
            compare_names(a.name(), b.name()).then_with(|| a.id().cmp(&b.id()))
        }),
    }
}

/// Keeps records of `type_filter` (ignored when absent or `unknown`) whose
/// name or id contains `search`.
pub fn filter_records(
    records: &[DisplayRecord],
    type_filter: Option<&str>,
    search: &str,
) -> Vec<DisplayRecord> {
    let type_filter =
        type_filter.filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(UNKNOWN_TYPE));
    let needle = search.trim().to_lowercase();

    records
        .iter()
        .filter(|r| type_filter.is_none_or(|t| r.entry.has_type(t)))
        .filter(|r| {
            needle.is_empty()
                || r.name().to_lowercase().contains(&needle)
                || r.id().to_string().contains(&needle)
        })
        .cloned()
        .collect()
}

/// `razor-wind` becomes `RAZOR WIND`.
pub fn display_name(api_name: &str) -> String {
    api_name.replace('-', " ").to_uppercase()
}

pub fn stat_label(stat_name: &str) -> String {
    match stat_name.to_lowercase().as_str() {
        "hp" => "HP".to_string(),
        "attack" => "ATK".to_string(),
        "defense" => "DEF".to_string(),
        "special-attack" => "SP. ATK".to_string(),
        "special-defense" => "SP. DEF".to_string(),
        "speed" => "SPD".to_string(),
        other => other.to_uppercase(),
    }
}

/// Pads ids to three digits: `#001`.
pub fn format_id(id: u32) -> String {
    format!("#{:03}", id)
}

/// Flattens the line and page breaks the games embed in flavour text.
pub fn description_text(flavor_text: &str) -> String {
    flavor_text.replace(['\n', '\u{c}'], " ")
}

pub fn english_description(species: &PokemonSpecies) -> String {
    species
        .flavor_text_entries
        .iter()
        .find(|entry| entry.language.name == LANGUAGE)
        .map(|entry| description_text(&entry.flavor_text))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string())
}

pub fn english_genus(species: &PokemonSpecies) -> String {
    species
        .genera
        .iter()
        .find(|entry| entry.language.name == LANGUAGE)
        .map(|entry| entry.genus.clone())
        .unwrap_or_else(|| DEFAULT_GENUS.to_string())
}
