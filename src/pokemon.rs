// pokemon.rs
// Raw PokeAPI response records, decoded as-is before any view-model work.

use serde::{Deserialize, Serialize};

/// A `{name, url}` link between API resources.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NamedAPIResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Body of a collection endpoint such as `GET /move?limit=50`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamedAPIResourceList {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub sprites: PokemonSprites,
    #[serde(default)]
    pub types: Vec<PokemonType>,
    #[serde(default)]
    pub abilities: Vec<PokemonAbility>,
    #[serde(default)]
    pub stats: Vec<PokemonStat>,
    #[serde(default)]
    pub moves: Vec<PokemonMove>,
    #[serde(default)]
    pub species: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PokemonSprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<Artwork>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Artwork {
    #[serde(default)]
    pub front_default: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonType {
    pub slot: u32,
    pub r#type: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonAbility {
    #[serde(default)]
    pub is_hidden: bool,
    pub slot: u32,
    pub ability: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonStat {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonMove {
    pub r#move: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonSpecies {
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
    #[serde(default)]
    pub genera: Vec<Genus>,
    #[serde(default)]
    pub evolution_chain: Option<ApiLink>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiLink {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlavorText {
    pub flavor_text: String,
    pub language: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Genus {
    pub genus: String,
    pub language: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EvolutionChain {
    #[serde(default)]
    pub id: u32,
    pub chain: ChainLink,
}

/// One stage of an evolution chain; `evolves_to` holds the branches.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainLink {
    pub species: NamedAPIResource,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

/// One element of `GET /pokemon/{id}/encounters`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationAreaEncounter {
    pub location_area: NamedAPIResource,
}

/// `GET /type/{name}`, used to list the Pokémon of a type.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Type {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub pokemon: Vec<TypePokemon>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TypePokemon {
    pub slot: u32,
    pub pokemon: NamedAPIResource,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Nature {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub increased_stat: Option<NamedAPIResource>,
    #[serde(default)]
    pub decreased_stat: Option<NamedAPIResource>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationArea {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub pokemon_encounters: Vec<PokemonEncounter>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PokemonEncounter {
    pub pokemon: NamedAPIResource,
}
