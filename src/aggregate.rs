//! Fan-out/fan-in pipeline that turns API references into display records.
//!
//! Every fan-out runs at most `concurrency` requests at once and yields results
//! in request order. A failed item is replaced by a placeholder and reported
//! as a warning; only the initial list call (or a single-record lookup) fails
//! the whole operation.

use crate::client::{Fetcher, Resource, detail, fetch_json, fetch_url, id_from_url, list};
use crate::display::{
    DisplayRecord, EncounterLocation, ReferenceEntry, SortOrder, display_name,
    english_description, english_genus, filter_records, sort_records,
};
use crate::error::CatalogError;
use crate::evolution::{EvolutionNode, resolve_chain};
use crate::pokemon::{
    LocationArea, LocationAreaEncounter, NamedAPIResource, Nature, Pokemon, PokemonSpecies, Type,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Location areas searched when resolving a location by name.
const LOCATION_AREA_LIMIT: u32 = 1000;

/// Items of a fan-out plus one warning per substituted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub warnings: Vec<String>,
}

impl<T> Batch<T> {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl Batch<DisplayRecord> {
    /// Applies [`filter_records`] and drops the warnings of placeholders that
    /// were filtered out.
    pub fn filtered(self, type_filter: Option<&str>, search: &str) -> Self {
        let items = filter_records(&self.items, type_filter, search);
        let warnings = self
            .warnings
            .into_iter()
            .filter(|warning| {
                let name = warning.split_once(": ").map_or(warning.as_str(), |(name, _)| name);
                items.iter().any(|r| r.placeholder && r.name() == name)
            })
            .collect();
        Self { items, warnings }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonDetail {
    pub record: DisplayRecord,
    pub genus: String,
    pub description: String,
    pub moves: Vec<String>,
    pub evolution: Vec<EvolutionNode>,
    pub locations: Vec<EncounterLocation>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatureSummary {
    pub name: String,
    pub display_name: String,
    pub increased_stat: Option<String>,
    pub decreased_stat: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDetail {
    pub area_id: u32,
    pub name: String,
    pub display_name: String,
    pub encounters: Vec<ReferenceEntry>,
}

/// Checks a navigation parameter before anything is requested.
pub fn validate_pokemon_id(id: Option<i64>) -> Result<u32, CatalogError> {
    id.filter(|id| *id >= 1)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| CatalogError::InvalidInput("Error: Invalid Pokémon ID.".to_string()))
}

/// Parses a raw id parameter such as a path segment.
pub fn parse_pokemon_id(raw: Option<&str>) -> Result<u32, CatalogError> {
    validate_pokemon_id(raw.and_then(|s| s.trim().parse::<i64>().ok()))
}

fn placeholder_record(reference: &NamedAPIResource) -> DisplayRecord {
    DisplayRecord::placeholder(id_from_url(&reference.url).unwrap_or(0), &reference.name)
}

fn placeholder_nature(reference: &NamedAPIResource) -> NatureSummary {
    NatureSummary {
        name: reference.name.clone(),
        display_name: display_name(&reference.name),
        increased_stat: None,
        decreased_stat: None,
    }
}

pub struct Catalog<F: ?Sized> {
    fetcher: Arc<F>,
    concurrency: usize,
}

impl<F: ?Sized> Clone for Catalog<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            concurrency: self.concurrency,
        }
    }
}

impl<F> Catalog<F>
where
    F: Fetcher + ?Sized,
{
    pub fn new(fetcher: Arc<F>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Drives `pending` (one future per reference) with bounded concurrency,
    /// keeping request order.
    ///
    /// Failures become `fallback(reference)` and a warning. Cancellation
    /// fails the whole batch so that a disposed caller never sees placeholders.
    async fn fan_out<'a, T>(
        &self,
        refs: &[NamedAPIResource],
        pending: Vec<BoxFuture<'a, Result<T, CatalogError>>>,
        cancel: &CancellationToken,
        fallback: fn(&NamedAPIResource) -> T,
    ) -> Result<Batch<T>, CatalogError> {
        let results: Vec<Result<T, CatalogError>> = stream::iter(pending)
            .buffered(self.concurrency)
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }

        let mut batch = Batch {
            items: Vec::with_capacity(results.len()),
            warnings: Vec::new(),
        };
        for (reference, result) in refs.iter().zip(results) {
            match result {
                Ok(item) => batch.items.push(item),
                Err(CatalogError::Cancelled) => return Err(CatalogError::Cancelled),
                Err(e) => {
                    tracing::warn!("Substituting placeholder for {}: {}", reference.name, e);
                    batch.warnings.push(format!("{}: {}", reference.name, e));
                    batch.items.push(fallback(reference));
                }
            }
        }
        Ok(batch)
    }

    /// Fetches and builds one display record per reference.
    pub async fn display_records(
        &self,
        refs: &[NamedAPIResource],
        cancel: &CancellationToken,
    ) -> Result<Batch<DisplayRecord>, CatalogError> {
        let fetcher = &*self.fetcher;
        let pending = refs
            .iter()
            .map(|reference| {
                async move {
                    let pokemon: Pokemon = fetch_url(fetcher, &reference.url, cancel).await?;
                    Ok::<_, CatalogError>(DisplayRecord::from_pokemon(&pokemon))
                }
                .boxed()
            })
            .collect();
        self.fan_out(refs, pending, cancel, placeholder_record).await
    }

    /// The first `limit` Pokémon as display records.
    pub async fn pokemon_list(
        &self,
        limit: u32,
        order: SortOrder,
        cancel: &CancellationToken,
    ) -> Result<Batch<DisplayRecord>, CatalogError> {
        let refs = list(&*self.fetcher, Resource::Pokemon, limit, cancel).await?;
        let mut batch = self.display_records(&refs, cancel).await?;
        sort_records(&mut batch.items, order);
        tracing::info!(
            "Built {} display records ({} substituted)",
            batch.items.len(),
            batch.warnings.len()
        );
        Ok(batch)
    }

    /// Every Pokémon of `type_name`, sorted by name.
    pub async fn pokemon_by_type(
        &self,
        type_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Batch<DisplayRecord>, CatalogError> {
        let key = type_name.trim().to_lowercase();
        if key.is_empty() {
            return Err(CatalogError::InvalidInput("Type name not provided.".to_string()));
        }
        let ty: Type = detail(&*self.fetcher, Resource::Type, &key, cancel).await?;
        let refs: Vec<NamedAPIResource> = ty.pokemon.into_iter().map(|p| p.pokemon).collect();
        let mut batch = self.display_records(&refs, cancel).await?;
        sort_records(&mut batch.items, SortOrder::Name);
        Ok(batch)
    }

    pub async fn pokemon(
        &self,
        id: u32,
        cancel: &CancellationToken,
    ) -> Result<DisplayRecord, CatalogError> {
        let pokemon: Pokemon = detail(&*self.fetcher, Resource::Pokemon, id, cancel).await?;
        Ok(DisplayRecord::from_pokemon(&pokemon))
    }

    /// A random Pokémon with an id in `1..=max_id`.
    pub async fn random_pokemon(
        &self,
        max_id: u32,
        cancel: &CancellationToken,
    ) -> Result<DisplayRecord, CatalogError> {
        let id = rand::random_range(1..=max_id.max(1));
        tracing::debug!("Recommending Pokémon #{}", id);
        self.pokemon(id, cancel).await
    }

    /// Everything the detail screen shows for one Pokémon.
    ///
    /// An invalid id fails before any request is issued.
    pub async fn pokemon_detail(
        &self,
        id: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<PokemonDetail, CatalogError> {
        let id = validate_pokemon_id(id)?;
        let fetcher = &*self.fetcher;

        let pokemon: Pokemon = detail(fetcher, Resource::Pokemon, id, cancel).await?;
        let species: PokemonSpecies = detail(fetcher, Resource::PokemonSpecies, id, cancel).await?;

        let mut warnings = Vec::new();
        let evolution = match &species.evolution_chain {
            Some(link) => match resolve_chain(fetcher, &link.url, cancel).await {
                Ok(roots) => roots,
                Err(CatalogError::Cancelled) => return Err(CatalogError::Cancelled),
                Err(e) => {
                    tracing::error!("Error loading evolution chain for #{}: {}", id, e);
                    warnings.push(format!("evolution chain: {}", e));
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let locations = self.encounter_locations(id, cancel).await?;

        Ok(PokemonDetail {
            genus: english_genus(&species),
            description: english_description(&species),
            moves: pokemon.moves.iter().map(|m| display_name(&m.r#move.name)).collect(),
            record: DisplayRecord::from_pokemon(&pokemon),
            evolution,
            locations,
            warnings,
        })
    }

    /// The evolution tree of a Pokémon's species; empty when it has none.
    pub async fn evolution(
        &self,
        id: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<Vec<EvolutionNode>, CatalogError> {
        let id = validate_pokemon_id(id)?;
        let species: PokemonSpecies =
            detail(&*self.fetcher, Resource::PokemonSpecies, id, cancel).await?;
        match &species.evolution_chain {
            Some(link) => resolve_chain(&*self.fetcher, &link.url, cancel).await,
            None => Ok(Vec::new()),
        }
    }

    /// Areas where the Pokémon can be encountered.
    ///
    /// A failed lookup yields the single "No locations found." row.
    pub async fn encounter_locations(
        &self,
        id: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<EncounterLocation>, CatalogError> {
        let path = format!("{}/encounters", Resource::Pokemon.detail_path(id));
        match fetch_json::<Vec<LocationAreaEncounter>, _>(&*self.fetcher, &path, cancel).await {
            Ok(encounters) => Ok(encounters
                .iter()
                .map(|e| EncounterLocation::from_area(&e.location_area.name))
                .collect()),
            Err(CatalogError::Cancelled) => Err(CatalogError::Cancelled),
            Err(e) => {
                tracing::error!("Error loading locations for #{}: {}", id, e);
                Ok(vec![EncounterLocation::none_found()])
            }
        }
    }

    /// Plain name lists for moves, items and abilities.
    pub async fn references(
        &self,
        resource: Resource,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReferenceEntry>, CatalogError> {
        let refs = list(&*self.fetcher, resource, limit, cancel).await?;
        Ok(refs.iter().map(ReferenceEntry::from).collect())
    }

    /// Natures with the stats they raise and lower.
    pub async fn natures(
        &self,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Batch<NatureSummary>, CatalogError> {
        let fetcher = &*self.fetcher;
        let refs = list(fetcher, Resource::Nature, limit, cancel).await?;
        let pending = refs
            .iter()
            .map(|reference| {
                async move {
                    let nature: Nature = fetch_url(fetcher, &reference.url, cancel).await?;
                    Ok::<_, CatalogError>(NatureSummary {
                        display_name: display_name(&nature.name),
                        increased_stat: nature.increased_stat.map(|s| display_name(&s.name)),
                        decreased_stat: nature.decreased_stat.map(|s| display_name(&s.name)),
                        name: nature.name,
                    })
                }
                .boxed()
            })
            .collect();
        self.fan_out(&refs, pending, cancel, placeholder_nature).await
    }

    /// Resolves a location name (as listed under a Pokémon's encounters) to
    /// its area and the Pokémon found there.
    pub async fn location_detail(
        &self,
        location_name: &str,
        cancel: &CancellationToken,
    ) -> Result<LocationDetail, CatalogError> {
        let location_name = location_name.trim();
        if location_name.is_empty() {
            return Err(CatalogError::InvalidInput("Location name not provided.".to_string()));
        }

        let fetcher = &*self.fetcher;
        let areas = list(fetcher, Resource::LocationArea, LOCATION_AREA_LIMIT, cancel).await?;
        let suffixed = format!("{}-area", location_name);
        let found = areas
            .iter()
            .find(|area| area.name == location_name || area.name == suffixed)
            .ok_or_else(|| {
                CatalogError::InvalidInput(format!(
                    "No details found for location \"{}\".",
                    location_name
                ))
            })?;

        let area_id = id_from_url(&found.url).ok_or_else(|| {
            CatalogError::InvalidInput(format!(
                "Could not determine the id of location area {}",
                found.name
            ))
        })?;
        let area: LocationArea = detail(fetcher, Resource::LocationArea, area_id, cancel).await?;

        Ok(LocationDetail {
            area_id: area.id,
            display_name: display_name(&area.name),
            encounters: area
                .pokemon_encounters
                .iter()
                .map(|e| ReferenceEntry::from(&e.pokemon))
                .collect(),
            name: area.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{UNKNOWN_COLOR, resolve_color};
    use crate::testing::{FakeFetcher, link, list_json, pokemon_json};
    use serde_json::json;
    use std::time::Duration;

    fn catalog(fetcher: FakeFetcher, concurrency: usize) -> Catalog<FakeFetcher> {
        Catalog::new(Arc::new(fetcher), concurrency)
    }

    fn refs(entries: &[(u32, &str)]) -> Vec<NamedAPIResource> {
        entries
            .iter()
            .map(|(id, name)| NamedAPIResource {
                name: name.to_string(),
                url: link("pokemon", *id),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_request_order() {
        let entries = [(1, "a"), (2, "b"), (3, "c"), (4, "d"), (5, "e")];
        let latencies = [50, 10, 30, 5, 40];
        let mut fetcher = FakeFetcher::new();
        for ((id, name), ms) in entries.iter().zip(latencies) {
            fetcher = fetcher.with_delay(
                &format!("pokemon/{}", id),
                pokemon_json(*id, name, &["water"]),
                Duration::from_millis(ms),
            );
        }
        let catalog = catalog(fetcher, 16);

        let batch = catalog
            .display_records(&refs(&entries), &CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<_> = batch.items.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
        assert!(batch.is_complete());
        assert_eq!(catalog.fetcher().max_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_failed_item_becomes_placeholder() {
        let fetcher = FakeFetcher::new()
            .with("pokemon/1", pokemon_json(1, "bulbasaur", &["grass", "poison"]))
            .failing("pokemon/4", Duration::ZERO)
            .with("pokemon/7", pokemon_json(7, "squirtle", &["water"]));
        let catalog = catalog(fetcher, 4);

        let batch = catalog
            .display_records(
                &refs(&[(1, "bulbasaur"), (4, "charmander"), (7, "squirtle")]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(batch.items.len(), 3);
        assert_eq!(batch.items[0].primary_color, resolve_color("grass"));
        assert_eq!(batch.items[1].primary_color, UNKNOWN_COLOR);
        assert!(batch.items[1].placeholder);
        assert_eq!(batch.items[1].id(), 4);
        assert_eq!(batch.items[1].name(), "charmander");
        assert_eq!(batch.items[2].primary_color, resolve_color("water"));
        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.warnings[0].starts_with("charmander"));
    }

    #[tokio::test]
    async fn test_filter_drops_warnings_of_removed_placeholders() {
        let fetcher = FakeFetcher::new()
            .with("pokemon/1", pokemon_json(1, "bulbasaur", &["grass", "poison"]))
            .failing("pokemon/4", Duration::ZERO);
        let catalog = catalog(fetcher, 4);
        let batch = catalog
            .display_records(
                &refs(&[(1, "bulbasaur"), (4, "charmander")]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(batch.warnings.len(), 1);

        let grass = batch.clone().filtered(Some("grass"), "");
        assert_eq!(grass.items.len(), 1);
        assert!(grass.warnings.is_empty());

        let searched = batch.filtered(None, "char");
        assert_eq!(searched.items.len(), 1);
        assert!(searched.items[0].placeholder);
        assert_eq!(searched.warnings.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_respects_concurrency_cap() {
        let entries: Vec<(u32, String)> = (1..=12).map(|i| (i, format!("p{}", i))).collect();
        let mut fetcher = FakeFetcher::new();
        for (id, name) in &entries {
            fetcher = fetcher.with_delay(
                &format!("pokemon/{}", id),
                pokemon_json(*id, name, &["bug"]),
                Duration::from_millis(10),
            );
        }
        let catalog = catalog(fetcher, 3);
        let borrowed: Vec<(u32, &str)> = entries.iter().map(|(i, n)| (*i, n.as_str())).collect();

        let batch = catalog
            .display_records(&refs(&borrowed), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(batch.items.len(), 12);
        assert_eq!(catalog.fetcher().max_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_list_failure_is_fatal() {
        let catalog = catalog(FakeFetcher::new().failing("pokemon?limit=151", Duration::ZERO), 4);
        let err = catalog
            .pokemon_list(151, SortOrder::Id, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Http { status: 500, .. }));
        assert_eq!(
            err.user_message("Pokémon list"),
            "Error loading Pokémon list: Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_pokemon_list_sorted() {
        let fetcher = FakeFetcher::new()
            .with("pokemon?limit=3", list_json("pokemon", &[(25, "pikachu"), (1, "bulbasaur"), (4, "charmander")]))
            .with("pokemon/25", pokemon_json(25, "pikachu", &["electric"]))
            .with("pokemon/1", pokemon_json(1, "bulbasaur", &["grass"]))
            .with("pokemon/4", pokemon_json(4, "charmander", &["fire"]));
        let catalog = catalog(fetcher, 4);
        let cancel = CancellationToken::new();

        let by_id = catalog.pokemon_list(3, SortOrder::Id, &cancel).await.unwrap();
        let ids: Vec<_> = by_id.items.iter().map(DisplayRecord::id).collect();
        assert_eq!(ids, [1, 4, 25]);

        let by_name = catalog.pokemon_list(3, SortOrder::Name, &cancel).await.unwrap();
        let names: Vec<_> = by_name.items.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["bulbasaur", "charmander", "pikachu"]);
    }

    #[tokio::test]
    async fn test_pokemon_by_type() {
        let fetcher = FakeFetcher::new()
            .with(
                "type/fire",
                json!({"id": 10, "name": "fire", "pokemon": [
                    {"slot": 1, "pokemon": {"name": "vulpix", "url": link("pokemon", 37)}},
                    {"slot": 1, "pokemon": {"name": "charmander", "url": link("pokemon", 4)}}
                ]}),
            )
            .with("pokemon/37", pokemon_json(37, "vulpix", &["fire"]))
            .with("pokemon/4", pokemon_json(4, "charmander", &["fire"]));
        let catalog = catalog(fetcher, 4);

        let batch = catalog
            .pokemon_by_type("Fire", &CancellationToken::new())
            .await
            .unwrap();
        let names: Vec<_> = batch.items.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["charmander", "vulpix"]);
    }

    #[tokio::test]
    async fn test_missing_id_issues_no_request() {
        let catalog = catalog(FakeFetcher::new(), 4);
        let cancel = CancellationToken::new();

        for id in [None, Some(0), Some(-3), Some(i64::from(u32::MAX) + 1)] {
            let err = catalog.pokemon_detail(id, &cancel).await.unwrap_err();
            assert!(matches!(err, CatalogError::InvalidInput(_)));
            assert_eq!(err.user_message("Pokémon details"), "Error: Invalid Pokémon ID.");
        }
        assert_eq!(catalog.fetcher().request_count(), 0);
    }

    #[test]
    fn test_parse_pokemon_id() {
        assert_eq!(parse_pokemon_id(Some("25")).unwrap(), 25);
        assert!(parse_pokemon_id(Some("pikachu")).is_err());
        assert!(parse_pokemon_id(None).is_err());
    }

    fn species_json(chain_id: Option<u32>) -> serde_json::Value {
        json!({
            "flavor_text_entries": [
                {"flavor_text": "Obviously prefers\nhot places.\u{c}When it rains,", "language": {"name": "en", "url": ""}}
            ],
            "genera": [{"genus": "Lizard Pokémon", "language": {"name": "en", "url": ""}}],
            "evolution_chain": chain_id.map(|id| json!({"url": link("evolution-chain", id)}))
        })
    }

    #[tokio::test]
    async fn test_pokemon_detail_assembles_everything() {
        let chain = json!({"id": 2, "chain": {
            "species": {"name": "charmander", "url": link("pokemon-species", 4)},
            "evolves_to": [{
                "species": {"name": "charmeleon", "url": link("pokemon-species", 5)},
                "evolves_to": []
            }]
        }});
        let fetcher = FakeFetcher::new()
            .with("pokemon/4", pokemon_json(4, "charmander", &["fire"]))
            .with("pokemon/5", pokemon_json(5, "charmeleon", &["fire"]))
            .with("pokemon-species/4", species_json(Some(2)))
            .with("evolution-chain/2", chain)
            .with(
                "pokemon/4/encounters",
                json!([{"location_area": {"name": "kanto-route-24-area", "url": ""}}]),
            );
        let catalog = catalog(fetcher, 4);

        let detail = catalog
            .pokemon_detail(Some(4), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(detail.record.name(), "charmander");
        assert_eq!(detail.genus, "Lizard Pokémon");
        assert_eq!(detail.description, "Obviously prefers hot places. When it rains,");
        assert_eq!(detail.moves, ["RAZOR WIND"]);
        assert_eq!(detail.evolution.len(), 1);
        assert_eq!(detail.evolution[0].children[0].name, "charmeleon");
        assert_eq!(
            detail.locations,
            [EncounterLocation {
                display_name: "KANTO ROUTE 24 AREA".into(),
                api_name: "kanto-route-24-area".into()
            }]
        );
        assert!(detail.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_pokemon_detail_soft_failures() {
        let fetcher = FakeFetcher::new()
            .with("pokemon/4", pokemon_json(4, "charmander", &["fire"]))
            .with("pokemon-species/4", species_json(Some(2)))
            .failing("evolution-chain/2", Duration::ZERO)
            .failing("pokemon/4/encounters", Duration::ZERO);
        let catalog = catalog(fetcher, 4);

        let detail = catalog
            .pokemon_detail(Some(4), &CancellationToken::new())
            .await
            .unwrap();
        assert!(detail.evolution.is_empty());
        assert_eq!(detail.warnings.len(), 1);
        assert_eq!(detail.locations, [EncounterLocation::none_found()]);
    }

    #[tokio::test]
    async fn test_pokemon_detail_species_failure_is_fatal() {
        let fetcher = FakeFetcher::new().with("pokemon/4", pokemon_json(4, "charmander", &["fire"]));
        let catalog = catalog(fetcher, 4);
        let err = catalog
            .pokemon_detail(Some(4), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message("Pokémon details"),
            "Error loading Pokémon details: Not Found"
        );
    }

    #[tokio::test]
    async fn test_evolution_without_chain_is_empty() {
        let fetcher = FakeFetcher::new().with("pokemon-species/132", species_json(None));
        let catalog = catalog(fetcher, 4);
        let roots = catalog
            .evolution(Some(132), &CancellationToken::new())
            .await
            .unwrap();
        assert!(roots.is_empty());
        assert_eq!(catalog.fetcher().requests(), ["pokemon-species/132"]);
    }

    #[tokio::test]
    async fn test_references_display_names() {
        let fetcher = FakeFetcher::new().with(
            "move?limit=2",
            list_json("move", &[(1, "pound"), (2, "karate-chop")]),
        );
        let catalog = catalog(fetcher, 4);
        let moves = catalog
            .references(Resource::Move, 2, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(moves[1].display_name, "KARATE CHOP");
        assert_eq!(moves[1].url, link("move", 2));
    }

    #[tokio::test]
    async fn test_natures_fan_out() {
        let fetcher = FakeFetcher::new()
            .with("nature?limit=100", list_json("nature", &[(1, "hardy"), (2, "bold")]))
            .with(
                "nature/1",
                json!({"id": 1, "name": "hardy", "increased_stat": null, "decreased_stat": null}),
            )
            .failing("nature/2", Duration::ZERO);
        let catalog = catalog(fetcher, 4);

        let batch = catalog.natures(100, &CancellationToken::new()).await.unwrap();
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].increased_stat, None);
        assert_eq!(batch.items[1].display_name, "BOLD");
        assert_eq!(batch.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_natures_report_stats() {
        let fetcher = FakeFetcher::new()
            .with("nature?limit=1", list_json("nature", &[(2, "bold")]))
            .with(
                "nature/2",
                json!({"id": 2, "name": "bold",
                    "increased_stat": {"name": "defense", "url": ""},
                    "decreased_stat": {"name": "special-attack", "url": ""}}),
            );
        let catalog = catalog(fetcher, 4);
        let batch = catalog.natures(1, &CancellationToken::new()).await.unwrap();
        assert_eq!(batch.items[0].increased_stat.as_deref(), Some("DEFENSE"));
        assert_eq!(batch.items[0].decreased_stat.as_deref(), Some("SPECIAL ATTACK"));
    }

    #[tokio::test]
    async fn test_location_detail_matches_area_suffix() {
        let fetcher = FakeFetcher::new()
            .with(
                "location-area?limit=1000",
                list_json("location-area", &[(1, "canalave-city-area"), (321, "viridian-forest-area")]),
            )
            .with(
                "location-area/321",
                json!({"id": 321, "name": "viridian-forest-area", "pokemon_encounters": [
                    {"pokemon": {"name": "caterpie", "url": link("pokemon", 10)}}
                ]}),
            );
        let catalog = catalog(fetcher, 4);

        let detail = catalog
            .location_detail("viridian-forest", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(detail.area_id, 321);
        assert_eq!(detail.display_name, "VIRIDIAN FOREST AREA");
        assert_eq!(detail.encounters[0].name, "caterpie");
    }

    #[tokio::test]
    async fn test_unknown_location() {
        let fetcher = FakeFetcher::new().with(
            "location-area?limit=1000",
            list_json("location-area", &[(1, "canalave-city-area")]),
        );
        let catalog = catalog(fetcher, 4);
        let err = catalog
            .location_detail("cerulean-cave", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_random_pokemon_in_range() {
        let fetcher = FakeFetcher::new().with("pokemon/1", pokemon_json(1, "bulbasaur", &["grass"]));
        let catalog = catalog(fetcher, 4);
        let record = catalog
            .random_pokemon(1, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(record.id(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_is_not_returned() {
        let fetcher = FakeFetcher::new()
            .with_delay("pokemon/1", pokemon_json(1, "a", &["normal"]), Duration::from_secs(5));
        let catalog = catalog(fetcher, 4);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = catalog
            .display_records(&refs(&[(1, "a")]), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled));
    }
}
