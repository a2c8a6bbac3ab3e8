pub mod aggregate;
pub mod cache;
pub mod client;
pub mod colors;
pub mod config;
pub mod display;
pub mod error;
pub mod evolution;
pub mod favorites;
pub mod pokemon;
pub mod view;

#[cfg(test)]
mod testing;

pub use aggregate::{Batch, Catalog, LocationDetail, NatureSummary, PokemonDetail};
pub use cache::{CacheStats, CacheTrait, InmemoryCache};
pub use client::{CatalogClient, Fetcher, Resource};
pub use colors::{Rgb, resolve_color};
pub use config::*;
pub use display::{DisplayRecord, FavoriteEntry, SortOrder};
pub use error::{CatalogError, ErrorKind};
pub use evolution::{EvolutionNode, EvolutionStage};
pub use favorites::FavoritesStore;
pub use view::{ViewScope, ViewState};
