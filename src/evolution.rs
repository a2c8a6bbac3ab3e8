//! Evolution chain resolution.
//!
//! A chain is resolved into a tree of [`EvolutionNode`]s. Branches such as
//! Eevee's are kept as siblings; [`flatten`] produces the pre-order list for
//! callers that render a single row.

use crate::client::{Fetcher, Resource, detail, fetch_url, id_from_url};
use crate::display::resolve_image;
use crate::error::CatalogError;
use crate::pokemon::{ChainLink, EvolutionChain, Pokemon};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionNode {
    pub species_id: u32,
    pub name: String,
    pub image_url: Option<String>,
    pub children: Vec<EvolutionNode>,
}

/// One row of a flattened chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionStage {
    pub species_id: u32,
    pub name: String,
    pub image_url: Option<String>,
    pub depth: usize,
}

impl EvolutionNode {
    pub fn flatten(&self) -> Vec<EvolutionStage> {
        let mut out = Vec::new();
        self.push_preorder(0, &mut out);
        out
    }

    fn push_preorder(&self, depth: usize, out: &mut Vec<EvolutionStage>) {
        out.push(EvolutionStage {
            species_id: self.species_id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            depth,
        });
        for child in &self.children {
            child.push_preorder(depth + 1, out);
        }
    }

    pub fn stage_count(&self) -> usize {
        1 + self.children.iter().map(EvolutionNode::stage_count).sum::<usize>()
    }
}

/// Pre-order traversal of every root in turn.
pub fn flatten(roots: &[EvolutionNode]) -> Vec<EvolutionStage> {
    roots.iter().flat_map(EvolutionNode::flatten).collect()
}

/// Fetches the chain at `chain_url` and resolves every stage's image.
pub async fn resolve_chain<F>(
    fetcher: &F,
    chain_url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<EvolutionNode>, CatalogError>
where
    F: Fetcher + ?Sized,
{
    let chain: EvolutionChain = fetch_url(fetcher, chain_url, cancel).await?;
    let roots = resolve_link(fetcher, &chain.chain, cancel).await?;
    tracing::debug!(
        "Resolved evolution chain {} into {} stages",
        chain.id,
        roots.iter().map(EvolutionNode::stage_count).sum::<usize>()
    );
    Ok(roots)
}

// Children are awaited one after another, depth first. A stage without a
// numeric species id is dropped and its children are lifted to its parent.
fn resolve_link<'a, F>(
    fetcher: &'a F,
    link: &'a ChainLink,
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, Result<Vec<EvolutionNode>, CatalogError>>
where
    F: Fetcher + ?Sized,
{
    async move {
        let node = match id_from_url(&link.species.url) {
            Some(species_id) => Some(EvolutionNode {
                species_id,
                name: link.species.name.clone(),
                image_url: stage_image(fetcher, species_id, &link.species.name, cancel).await?,
                children: Vec::new(),
            }),
            None => {
                tracing::warn!(
                    "Evolution stage {} has no species id in {:?}",
                    link.species.name,
                    link.species.url
                );
                None
            }
        };

        let mut children = Vec::new();
        for next in &link.evolves_to {
            children.extend(resolve_link(fetcher, next, cancel).await?);
        }

        Ok(match node {
            Some(mut node) => {
                node.children = children;
                vec![node]
            }
            None => children,
        })
    }
    .boxed()
}

async fn stage_image<F>(
    fetcher: &F,
    species_id: u32,
    name: &str,
    cancel: &CancellationToken,
) -> Result<Option<String>, CatalogError>
where
    F: Fetcher + ?Sized,
{
    match detail::<Pokemon, _>(fetcher, Resource::Pokemon, species_id, cancel).await {
        Ok(pokemon) => Ok(resolve_image(&pokemon.sprites)),
        Err(CatalogError::Cancelled) => Err(CatalogError::Cancelled),
        Err(e) => {
            tracing::warn!("Error fetching image for {}: {}", name, e);
            Ok(None)
        }
    }
}
