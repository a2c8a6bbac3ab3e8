use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pokedex_catalog::{
    Batch, CacheStats, Catalog, CatalogClient, CatalogError, Config, DisplayRecord, ErrorKind,
    EvolutionNode, FavoritesStore, LocationDetail, NatureSummary, PokemonDetail, Resource,
    SortOrder,
    aggregate::validate_pokemon_id,
    cache::run_cleanup_task,
    display::ReferenceEntry,
    evolution::flatten,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REFERENCE_LIMIT: u32 = 50;
const NATURE_LIMIT: u32 = 100;
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

struct AppState {
    catalog: Catalog<CatalogClient>,
    favorites: FavoritesStore,
    config: Config,
}

/// A pipeline failure plus the name of what was being loaded.
struct AppError {
    context: &'static str,
    error: CatalogError,
}

impl AppError {
    fn new(context: &'static str) -> impl FnOnce(CatalogError) -> Self {
        move |error| Self { context, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match (&self.error, self.error.kind()) {
            (CatalogError::Timeout, _) => StatusCode::GATEWAY_TIMEOUT,
            (_, ErrorKind::InvalidInput) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        tracing::error!("Failed to load {}: {}", self.context, self.error);
        let body = json!({ "error": self.error.user_message(self.context) });
        (status, Json(body)).into_response()
    }
}

type AppResult<T> = Result<Json<T>, AppError>;

// Dropping the handler future (client went away) cancels its upstream requests.
fn request_scope() -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

fn load_config() -> Result<Config, CatalogError> {
    Config::load().map_err(|e| {
        tracing::error!("Failed to parse configuration: {}", e);
        e
    })
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // axum logs rejections from built-in extractors with the `axum::rejection`
        // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
        format!(
            "{}=debug,tower_http=debug,axum::rejection=trace",
            env!("CARGO_CRATE_NAME")
        )
        .into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let client = match CatalogClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build catalog client: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(cache) = client.cache() {
        let every = config.cache.expiration().max(MIN_CLEANUP_INTERVAL);
        tokio::spawn(run_cleanup_task(Arc::clone(cache), every));
    }

    let bind = config.server.bind.clone();
    let app_state = Arc::new(AppState {
        catalog: Catalog::new(Arc::new(client), config.api.concurrency()),
        favorites: FavoritesStore::new(),
        config,
    });

    let app = Router::new()
        .route("/pokemon", get(list_pokemon_handler))
        .route("/pokemon/{id}", get(pokemon_detail_handler))
        .route("/pokemon/{id}/evolution", get(evolution_handler))
        .route("/types/{name}/pokemon", get(type_pokemon_handler))
        .route("/moves", get(moves_handler))
        .route("/abilities", get(abilities_handler))
        .route("/items", get(items_handler))
        .route("/natures", get(natures_handler))
        .route("/locations/{name}", get(location_handler))
        .route("/random", get(random_pokemon_handler))
        .route("/favorites", get(list_favorites_handler))
        .route(
            "/favorites/{id}",
            post(toggle_favorite_handler).delete(remove_favorite_handler),
        )
        .route("/cache/stats", get(cache_stats_handler))
        .with_state(app_state);

    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", bind, e);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {}", addr),
        Err(_) => tracing::info!("listening on {}", bind),
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    #[serde(default)]
    sort: SortOrder,
    #[serde(rename = "type")]
    type_filter: Option<String>,
    #[serde(default)]
    search: String,
}

#[derive(Debug, Deserialize)]
struct EvolutionQuery {
    #[serde(default)]
    flat: bool,
}

fn path_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

#[debug_handler]
async fn list_pokemon_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Batch<DisplayRecord>> {
    let (cancel, _guard) = request_scope();
    let limit = query.limit.unwrap_or(app_state.config.server.list_limit);

    let batch = app_state
        .catalog
        .pokemon_list(limit, query.sort, &cancel)
        .await
        .map_err(AppError::new("Pokémon list"))?;
    Ok(Json(batch.filtered(query.type_filter.as_deref(), &query.search)))
}

#[debug_handler]
async fn pokemon_detail_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<PokemonDetail> {
    let (cancel, _guard) = request_scope();
    let detail = app_state
        .catalog
        .pokemon_detail(path_id(&id), &cancel)
        .await
        .map_err(AppError::new("Pokémon details"))?;
    Ok(Json(detail))
}

#[debug_handler]
async fn evolution_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<EvolutionQuery>,
) -> Result<Response, AppError> {
    let (cancel, _guard) = request_scope();
    let roots: Vec<EvolutionNode> = app_state
        .catalog
        .evolution(path_id(&id), &cancel)
        .await
        .map_err(AppError::new("evolution chain"))?;

    Ok(if query.flat {
        Json(flatten(&roots)).into_response()
    } else {
        Json(roots).into_response()
    })
}

#[debug_handler]
async fn type_pokemon_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Batch<DisplayRecord>> {
    let (cancel, _guard) = request_scope();
    let batch = app_state
        .catalog
        .pokemon_by_type(&name, &cancel)
        .await
        .map_err(AppError::new("Pokémon of this type"))?;
    Ok(Json(batch))
}

async fn references(
    app_state: &AppState,
    resource: Resource,
    context: &'static str,
) -> AppResult<Vec<ReferenceEntry>> {
    let (cancel, _guard) = request_scope();
    let entries = app_state
        .catalog
        .references(resource, REFERENCE_LIMIT, &cancel)
        .await
        .map_err(AppError::new(context))?;
    Ok(Json(entries))
}

#[debug_handler]
async fn moves_handler(State(app_state): State<Arc<AppState>>) -> AppResult<Vec<ReferenceEntry>> {
    references(&app_state, Resource::Move, "moves").await
}

#[debug_handler]
async fn abilities_handler(
    State(app_state): State<Arc<AppState>>,
) -> AppResult<Vec<ReferenceEntry>> {
    references(&app_state, Resource::Ability, "abilities").await
}

#[debug_handler]
async fn items_handler(State(app_state): State<Arc<AppState>>) -> AppResult<Vec<ReferenceEntry>> {
    references(&app_state, Resource::Item, "items").await
}

#[debug_handler]
async fn natures_handler(
    State(app_state): State<Arc<AppState>>,
) -> AppResult<Batch<NatureSummary>> {
    let (cancel, _guard) = request_scope();
    let batch = app_state
        .catalog
        .natures(NATURE_LIMIT, &cancel)
        .await
        .map_err(AppError::new("natures"))?;
    Ok(Json(batch))
}

#[debug_handler]
async fn location_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<LocationDetail> {
    let (cancel, _guard) = request_scope();
    let detail = app_state
        .catalog
        .location_detail(&name, &cancel)
        .await
        .map_err(AppError::new("location details"))?;
    Ok(Json(detail))
}

#[debug_handler]
async fn random_pokemon_handler(
    State(app_state): State<Arc<AppState>>,
) -> AppResult<DisplayRecord> {
    let (cancel, _guard) = request_scope();
    let record = app_state
        .catalog
        .random_pokemon(app_state.config.server.list_limit, &cancel)
        .await
        .map_err(AppError::new("recommended Pokémon"))?;
    Ok(Json(record))
}

#[debug_handler]
async fn list_favorites_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<DisplayRecord>> {
    Json(app_state.favorites.entries())
}

#[debug_handler]
async fn toggle_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (cancel, _guard) = request_scope();
    let id = validate_pokemon_id(path_id(&id))
        .map_err(AppError::new("favorites"))?;

    // Unliking works on the stored record alone.
    if app_state.favorites.remove(id).is_some() {
        tracing::info!("Pokémon #{} favorite: false", id);
        return Ok(Json(json!({ "id": id, "favorite": false })));
    }

    let record = app_state
        .catalog
        .pokemon(id, &cancel)
        .await
        .map_err(AppError::new("favorites"))?;

    let favorite = app_state.favorites.toggle(record);
    tracing::info!("Pokémon #{} favorite: {}", id, favorite);
    Ok(Json(json!({ "id": id, "favorite": favorite })))
}

#[debug_handler]
async fn remove_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = validate_pokemon_id(path_id(&id))
        .map_err(AppError::new("favorites"))?;
    if app_state.favorites.remove(id).is_none() {
        tracing::debug!("Pokémon #{} was not a favorite", id);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn cache_stats_handler(State(app_state): State<Arc<AppState>>) -> Json<Option<CacheStats>> {
    Json(app_state.catalog.fetcher().cache_stats())
}
