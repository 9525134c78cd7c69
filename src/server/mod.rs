//! HTTP surface of the Amal server.

mod auth;
mod extract;
mod routes;

pub use auth::{auth_middleware, AuthError, Identity, IdentityProvider, JwtVerifier};

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::engine::{Reconciler, SnapshotReader, StatsAggregator, StreakCalculator, SyncEngine};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub identity: IdentityProvider,
    pub reconciler: Reconciler,
    pub sync: SyncEngine,
    pub snapshots: SnapshotReader,
    pub stats: StatsAggregator,
    pub streaks: StreakCalculator,
}

impl AppState {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            identity: IdentityProvider::new(store.clone(), config.jwt_secret.as_deref()),
            reconciler: Reconciler::new(store.pool().clone()),
            sync: SyncEngine::new(store.clone()),
            snapshots: SnapshotReader::new(store.clone()),
            stats: StatsAggregator::new(store.clone()),
            streaks: StreakCalculator::new(store.clone(), config.streak_window_days),
            store,
        }
    }
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = match frontend_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            tracing::warn!("Ignoring invalid frontend_url, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the full router: public health check, authenticated API, and a
/// JSON 404 for everything else.
pub fn router(state: AppState, frontend_url: Option<&str>) -> Router {
    let public_routes = Router::new().route("/api/health", get(routes::health));

    let protected_routes = routes::api_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(routes::not_found)
        .with_state(state)
        .layer(cors_layer(frontend_url))
        .layer(TraceLayer::new_for_http())
}
