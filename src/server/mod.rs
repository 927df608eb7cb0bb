//! HTTP API - axum server exposing statement ingestion/query and entity CRUD
//!
//! Everything under /api sits behind the auth-token gate; /stats is open.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storage::SqliteStore;

pub mod auth;
pub mod routes;

/// Server state. The store is behind a mutex; each request takes it for the
/// duration of one storage call.
pub struct AppState {
    pub store: Mutex<SqliteStore>,
}

/// Build the full application router around an already-open store
pub fn build_router(store: SqliteStore) -> Router {
    let state = Arc::new(AppState {
        store: Mutex::new(store),
    });

    let api = Router::new()
        .route(
            "/statements",
            post(routes::create_statement).get(routes::list_statements),
        )
        .route("/statements/bulk", post(routes::bulk_create_statements))
        .route("/statements/filter", get(routes::filter_statements))
        .route("/actors", post(routes::create_actor).get(routes::list_actors))
        .route(
            "/actors/{id}",
            get(routes::get_actor)
                .put(routes::update_actor)
                .delete(routes::delete_actor),
        )
        .route("/verbs", post(routes::create_verb).get(routes::list_verbs))
        .route(
            "/verbs/{id}",
            get(routes::get_verb)
                .put(routes::update_verb)
                .delete(routes::delete_verb),
        )
        .route(
            "/objects",
            post(routes::create_object).get(routes::list_objects),
        )
        .route(
            "/objects/{id}",
            get(routes::get_object)
                .put(routes::update_object)
                .delete(routes::delete_object),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    Router::new()
        .route("/stats", get(routes::get_stats))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, database_path: PathBuf) -> anyhow::Result<()> {
    let store = SqliteStore::open(&database_path)?;
    let app = build_router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("openlrs listening at http://{} (db: {:?})", addr, database_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
