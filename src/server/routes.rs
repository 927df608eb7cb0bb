//! HTTP handlers for statements and entity CRUD

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::actor::{self, NewActor};
use crate::object::NewObject;
use crate::query::{self, StatementFilter};
use crate::server::AppState;
use crate::statement::XapiStatement;
use crate::storage::{ActorUpdate, ObjectUpdate, VerbUpdate};
use crate::verb::NewVerb;
use crate::{ingest, Error};

/// HTTP-facing wrapper mapping core errors to status codes
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

fn is_unique_violation(e: &Error) -> bool {
    matches!(
        e,
        Error::Storage(rusqlite::Error::SqliteFailure(inner, _))
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if matches!(self.0, Error::NotFound { .. }) {
            StatusCode::NOT_FOUND
        } else if self.0.is_client_error() || is_unique_violation(&self.0) {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            tracing::error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ========== Statements ==========

#[derive(Deserialize)]
pub struct BulkRequest {
    pub statements: Vec<XapiStatement>,
}

pub async fn create_statement(
    State(state): State<Arc<AppState>>,
    Json(external): Json<XapiStatement>,
) -> ApiResult<(StatusCode, Json<XapiStatement>)> {
    let mut store = state.store.lock().await;
    let created = ingest::ingest_one(&mut store, external)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn bulk_create_statements(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkRequest>,
) -> ApiResult<(StatusCode, Json<Vec<XapiStatement>>)> {
    let mut store = state.store.lock().await;
    let created = ingest::ingest_bulk(&mut store, request.statements)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_statements(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<XapiStatement>>> {
    let store = state.store.lock().await;
    Ok(Json(query::list_statements(&store)?))
}

pub async fn filter_statements(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<StatementFilter>,
) -> ApiResult<Json<Vec<XapiStatement>>> {
    let store = state.store.lock().await;
    Ok(Json(query::filter_statements(&store, &filter)?))
}

// ========== Actors ==========

#[derive(Deserialize)]
pub struct CreateActorRequest {
    pub name: String,
    pub mbox: String,
    pub account_homepage: Option<String>,
    pub account_name: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateActorRequest {
    pub name: Option<String>,
    pub mbox: Option<String>,
    pub account_homepage: Option<String>,
    pub account_name: Option<String>,
}

pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateActorRequest>,
) -> ApiResult<(StatusCode, Json<crate::Actor>)> {
    if !actor::is_valid_mbox(&request.mbox) {
        return Err(Error::Validation(
            "mbox must be a mailto: email address".to_string(),
        )
        .into());
    }
    let new = NewActor {
        mbox: request.mbox,
        name: Some(request.name),
        object_type: None,
        account_homepage: request.account_homepage,
        account_name: request.account_name,
    };
    let store = state.store.lock().await;
    let created = store.insert_actor(&new)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_actors(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<crate::Actor>>> {
    let store = state.store.lock().await;
    Ok(Json(store.list_actors()?))
}

pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<crate::Actor>> {
    let store = state.store.lock().await;
    let found = store
        .get_actor(id)?
        .ok_or(Error::NotFound { entity: "Actor", id })?;
    Ok(Json(found))
}

pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateActorRequest>,
) -> ApiResult<Json<crate::Actor>> {
    if let Some(mbox) = request.mbox.as_deref() {
        if !actor::is_valid_mbox(mbox) {
            return Err(Error::Validation(
                "mbox must be a mailto: email address".to_string(),
            )
            .into());
        }
    }
    let update = ActorUpdate {
        name: request.name,
        mbox: request.mbox,
        account_homepage: request.account_homepage,
        account_name: request.account_name,
    };
    let store = state.store.lock().await;
    Ok(Json(store.update_actor(id, &update)?))
}

pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = state.store.lock().await;
    store.delete_actor(id)?;
    Ok(Json(json!({ "message": "Actor deleted successfully" })))
}

// ========== Verbs ==========

#[derive(Deserialize)]
pub struct CreateVerbRequest {
    pub name: String,
    pub iri: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateVerbRequest {
    pub name: Option<String>,
    pub iri: Option<String>,
}

pub async fn create_verb(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateVerbRequest>,
) -> ApiResult<(StatusCode, Json<crate::Verb>)> {
    let new = NewVerb {
        iri: request.iri,
        name: Some(request.name),
    };
    let store = state.store.lock().await;
    let created = store.insert_verb(&new)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_verbs(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<crate::Verb>>> {
    let store = state.store.lock().await;
    Ok(Json(store.list_verbs()?))
}

pub async fn get_verb(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<crate::Verb>> {
    let store = state.store.lock().await;
    let found = store
        .get_verb(id)?
        .ok_or(Error::NotFound { entity: "Verb", id })?;
    Ok(Json(found))
}

pub async fn update_verb(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateVerbRequest>,
) -> ApiResult<Json<crate::Verb>> {
    let update = VerbUpdate {
        name: request.name,
        iri: request.iri,
    };
    let store = state.store.lock().await;
    Ok(Json(store.update_verb(id, &update)?))
}

pub async fn delete_verb(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = state.store.lock().await;
    store.delete_verb(id)?;
    Ok(Json(json!({ "message": "Verb deleted successfully" })))
}

// ========== Learning Objects ==========

#[derive(Deserialize)]
pub struct CreateObjectRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub iri: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateObjectRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub iri: Option<String>,
    pub description: Option<String>,
}

pub async fn create_object(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateObjectRequest>,
) -> ApiResult<(StatusCode, Json<crate::LearningObject>)> {
    let new = NewObject {
        iri: request.iri,
        name: Some(request.name),
        activity_type: Some(request.activity_type),
        description: request.description,
    };
    let store = state.store.lock().await;
    let created = store.insert_object(&new)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_objects(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<crate::LearningObject>>> {
    let store = state.store.lock().await;
    Ok(Json(store.list_objects()?))
}

pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<crate::LearningObject>> {
    let store = state.store.lock().await;
    let found = store
        .get_object(id)?
        .ok_or(Error::NotFound { entity: "LearningObject", id })?;
    Ok(Json(found))
}

pub async fn update_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateObjectRequest>,
) -> ApiResult<Json<crate::LearningObject>> {
    let update = ObjectUpdate {
        name: request.name,
        activity_type: request.activity_type,
        iri: request.iri,
        description: request.description,
    };
    let store = state.store.lock().await;
    Ok(Json(store.update_object(id, &update)?))
}

pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let store = state.store.lock().await;
    store.delete_object(id)?;
    Ok(Json(json!({ "message": "Object deleted successfully" })))
}

// ========== Stats ==========

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let store = state.store.lock().await;
    let stats = store.stats()?;
    Ok(Json(serde_json::to_value(&stats).map_err(Error::from)?))
}
