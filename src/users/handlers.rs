use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{
    BulkCreateRequest, BulkReport, CreateUserRequest, FindUsersQuery, SearchQuery,
    UpdateUserRequest,
};
use crate::users::repo::User;
use crate::users::service;

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<String>, ApiError> {
    service::create_user(&state.db, payload).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_all_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    service::get_all_users(&state.db).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    service::get_user_by_id(&state.db, id).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<String>, ApiError> {
    service::update_user(&state.db, id, payload).await.map(Json)
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<String>, ApiError> {
    service::delete_user(&state.db, id).await.map(Json)
}

#[instrument(skip(state))]
pub async fn find_users(
    State(state): State<AppState>,
    Query(query): Query<FindUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    service::find_users(&state.db, query).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn bulk_create_users(
    State(state): State<AppState>,
    Json(payload): Json<BulkCreateRequest>,
) -> Result<Json<BulkReport>, ApiError> {
    service::bulk_create_users(&state.db, payload.users)
        .await
        .map(Json)
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    service::search_users(&state.db, query).await.map(Json)
}
