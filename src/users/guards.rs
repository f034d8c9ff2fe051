//! Guard chain in front of the per-id routes. Checks run in order and the
//! first rejection short-circuits: numeric id (400), active user exists
//! (404), valid bearer token (401), caller owns the target id (403).

use axum::{
    extract::{FromRef, Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::auth::jwt::{claims_from_headers, JwtKeys};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::User;

pub async fn user_access(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    req: Request,
    next: Next,
) -> Response {
    let id = match raw_id.parse::<i64>() {
        Ok(id) => id,
        Err(_) => return ApiError::validation("Id must be a number").into_response(),
    };

    match User::find_active(&state.db, id).await {
        Ok(Some(_)) => {}
        Ok(None) => return ApiError::not_found("User not found").into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    }

    let keys = JwtKeys::from_ref(&state);
    let claims = match claims_from_headers(req.headers(), &keys) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    if claims.sub != id {
        warn!(caller = %claims.sub, target = %id, "permission denied");
        return ApiError::forbidden("You do not have permission over this user").into_response();
    }

    next.run(req).await
}
