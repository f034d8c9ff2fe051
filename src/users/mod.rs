use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod guards;
pub mod handlers;
pub mod repo;
pub mod service;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_user))
        .route("/getAllUsers", get(handlers::get_all_users))
        .route("/bulkCreate", post(handlers::bulk_create_users))
        .route("/findUsers", get(handlers::find_users))
        .route("/search", get(handlers::search_users))
        .merge(
            Router::new()
                .route(
                    "/:id",
                    get(handlers::get_user_by_id)
                        .put(handlers::update_user)
                        .delete(handlers::delete_user),
                )
                .route_layer(middleware::from_fn_with_state(state, guards::user_access)),
        )
}
