use crate::{AppState, auth, handlers, rate_limit};
use axum::{Router, middleware, routing::delete};

/// Admin Router Module
///
/// Deletions. Only the Admin role passes the guard.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users/{id}", delete(handlers::users::delete_user))
        .route("/posts/{id}", delete(handlers::posts::delete_post))
        .route("/comments/{id}", delete(handlers::comments::delete_comment))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), auth::ADMIN),
            auth::require_role,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit::limit_requests,
        ))
}
