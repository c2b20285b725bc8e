use crate::{AppState, auth, handlers, rate_limit};
use axum::{
    Router,
    middleware,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Create and replace operations. The `require_role` stage resolves the bearer token
/// and checks for the Poster role before the body is even read, so a request without
/// a valid token gets 401 regardless of what it carries.
pub fn authenticated_routes(state: &AppState) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/users/{id}", put(handlers::users::update_user))
        .route("/posts", post(handlers::posts::create_post))
        .route("/posts/{id}", put(handlers::posts::update_post))
        .route("/comments", post(handlers::comments::create_comment))
        .route("/comments/{id}", put(handlers::comments::update_comment))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), auth::POSTER),
            auth::require_role,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit::limit_requests,
        ))
}
