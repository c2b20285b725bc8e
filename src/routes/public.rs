use crate::{AppState, cache, handlers, rate_limit};
use axum::{
    Router,
    middleware,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Every route counts against the caller's hourly
/// budget, and successful `GET` responses are served through the response cache.
pub fn public_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // POST /token
        // Exchanges a username and password for a bearer token.
        .route("/token", post(handlers::token::issue_token))
        // GET /users (paginated), POST /users (registration)
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        // GET /users/username?search=...
        .route("/users/username", get(handlers::users::search_users))
        .route("/users/{id}", get(handlers::users::get_user))
        .route("/posts", get(handlers::posts::list_posts))
        // GET /posts/by_user_id?search=...
        // Substring match on the decimal form of user_id.
        .route("/posts/by_user_id", get(handlers::posts::search_posts))
        .route("/posts/{id}", get(handlers::posts::get_post))
        .route("/comments", get(handlers::comments::list_comments))
        .route("/comments/username", get(handlers::comments::search_comments))
        .route("/comments/{id}", get(handlers::comments::get_comment))
        .route_layer(middleware::from_fn_with_state(
            state.cache.clone(),
            cache::cache_responses,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit::limit_requests,
        ))
}
