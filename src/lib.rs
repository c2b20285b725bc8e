use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    response::Redirect,
    routing::get,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod rate_limit;
pub mod repository;
pub mod token;
pub mod validation;

// Routing split by required role (public, Poster, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

use cache::{CacheState, ResponseCache};
use rate_limit::{RateLimitState, RateLimiter};
use token::TokenCodec;

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json` and browsable
/// through the Swagger UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::token::issue_token,
        handlers::users::list_users, handlers::users::search_users, handlers::users::get_user,
        handlers::users::create_user, handlers::users::update_user, handlers::users::delete_user,
        handlers::posts::list_posts, handlers::posts::search_posts, handlers::posts::get_post,
        handlers::posts::create_post, handlers::posts::update_post, handlers::posts::delete_post,
        handlers::comments::list_comments, handlers::comments::search_comments,
        handlers::comments::get_comment, handlers::comments::create_comment,
        handlers::comments::update_comment, handlers::comments::delete_comment,
    ),
    components(
        schemas(
            models::UserView, models::UserInput, models::LoginInput, models::TokenResponse,
            models::Post, models::PostInput, models::Comment, models::CommentInput,
            models::Message, models::Role, error::ErrorBody,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "blog-api", description = "Users, posts and comments with role-based access")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// Everything a request may need, shared by all handlers and middleware stages.
/// Built once at startup; cloning it is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence behind the `Repository` trait (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    pub tokens: TokenCodec,
    pub config: AppConfig,
    pub cache: CacheState,
    pub limiter: RateLimitState,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenCodec::new(&config.secret_key),
            cache: Arc::new(ResponseCache::new(config.cache_ttl)),
            limiter: Arc::new(RateLimiter::new(
                config.rate_limit_per_hour,
                rate_limit::WINDOW,
                config.trust_proxy_headers,
            )),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenCodec {
    fn from_ref(app_state: &AppState) -> TokenCodec {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the three role-scoped routers, the documentation routes and the
/// observability layers around them.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // Any origin, method and header; the API carries no cookies.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // 2. Request ID Header
    let x_request_id = HeaderName::from_static("x-request-id");

    // 3. Base Router Assembly
    // Docs, the root redirect and the health check, then the three role-scoped groups.
    // Each group brings its own rate limit, plus the role guard or the response cache.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(|| async { Redirect::temporary("/swagger-ui") }))
        .route("/health", get(|| async { "ok" }))
        .merge(public::public_routes(&state))
        .merge(authenticated::authenticated_routes(&state))
        .merge(admin::admin_routes(&state))
        .with_state(state);

    // 4. Global Middleware Stack
    // Outermost first: assign a request id, open the trace span, copy the id onto the response.
    // CORS wraps everything so preflight requests never reach the groups.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span for one request, tagged with its `x-request-id` so every log line it emits
/// can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
