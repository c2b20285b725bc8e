use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

/// ResponseCache
///
/// Read-through cache of successful GET responses, keyed by path and query string.
/// Entries live for a fixed TTL and are never invalidated by writes, so a cached
/// listing can lag behind the store for up to one TTL.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedResponse>>,
}

#[derive(Clone)]
struct CachedResponse {
    stored_at: Instant,
    headers: HeaderMap,
    body: Bytes,
}

pub type CacheState = Arc<ResponseCache>;

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    async fn lookup(&self, key: &str) -> Option<Response> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }

        let mut response = Response::new(Body::from(entry.body.clone()));
        *response.headers_mut() = entry.headers.clone();
        Some(response)
    }

    async fn store(&self, key: String, headers: HeaderMap, body: Bytes) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            CachedResponse {
                stored_at: Instant::now(),
                headers,
                body,
            },
        );
    }
}

/// cache_responses
///
/// Middleware stage for read routes. Only `GET` requests answered with 200 are stored;
/// everything else passes straight through.
pub async fn cache_responses(
    State(cache): State<CacheState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET || !cache.is_enabled() {
        return next.run(request).await;
    }

    let key = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    if let Some(hit) = cache.lookup(&key).await {
        tracing::debug!(%key, "response cache hit");
        return hit;
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            cache.store(key, parts.headers.clone(), bytes.clone()).await;
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to buffer response for caching");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
