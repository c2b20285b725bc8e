use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;

use crate::error::ApiError;

pub const WINDOW: Duration = Duration::from_secs(60 * 60);

/// RateLimiter
///
/// Fixed-window request counter per client. A client's window opens on its first request
/// and its count resets once the window has elapsed.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    trust_proxy_headers: bool,
    clients: Mutex<HashMap<String, Window>>,
}

struct Window {
    opened_at: Instant,
    count: u32,
}

pub type RateLimitState = Arc<RateLimiter>;

impl RateLimiter {
    /// `limit` requests per `window`. A limit of zero disables limiting.
    ///
    /// With `trust_proxy_headers` off, clients are keyed by peer address only and
    /// `x-forwarded-for` / `x-real-ip` are ignored.
    pub fn new(limit: u32, window: Duration, trust_proxy_headers: bool) -> Self {
        Self {
            limit,
            window,
            trust_proxy_headers,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request for `client`; false once the client is over its limit.
    pub async fn allow(&self, client: &str) -> bool {
        if self.limit == 0 {
            return true;
        }

        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        if !clients.contains_key(client) {
            // Drop every window that has already run out before tracking a new client.
            clients.retain(|_, window| now.duration_since(window.opened_at) < self.window);
        }

        let window = clients.entry(client.to_string()).or_insert(Window {
            opened_at: now,
            count: 0,
        });

        if now.duration_since(window.opened_at) >= self.window {
            window.opened_at = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= self.limit
    }

    /// Identifies the caller: the peer address, or the proxy headers when they are trusted.
    pub fn client_key(&self, request: &Request) -> String {
        self.trust_proxy_headers
            .then(|| forwarded_client(request))
            .flatten()
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn forwarded_client(request: &Request) -> Option<String> {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|list| list.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .map(str::to_string)
}

/// limit_requests
///
/// Middleware stage that rejects a client with 429 once it exceeds its hourly budget.
pub async fn limit_requests(
    State(limiter): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = limiter.client_key(&request);
    if !limiter.allow(&client).await {
        tracing::warn!(%client, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn peer(addr: &str) -> ConnectInfo<SocketAddr> {
        ConnectInfo(addr.parse().unwrap())
    }

    #[tokio::test]
    async fn blocks_after_limit_per_client() {
        let limiter = RateLimiter::new(2, WINDOW, false);
        assert!(limiter.allow("a").await);
        assert!(limiter.allow("a").await);
        assert!(!limiter.allow("a").await);
        assert!(limiter.allow("b").await);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20), false);
        assert!(limiter.allow("a").await);
        assert!(!limiter.allow("a").await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.allow("a").await);
    }

    #[tokio::test]
    async fn zero_limit_never_blocks() {
        let limiter = RateLimiter::new(0, WINDOW, false);
        for _ in 0..10 {
            assert!(limiter.allow("a").await);
        }
    }

    #[tokio::test]
    async fn expired_windows_are_dropped_when_a_new_client_arrives() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20), false);
        for client in ["a", "b", "c"] {
            assert!(limiter.allow(client).await);
        }
        assert_eq!(limiter.clients.lock().await.len(), 3);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.allow("d").await);

        let clients = limiter.clients.lock().await;
        assert_eq!(clients.len(), 1);
        assert!(clients.contains_key("d"));
    }

    #[tokio::test]
    async fn live_windows_survive_pruning() {
        let limiter = RateLimiter::new(1, WINDOW, false);
        assert!(limiter.allow("a").await);
        assert!(limiter.allow("b").await);
        assert!(!limiter.allow("a").await);
        assert_eq!(limiter.clients.lock().await.len(), 2);
    }

    #[test]
    fn forwarded_header_wins_when_proxy_is_trusted() {
        let limiter = RateLimiter::new(1, WINDOW, true);
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", "10.0.0.1, 10.0.0.2")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(peer("192.168.1.9:4000"));
        assert_eq!(limiter.client_key(&request), "10.0.0.1");

        let real_ip = axum::http::Request::builder()
            .header("x-real-ip", "10.0.0.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(limiter.client_key(&real_ip), "10.0.0.7");
    }

    #[test]
    fn proxy_headers_are_ignored_unless_trusted() {
        let limiter = RateLimiter::new(1, WINDOW, false);
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(peer("192.168.1.9:4000"));
        assert_eq!(limiter.client_key(&request), "192.168.1.9");

        let anonymous = axum::http::Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(limiter.client_key(&anonymous), "unknown");
    }
}
