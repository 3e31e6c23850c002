//! Response cache middleware.
//!
//! Serves rendered GET pages from the store until they age out of the
//! revalidation window. Preview sessions and datastar requests always reach
//! the handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use super::{
    CacheConfig,
    store::{CachedResponse, ResponseStore},
};

const DATASTAR_REQUEST_HEADER: &str = "datastar-request";
const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
    pub preview_cookie: String,
}

impl CacheState {
    pub fn new(config: CacheConfig, preview_cookie: impl Into<String>) -> Self {
        let store = Arc::new(ResponseStore::new(&config));
        Self {
            config,
            store,
            preview_cookie: preview_cookie.into(),
        }
    }

    fn bypasses(&self, request: &Request<Body>) -> bool {
        !self.config.enabled
            || request.method() != Method::GET
            || request.headers().contains_key(DATASTAR_REQUEST_HEADER)
            || has_cookie(request, &self.preview_cookie)
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if cache.bypasses(&request) {
        return next.run(request).await;
    }

    let key = cache_key(&request);
    if let Some(cached) = cache.store.get(&key) {
        debug!(outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    debug!(outcome = "miss", "rendering response");
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer response body for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();
    cache.store.set(
        key,
        CachedResponse::new(parts.status.as_u16(), headers, bytes.clone()),
    );

    Response::from_parts(parts, Body::from(bytes))
}

fn cache_key(request: &Request<Body>) -> String {
    let uri = request.uri();
    match uri.query() {
        Some(query) => format!("{}?{query}", uri.path()),
        None => uri.path().to_string(),
    }
}

fn has_cookie(request: &Request<Body>, name: &str) -> bool {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key.trim() == name && !value.trim().is_empty())
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
