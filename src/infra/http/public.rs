use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header::CACHE_CONTROL},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    application::{
        error::{ContentError, HttpError},
        feed::{self, FeedService},
        preview::PreviewContext,
    },
    cache::{CacheState, response_cache_layer},
    presentation::views::{
        IndexTemplate, LayoutChrome, LayoutContext, PostTemplate, PostsPartial,
        render_not_found_response, render_template_response,
    },
};

use super::{
    DATASTAR_REQUEST_HEADER,
    middleware::{log_responses, set_request_context},
    preview::exit_preview,
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub preview_cookie: String,
    pub cache_control: String,
    pub cache: Option<CacheState>,
}

impl HttpState {
    fn preview(&self, jar: &CookieJar) -> PreviewContext {
        PreviewContext::from_cookie_value(jar.get(&self.preview_cookie).map(|cookie| cookie.value()))
    }

    /// Published pages may be served stale for one revalidation window; drafts never.
    fn apply_cache_headers(&self, response: &mut Response, preview: &PreviewContext) {
        let value = if preview.is_active() {
            Some(HeaderValue::from_static("no-store"))
        } else if response.status() == StatusCode::OK {
            HeaderValue::from_str(&self.cache_control).ok()
        } else {
            None
        };
        if let Some(value) = value {
            response.headers_mut().insert(CACHE_CONTROL, value);
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    // The cache layer skips datastar and preview requests on its own.
    let cached_routes = Router::new()
        .route("/", get(index))
        .route("/posts/{slug}", get(post_detail))
        .route("/ui/posts", get(posts_partial));

    let cached_routes = match state.cache.clone() {
        Some(cache_state) => cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        )),
        None => cached_routes,
    };

    let uncached_routes = Router::new()
        .route("/api/exit-preview", get(exit_preview))
        .route("/_health", get(health));

    cached_routes
        .merge(uncached_routes)
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorQuery {
    cursor: Option<String>,
}

fn current_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

fn content_error_response(err: ContentError, chrome: LayoutChrome) -> Response {
    if err.is_not_found() {
        return render_not_found_response(chrome);
    }
    HttpError::from(err).into_response()
}

async fn index(
    State(state): State<HttpState>,
    jar: CookieJar,
    uri: Uri,
    Query(query): Query<CursorQuery>,
) -> Response {
    let preview = state.preview(&jar);
    let chrome = state.feed.chrome(&preview, &current_path(&uri));

    let mut response = match state
        .feed
        .index_context(query.cursor.as_deref(), &preview)
        .await
    {
        Ok(content) => {
            let view = LayoutContext::new(chrome, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => content_error_response(err, chrome),
    };
    state.apply_cache_headers(&mut response, &preview);
    response
}

async fn posts_partial(
    State(state): State<HttpState>,
    headers: HeaderMap,
    jar: CookieJar,
    uri: Uri,
    Query(query): Query<CursorQuery>,
) -> Result<Response, HttpError> {
    let preview = state.preview(&jar);
    let cursor = query.cursor.as_deref();

    if headers.contains_key(DATASTAR_REQUEST_HEADER) {
        let response = match state.feed.append_payload(cursor, &preview).await {
            Ok(payload) => feed::build_datastar_append_response(payload),
            Err(err) => Err(HttpError::from(err)),
        };
        return Ok(response.unwrap_or_else(feed::build_datastar_failure_response));
    }

    let content = state.feed.index_context(cursor, &preview).await?;
    let chrome = state.feed.chrome(&preview, &current_path(&uri));
    let mut response = render_template_response(
        PostsPartial {
            view: LayoutContext::new(chrome, content),
        },
        StatusCode::OK,
    );
    state.apply_cache_headers(&mut response, &preview);
    Ok(response)
}

async fn post_detail(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(slug): Path<String>,
) -> Response {
    let preview = state.preview(&jar);
    let chrome = state.feed.chrome(&preview, &feed::post_path(&slug));

    let mut response = match state.feed.post_context(&slug, &preview).await {
        Ok(content) => {
            let chrome = chrome
                .with_title(&content.title)
                .with_description(&content.description);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(err) => content_error_response(err, chrome),
    };
    state.apply_cache_headers(&mut response, &preview);
    response
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback(State(state): State<HttpState>, jar: CookieJar, uri: Uri) -> Response {
    let preview = state.preview(&jar);
    render_not_found_response(state.feed.chrome(&preview, &current_path(&uri)))
}
