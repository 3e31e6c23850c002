//! Leaving editorial preview mode.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::application::preview::exit_redirect_target;

use super::HttpState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ExitPreviewQuery {
    #[serde(rename = "currentUrl")]
    current_url: Option<String>,
}

/// Clear the preview cookie and send the reader back where they were.
pub(super) async fn exit_preview(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<ExitPreviewQuery>,
) -> Response {
    let target = exit_redirect_target(query.current_url.as_deref());
    debug!(target_path = %target, "leaving preview mode");

    // Emitted even when the request carried no preview cookie.
    let expired = Cookie::build((state.preview_cookie.clone(), ""))
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH);
    let jar = jar.add(expired);
    (jar, Redirect::temporary(&target)).into_response()
}
