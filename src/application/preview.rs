//! Editorial preview state, threaded explicitly through every fetch.

use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque token selecting a content version (a draft release instead of the
/// published master).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewContext {
    content_ref: Option<ContentRef>,
}

impl PreviewContext {
    /// The published version of the content.
    pub fn published() -> Self {
        Self::default()
    }

    pub fn with_ref(content_ref: ContentRef) -> Self {
        Self {
            content_ref: Some(content_ref),
        }
    }

    /// Build from a raw cookie value; blank values mean "not previewing".
    pub fn from_cookie_value(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Self::with_ref(ContentRef::new(value)),
            None => Self::published(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.content_ref.is_some()
    }

    pub fn content_ref(&self) -> Option<&ContentRef> {
        self.content_ref.as_ref()
    }
}

/// Where to send the reader after leaving preview mode.
///
/// Relative targets are kept verbatim. Absolute URLs are reduced to their path
/// and query so the redirect never leaves this site.
pub fn exit_redirect_target(current_url: Option<&str>) -> String {
    let Some(raw) = current_url.map(str::trim).filter(|value| !value.is_empty()) else {
        return "/".to_string();
    };

    if raw.starts_with('/') && !raw.starts_with("//") && !raw.starts_with("/\\") {
        return raw.to_string();
    }

    match Url::parse(raw) {
        Ok(url) if url.has_host() => match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        },
        _ => "/".to_string(),
    }
}
