use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use url::form_urlencoded;

use crate::application::error::{ErrorReport, HttpError};

pub const POSTS_FRAGMENT_PATH: &str = "/ui/posts";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

/// Shown on every page rendered from draft content.
#[derive(Clone)]
pub struct PreviewBannerView {
    pub exit_href: String,
}

impl PreviewBannerView {
    pub fn for_page(current_path: &str) -> Self {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("currentUrl", current_path)
            .finish();
        Self {
            exit_href: format!("/api/exit-preview?{query}"),
        }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub meta: PageMetaView,
    pub preview: Option<PreviewBannerView>,
}

impl LayoutChrome {
    pub fn new(site_title: &str) -> Self {
        Self {
            brand: BrandView {
                title: site_title.to_string(),
                href: "/".to_string(),
            },
            meta: PageMetaView {
                title: site_title.to_string(),
                description: String::new(),
            },
            preview: None,
        }
    }

    pub fn with_title(self, title: &str) -> Self {
        let title = format!("{title} | {}", self.brand.title);
        Self {
            meta: PageMetaView { title, ..self.meta },
            ..self
        }
    }

    pub fn with_description(self, description: &str) -> Self {
        Self {
            meta: PageMetaView {
                description: description.to_string(),
                ..self.meta
            },
            ..self
        }
    }

    pub fn with_preview(self, preview: Option<PreviewBannerView>) -> Self {
        Self { preview, ..self }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub meta: PageMetaView,
    pub preview: Option<PreviewBannerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            meta: chrome.meta,
            preview: chrome.preview,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub published: Option<String>,
    pub iso_date: Option<String>,
}

#[derive(Clone)]
pub struct FeedLoaderContext {
    pub has_results: bool,
    pub next_cursor: Option<String>,
}

impl FeedLoaderContext {
    pub fn new(has_results: bool, next_cursor: Option<String>) -> Self {
        Self {
            has_results,
            next_cursor,
        }
    }

    /// Fragment endpoint continuing the listing from the current cursor.
    pub fn load_more_href(&self) -> Option<String> {
        self.next_cursor.as_deref().map(|cursor| {
            let query: String = form_urlencoded::Serializer::new(String::new())
                .append_pair("cursor", cursor)
                .finish();
            format!("{POSTS_FRAGMENT_PATH}?{query}")
        })
    }
}

pub struct IndexContext {
    pub posts: Vec<PostCard>,
    pub has_results: bool,
    pub loader: FeedLoaderContext,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

#[derive(Template)]
#[template(path = "partials/posts.html")]
pub struct PostsPartial {
    pub view: LayoutContext<IndexContext>,
}

#[derive(Template)]
#[template(path = "partials/feed_loader.html")]
pub struct FeedLoaderTemplate {
    pub view: FeedLoaderContext,
}

#[derive(Template)]
#[template(path = "partials/post_cards.html")]
pub struct PostCardsAppendTemplate {
    pub posts: Vec<PostCard>,
}

pub struct SectionView {
    pub heading: String,
    pub body_html: String,
}

pub struct NavLinkView {
    pub href: String,
    pub title: String,
}

pub struct PostNavigationView {
    pub previous: Option<NavLinkView>,
    pub next: Option<NavLinkView>,
}

impl PostNavigationView {
    pub fn is_empty(&self) -> bool {
        self.previous.is_none() && self.next.is_none()
    }
}

pub struct BannerView {
    pub url: String,
    pub alt: String,
}

pub struct PostDetailContext {
    pub uid: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub banner: Option<BannerView>,
    pub published: Option<String>,
    pub iso_date: Option<String>,
    pub edited: Option<String>,
    pub reading_minutes: u32,
    pub sections: Vec<SectionView>,
    pub navigation: PostNavigationView,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Post Not Found".to_string(),
            message: "The post you requested does not exist or is no longer published."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
