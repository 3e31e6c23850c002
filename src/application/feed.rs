use askama::Template;
use axum::response::Response;

use crate::application::error::{ContentError, HttpError};
use crate::application::listing::{ListingService, PaginatedListing};
use crate::application::post::{PostPage, PostService};
use crate::application::preview::PreviewContext;
use crate::application::stream::StreamBuilder;
use crate::domain::posts::{self, PostLink, PostSummary};
use crate::domain::rich_text;
use crate::presentation::views::{
    BannerView, FeedLoaderContext, FeedLoaderTemplate, IndexContext, LayoutChrome, NavLinkView,
    PostCard, PostCardsAppendTemplate, PostDetailContext, PostNavigationView, PreviewBannerView,
    SectionView, TemplateRenderError,
};

const EXCERPT_CHARS: usize = 160;

pub fn post_path(uid: &str) -> String {
    format!("/posts/{uid}")
}

/// Cards and cursor produced by one load-more request.
#[derive(Clone)]
pub struct AppendPayload {
    pub cards: Vec<PostCard>,
    pub next_cursor: Option<String>,
}

/// Builds page view models from the listing and post services.
#[derive(Clone)]
pub struct FeedService {
    listing: ListingService,
    posts: PostService,
    page_size: u32,
    site_title: String,
}

impl FeedService {
    pub fn new(
        listing: ListingService,
        posts: PostService,
        page_size: u32,
        site_title: impl Into<String>,
    ) -> Self {
        Self {
            listing,
            posts,
            page_size,
            site_title: site_title.into(),
        }
    }

    pub fn listing(&self) -> &ListingService {
        &self.listing
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Layout chrome for a page, with the preview banner when drafts are shown.
    pub fn chrome(&self, preview: &PreviewContext, current_path: &str) -> LayoutChrome {
        let banner = preview
            .is_active()
            .then(|| PreviewBannerView::for_page(current_path));
        LayoutChrome::new(&self.site_title).with_preview(banner)
    }

    pub async fn index_context(
        &self,
        cursor: Option<&str>,
        preview: &PreviewContext,
    ) -> Result<IndexContext, ContentError> {
        let page = self
            .listing
            .fetch_listing(cursor, self.page_size, preview)
            .await?;
        Ok(index_context_from_page(page))
    }

    pub async fn append_payload(
        &self,
        cursor: Option<&str>,
        preview: &PreviewContext,
    ) -> Result<AppendPayload, ContentError> {
        let page = self
            .listing
            .fetch_listing(cursor, self.page_size, preview)
            .await?;
        Ok(AppendPayload {
            cards: page.items.iter().map(summary_to_card).collect(),
            next_cursor: page.next_cursor,
        })
    }

    pub async fn post_context(
        &self,
        slug: &str,
        preview: &PreviewContext,
    ) -> Result<PostDetailContext, ContentError> {
        let page = self.posts.post_page(slug, preview).await?;
        Ok(post_page_to_context(page))
    }
}

pub fn index_context_from_page(page: PaginatedListing) -> IndexContext {
    let posts: Vec<PostCard> = page.items.iter().map(summary_to_card).collect();
    let has_results = !posts.is_empty();
    IndexContext {
        posts,
        has_results,
        loader: FeedLoaderContext::new(has_results, page.next_cursor),
    }
}

pub fn summary_to_card(summary: &PostSummary) -> PostCard {
    PostCard {
        href: post_path(&summary.uid),
        title: summary.data.title.clone(),
        subtitle: summary.data.subtitle.clone(),
        author: summary.data.author.clone(),
        published: summary.first_publication_date.map(posts::format_human_date),
        iso_date: summary.first_publication_date.and_then(iso_date),
    }
}

fn iso_date(value: time::OffsetDateTime) -> Option<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .ok()
}

fn nav_link(link: PostLink) -> NavLinkView {
    NavLinkView {
        href: post_path(&link.uid),
        title: link.title,
    }
}

pub fn post_page_to_context(page: PostPage) -> PostDetailContext {
    let PostPage {
        detail,
        navigation,
        reading_minutes,
    } = page;

    let edited = detail
        .was_edited()
        .then_some(detail.last_publication_date)
        .flatten()
        .map(posts::format_edited_label);
    let banner = (!detail.data.banner.url.is_empty()).then(|| BannerView {
        url: detail.data.banner.url.clone(),
        alt: detail
            .data
            .banner
            .alt
            .clone()
            .unwrap_or_else(|| detail.data.title.clone()),
    });
    let sections = detail
        .data
        .content
        .iter()
        .map(|section| SectionView {
            heading: section.heading.clone(),
            body_html: rich_text::as_html(&section.body),
        })
        .collect();

    let description = excerpt(
        detail
            .data
            .content
            .first()
            .map(|section| rich_text::as_text(&section.body))
            .unwrap_or_default(),
    );

    PostDetailContext {
        description,
        published: detail.first_publication_date.map(posts::format_human_date),
        iso_date: detail.first_publication_date.and_then(iso_date),
        edited,
        banner,
        reading_minutes,
        sections,
        navigation: PostNavigationView {
            previous: navigation.previous.map(nav_link),
            next: navigation.next.map(nav_link),
        },
        uid: detail.uid,
        title: detail.data.title,
        author: detail.data.author,
    }
}

/// First sentence-sized slice of the body, cut on a word boundary.
fn excerpt(text: String) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text;
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    match cut.rfind(char::is_whitespace) {
        Some(index) => format!("{}…", cut[..index].trim_end()),
        None => format!("{cut}…"),
    }
}

pub fn build_datastar_append_response(payload: AppendPayload) -> Result<Response, HttpError> {
    const SOURCE: &str = "application::feed::build_datastar_append_response";
    let AppendPayload { cards, next_cursor } = payload;

    let cards_html = if cards.is_empty() {
        None
    } else {
        Some(
            PostCardsAppendTemplate { posts: cards }
                .render()
                .map_err(|err| {
                    HttpError::from(TemplateRenderError::new(
                        SOURCE,
                        "Template rendering failed",
                        err,
                    ))
                })?,
        )
    };

    let loader_html = FeedLoaderTemplate {
        view: FeedLoaderContext::new(true, next_cursor),
    }
    .render()
    .map_err(|err| {
        HttpError::from(TemplateRenderError::new(
            SOURCE,
            "Template rendering failed",
            err,
        ))
    })?;

    let mut stream = StreamBuilder::new();
    if let Some(html) = cards_html {
        stream.append_cards(html);
    }
    stream.replace_loader(loader_html).finish_loading();

    Ok(stream.into_response())
}

/// A failed load-more keeps its status and loader but still clears the
/// in-flight flag, so the reader can retry the same cursor.
pub fn build_datastar_failure_response(err: HttpError) -> Response {
    let status = err.status();
    let mut stream = StreamBuilder::new();
    stream.finish_loading();
    let mut response = stream.into_response();
    *response.status_mut() = status;
    err.into_report().attach(&mut response);
    response
}
