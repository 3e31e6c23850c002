//! Paginated post listing and the load-more accumulator built on top of it.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::error::ContentError;
use crate::application::pagination::CursorPage;
use crate::application::preview::PreviewContext;
use crate::application::source::{ContentSource, DocumentOrdering, SearchQuery};
use crate::domain::posts::PostSummary;

pub type PaginatedListing = CursorPage<PostSummary>;

#[derive(Clone)]
pub struct ListingService {
    source: Arc<dyn ContentSource>,
    document_type: String,
}

impl ListingService {
    pub fn new(source: Arc<dyn ContentSource>, document_type: impl Into<String>) -> Self {
        Self {
            source,
            document_type: document_type.into(),
        }
    }

    /// Fetch one page of summaries, newest first.
    ///
    /// `cursor` must be a token previously returned by this service; it is
    /// handed to the source untouched. A resumed page keeps the page size the
    /// cursor was issued with, so `page_size` is only validated then. The
    /// preview ref, when active, still applies to the resumed page.
    #[instrument(skip(self, preview), fields(preview = preview.is_active()))]
    pub async fn fetch_listing(
        &self,
        cursor: Option<&str>,
        page_size: u32,
        preview: &PreviewContext,
    ) -> Result<PaginatedListing, ContentError> {
        if page_size == 0 {
            return Err(ContentError::validation("page size must be positive"));
        }

        let mut query = SearchQuery::new(&self.document_type, page_size)
            .ordered(DocumentOrdering::FirstPublicationDesc)
            .with_ref(preview.content_ref().cloned());
        if let Some(cursor) = cursor {
            query = query.resume(cursor);
        }

        let page = self.source.search(&query).await?;
        let items = page
            .items
            .into_iter()
            .map(|document| document.into_summary())
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            returned = items.len(),
            has_more = page.next_cursor.is_some(),
            "listing page fetched"
        );
        Ok(CursorPage::new(items, page.next_cursor))
    }
}

/// Summaries accumulated across successive load-more actions.
///
/// Appending goes through [`ListingFeed::load_more`] only, which takes
/// `&mut self`, so there is at most one load in flight per feed.
#[derive(Debug, Clone, Default)]
pub struct ListingFeed {
    items: Vec<PostSummary>,
    next_cursor: Option<String>,
    started: bool,
}

impl ListingFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the feed with an already fetched first page.
    pub fn from_page(page: PaginatedListing) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor,
            started: true,
        }
    }

    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    /// True until the source has reported the end of the listing.
    pub fn has_more(&self) -> bool {
        !self.started || self.next_cursor.is_some()
    }

    /// Fetch the next page and append it. Returns how many entries were added.
    ///
    /// On error the feed is left exactly as it was.
    pub async fn load_more(
        &mut self,
        listing: &ListingService,
        page_size: u32,
        preview: &PreviewContext,
    ) -> Result<usize, ContentError> {
        if !self.has_more() {
            return Ok(0);
        }

        let page = listing
            .fetch_listing(self.next_cursor.as_deref(), page_size, preview)
            .await?;

        let appended = page.items.len();
        self.items.extend(page.items);
        self.next_cursor = page.next_cursor;
        self.started = true;
        Ok(appended)
    }

    pub fn into_items(self) -> Vec<PostSummary> {
        self.items
    }
}
