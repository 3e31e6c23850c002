//! Post lookup by slug and resolution of its chronological neighbours.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::application::error::ContentError;
use crate::application::preview::PreviewContext;
use crate::application::source::{ContentSource, Document, DocumentOrdering, SearchQuery};
use crate::domain::posts::{NavigationContext, PostDetail, PostLink};
use crate::domain::reading_time::estimate_reading_minutes;

/// Everything a post page needs.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub detail: PostDetail,
    pub navigation: NavigationContext,
    pub reading_minutes: u32,
}

#[derive(Clone)]
pub struct PostService {
    source: Arc<dyn ContentSource>,
    document_type: String,
}

impl PostService {
    pub fn new(source: Arc<dyn ContentSource>, document_type: impl Into<String>) -> Self {
        Self {
            source,
            document_type: document_type.into(),
        }
    }

    #[instrument(skip(self, preview), fields(preview = preview.is_active()))]
    pub async fn fetch_post(
        &self,
        slug: &str,
        preview: &PreviewContext,
    ) -> Result<PostDetail, ContentError> {
        if slug.trim().is_empty() {
            return Err(ContentError::validation("slug must not be empty"));
        }

        let document = self
            .source
            .get_by_uid(&self.document_type, slug, preview.content_ref())
            .await?
            .ok_or_else(|| ContentError::not_found(slug))?;
        let detail = document.into_detail()?;

        let duplicates = detail.duplicate_headings();
        if !duplicates.is_empty() {
            warn!(
                uid = %detail.uid,
                headings = ?duplicates,
                "post has repeated section headings"
            );
        }

        Ok(detail)
    }

    /// Resolve the posts published immediately before and after `post`.
    ///
    /// Both lookups are anchored on the internal document id and run
    /// concurrently; either side may legitimately be absent.
    #[instrument(skip(self, post, preview), fields(uid = %post.uid))]
    pub async fn fetch_navigation(
        &self,
        post: &PostDetail,
        preview: &PreviewContext,
    ) -> Result<NavigationContext, ContentError> {
        let content_ref = preview.content_ref().cloned();
        let older = SearchQuery::new(&self.document_type, 1)
            .ordered(DocumentOrdering::FirstPublicationDesc)
            .after(&post.id)
            .with_ref(content_ref.clone());
        let newer = SearchQuery::new(&self.document_type, 1)
            .ordered(DocumentOrdering::FirstPublicationAsc)
            .after(&post.id)
            .with_ref(content_ref);

        let (older, newer) = tokio::try_join!(self.source.search(&older), self.source.search(&newer))?;

        Ok(NavigationContext {
            previous: first_link(older.items)?,
            next: first_link(newer.items)?,
        })
    }

    /// Post, navigation and reading time for one page render.
    pub async fn post_page(
        &self,
        slug: &str,
        preview: &PreviewContext,
    ) -> Result<PostPage, ContentError> {
        let detail = self.fetch_post(slug, preview).await?;
        let navigation = self.fetch_navigation(&detail, preview).await?;
        let reading_minutes = estimate_reading_minutes(&detail.data.content);
        Ok(PostPage {
            detail,
            navigation,
            reading_minutes,
        })
    }
}

fn first_link(documents: Vec<Document>) -> Result<Option<PostLink>, ContentError> {
    documents
        .into_iter()
        .next()
        .map(Document::into_link)
        .transpose()
        .map_err(ContentError::from)
}
