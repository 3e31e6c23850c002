//! Port describing the headless content API this site reads from.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::CursorPage;
use crate::application::preview::ContentRef;
use crate::domain::error::DomainError;
use crate::domain::posts::{PostDetail, PostDetailData, PostLink, PostSummary, PostSummaryData};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("content source unreachable: {0}")]
    Unreachable(String),
    #[error("content source responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed content payload: {0}")]
    Malformed(String),
    #[error("cursor `{0}` was not issued by the content source")]
    ForeignCursor(String),
}

/// Sort order applied to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrdering {
    FirstPublicationDesc,
    FirstPublicationAsc,
}

impl DocumentOrdering {
    pub fn as_query(self) -> &'static str {
        match self {
            DocumentOrdering::FirstPublicationDesc => "[document.first_publication_date desc]",
            DocumentOrdering::FirstPublicationAsc => "[document.first_publication_date]",
        }
    }
}

/// A search against the content source.
///
/// When `cursor` is set the source resumes the search it was issued for: the
/// position, `page_size`, `ordering` and `after` of that search apply, and only
/// a `content_ref` given here replaces the cursor's own ref. `after` restricts
/// results to documents that come strictly after the anchor document id in
/// `ordering`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub document_type: String,
    pub page_size: u32,
    pub cursor: Option<String>,
    pub ordering: DocumentOrdering,
    pub after: Option<String>,
    pub content_ref: Option<ContentRef>,
}

impl SearchQuery {
    pub fn new(document_type: impl Into<String>, page_size: u32) -> Self {
        Self {
            document_type: document_type.into(),
            page_size,
            cursor: None,
            ordering: DocumentOrdering::FirstPublicationDesc,
            after: None,
            content_ref: None,
        }
    }

    pub fn ordered(mut self, ordering: DocumentOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn resume(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn after(mut self, document_id: impl Into<String>) -> Self {
        self.after = Some(document_id.into());
        self
    }

    pub fn with_ref(mut self, content_ref: Option<ContentRef>) -> Self {
        self.content_ref = content_ref;
        self
    }
}

/// A raw document as returned by the content source. `data` is kind-specific.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub uid: Option<String>,
    pub document_type: String,
    pub first_publication_date: Option<OffsetDateTime>,
    pub last_publication_date: Option<OffsetDateTime>,
    pub data: serde_json::Value,
}

impl Document {
    fn require_uid(&self) -> Result<String, DomainError> {
        self.uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| DomainError::malformed("post", format!("document `{}` has no uid", self.id)))
    }

    fn decode_data<T: for<'de> Deserialize<'de>>(&self) -> Result<T, DomainError> {
        T::deserialize(&self.data).map_err(|err| {
            DomainError::malformed("post", format!("document `{}`: {err}", self.id))
        })
    }

    pub fn into_summary(self) -> Result<PostSummary, DomainError> {
        let uid = self.require_uid()?;
        let data: PostSummaryData = self.decode_data()?;
        Ok(PostSummary {
            uid,
            first_publication_date: self.first_publication_date,
            data,
        })
    }

    pub fn into_detail(self) -> Result<PostDetail, DomainError> {
        let uid = self.require_uid()?;
        let data: PostDetailData = self.decode_data()?;
        Ok(PostDetail {
            id: self.id,
            uid,
            first_publication_date: self.first_publication_date,
            last_publication_date: self.last_publication_date,
            data,
        })
    }

    pub fn into_link(self) -> Result<PostLink, DomainError> {
        let uid = self.require_uid()?;
        let data: PostSummaryData = self.decode_data()?;
        Ok(PostLink {
            uid,
            title: data.title,
        })
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<CursorPage<Document>, SourceError>;

    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        content_ref: Option<&ContentRef>,
    ) -> Result<Option<Document>, SourceError>;
}
