#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use serde_json::json;
use spacetraveling::application::{
    feed::FeedService,
    listing::ListingService,
    pagination::CursorPage,
    post::PostService,
    preview::ContentRef,
    source::{ContentSource, Document, DocumentOrdering, SearchQuery, SourceError},
};
use time::{Duration, OffsetDateTime, macros::datetime};

pub const DOCUMENT_TYPE: &str = "post";

/// Content source held in memory, ordered by first publication (newest
/// first) with the document id breaking ties.
pub struct InMemorySource {
    documents: Vec<Document>,
    fail_next: AtomicBool,
    seen_refs: Mutex<Vec<Option<String>>>,
}

impl InMemorySource {
    pub fn new(mut documents: Vec<Document>) -> Self {
        documents.sort_by(|a, b| {
            b.first_publication_date
                .cmp(&a.first_publication_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self {
            documents,
            fail_next: AtomicBool::new(false),
            seen_refs: Mutex::new(Vec::new()),
        }
    }

    /// `count` posts, `post-0` being the oldest, published one day apart.
    pub fn with_posts(count: usize) -> Self {
        Self::new((0..count).map(|index| post_document(index, "Lorem ipsum dolor")).collect())
    }

    pub fn fail_next_search(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn seen_refs(&self) -> Vec<Option<String>> {
        self.seen_refs.lock().expect("refs lock").clone()
    }

    fn record_ref(&self, content_ref: Option<&ContentRef>) {
        self.seen_refs
            .lock()
            .expect("refs lock")
            .push(content_ref.map(|value| value.as_str().to_string()));
    }

    fn ordered(&self, ordering: DocumentOrdering) -> Vec<Document> {
        let mut documents = self.documents.clone();
        if ordering == DocumentOrdering::FirstPublicationAsc {
            documents.reverse();
        }
        documents
    }
}

fn ordering_token(ordering: DocumentOrdering) -> &'static str {
    match ordering {
        DocumentOrdering::FirstPublicationDesc => "desc",
        DocumentOrdering::FirstPublicationAsc => "asc",
    }
}

fn parse_cursor(cursor: &str) -> Result<(usize, u32, DocumentOrdering), SourceError> {
    let foreign = || SourceError::ForeignCursor(cursor.to_string());
    let mut parts = cursor.strip_prefix("mem:").ok_or_else(foreign)?.split(':');
    let start = parts.next().and_then(|v| v.parse().ok()).ok_or_else(foreign)?;
    let page_size = parts.next().and_then(|v| v.parse().ok()).ok_or_else(foreign)?;
    let ordering = match parts.next() {
        Some("desc") => DocumentOrdering::FirstPublicationDesc,
        Some("asc") => DocumentOrdering::FirstPublicationAsc,
        _ => return Err(foreign()),
    };
    Ok((start, page_size, ordering))
}

#[async_trait]
impl ContentSource for InMemorySource {
    async fn search(&self, query: &SearchQuery) -> Result<CursorPage<Document>, SourceError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SourceError::Unreachable("connection refused".to_string()));
        }
        self.record_ref(query.content_ref.as_ref());

        let (start, page_size, ordering) = match query.cursor.as_deref() {
            Some(cursor) => parse_cursor(cursor)?,
            None => (0, query.page_size, query.ordering),
        };

        let mut candidates: Vec<Document> = self
            .ordered(ordering)
            .into_iter()
            .filter(|document| document.document_type == query.document_type)
            .collect();
        if let Some(anchor) = query.after.as_deref() {
            candidates = match candidates.iter().position(|document| document.id == anchor) {
                Some(index) => candidates.split_off(index + 1),
                None => Vec::new(),
            };
        }

        let end = (start + page_size as usize).min(candidates.len());
        let items = candidates
            .get(start..end)
            .map(<[Document]>::to_vec)
            .unwrap_or_default();
        let next_cursor = (end < candidates.len())
            .then(|| format!("mem:{end}:{page_size}:{}", ordering_token(ordering)));
        Ok(CursorPage::new(items, next_cursor))
    }

    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        content_ref: Option<&ContentRef>,
    ) -> Result<Option<Document>, SourceError> {
        self.record_ref(content_ref);
        Ok(self
            .documents
            .iter()
            .find(|document| {
                document.document_type == document_type && document.uid.as_deref() == Some(uid)
            })
            .cloned())
    }
}

pub fn published_at(index: usize) -> OffsetDateTime {
    datetime!(2021-03-01 12:00 UTC) + Duration::days(index as i64)
}

/// A post whose single section body is `body`.
pub fn post_document(index: usize, body: &str) -> Document {
    Document {
        id: format!("DOC{index:03}"),
        uid: Some(format!("post-{index}")),
        document_type: DOCUMENT_TYPE.to_string(),
        first_publication_date: Some(published_at(index)),
        last_publication_date: Some(published_at(index)),
        data: json!({
            "title": format!("Post {index}"),
            "subtitle": format!("Subtitle {index}"),
            "author": "Ana",
            "banner": {"url": format!("https://images.example/{index}.png")},
            "content": [
                {
                    "heading": "Intro",
                    "body": [{"type": "paragraph", "text": body, "spans": []}]
                }
            ]
        }),
    }
}

pub fn listing_service(source: Arc<InMemorySource>) -> ListingService {
    ListingService::new(source, DOCUMENT_TYPE)
}

pub fn post_service(source: Arc<InMemorySource>) -> PostService {
    PostService::new(source, DOCUMENT_TYPE)
}

pub fn feed_service(source: Arc<InMemorySource>, page_size: u32) -> FeedService {
    FeedService::new(
        listing_service(source.clone()),
        post_service(source),
        page_size,
        "spacetraveling",
    )
}
