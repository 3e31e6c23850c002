//! Prismic-compatible REST content API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use time::{
    OffsetDateTime,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};
use tracing::{debug, instrument};
use url::Url;

use crate::application::pagination::CursorPage;
use crate::application::preview::ContentRef;
use crate::application::source::{ContentSource, Document, SearchQuery, SourceError};
use crate::config::ContentSettings;
use crate::infra::error::InfraError;

pub const METRIC_CONTENT_REQUESTS: &str = "spacetraveling_content_requests_total";
pub const METRIC_CONTENT_REQUEST_MS: &str = "spacetraveling_content_request_ms";

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// `2021-03-25T19:25:28+0000`, the offset form the content API emits.
const COMPACT_OFFSET_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

#[derive(Clone)]
pub struct PrismicClient {
    client: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    pub fn new(
        endpoint: Url,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::configuration(format!("http client: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            access_token,
        })
    }

    pub fn from_settings(settings: &ContentSettings) -> Result<Self, InfraError> {
        Self::new(
            settings.api_endpoint.clone(),
            settings.access_token.clone(),
            settings.request_timeout,
        )
    }

    fn search_url(&self) -> Result<Url, SourceError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Malformed("content API endpoint cannot be a base".into()))?
            .pop_if_empty()
            .extend(["documents", "search"]);
        Ok(url)
    }

    fn with_token(&self, url: &mut Url) {
        if let Some(token) = self.access_token.as_deref() {
            url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
        }
    }

    /// Accept only continuation URLs issued by the configured API.
    fn check_cursor(&self, cursor: &str) -> Result<Url, SourceError> {
        let url = Url::parse(cursor).map_err(|_| SourceError::ForeignCursor(cursor.to_string()))?;
        if url.origin() != self.endpoint.origin() {
            return Err(SourceError::ForeignCursor(cursor.to_string()));
        }
        Ok(url)
    }

    async fn master_ref(&self) -> Result<String, SourceError> {
        let mut url = self.endpoint.clone();
        self.with_token(&mut url);
        let root: ApiRoot = self.fetch_json("api", url).await?;
        root.refs
            .into_iter()
            .find(|entry| entry.is_master_ref)
            .map(|entry| entry.reference)
            .ok_or_else(|| SourceError::Malformed("API root lists no master ref".into()))
    }

    async fn resolve_ref(&self, content_ref: Option<&ContentRef>) -> Result<String, SourceError> {
        match content_ref {
            Some(content_ref) => Ok(content_ref.as_str().to_string()),
            None => self.master_ref().await,
        }
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Result<T, SourceError> {
        let started = Instant::now();
        let result = self.send(url).await;
        histogram!(METRIC_CONTENT_REQUEST_MS, "operation" => operation)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        let outcome = if result.is_ok() { "ok" } else { "error" };
        counter!(METRIC_CONTENT_REQUESTS, "operation" => operation, "outcome" => outcome)
            .increment(1);
        result
    }

    async fn send<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| SourceError::Unreachable(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| SourceError::Unreachable(err.to_string()))?;
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| SourceError::Malformed(err.to_string()))
    }

    async fn run_search(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Result<CursorPage<Document>, SourceError> {
        let response: ApiSearchResponse = self.fetch_json(operation, url).await?;
        let items = response
            .results
            .into_iter()
            .map(ApiDocument::into_document)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(operation, returned = items.len(), "content search completed");
        Ok(CursorPage::new(items, response.next_page.map(public_cursor)))
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    #[instrument(skip(self, query), fields(document_type = %query.document_type, resumed = query.cursor.is_some()))]
    async fn search(&self, query: &SearchQuery) -> Result<CursorPage<Document>, SourceError> {
        if let Some(cursor) = query.cursor.as_deref() {
            let mut url = self.check_cursor(cursor)?;
            // Position and page size stay with the cursor; a preview ref wins over its own.
            if let Some(content_ref) = query.content_ref.as_ref() {
                replace_query_param(&mut url, "ref", Some(content_ref.as_str()));
            }
            replace_query_param(&mut url, ACCESS_TOKEN_PARAM, None);
            self.with_token(&mut url);
            return self.run_search("search_page", url).await;
        }

        let content_ref = self.resolve_ref(query.content_ref.as_ref()).await?;
        let mut url = self.search_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ref", &content_ref)
                .append_pair("q", &type_predicate(&query.document_type))
                .append_pair("pageSize", &query.page_size.to_string())
                .append_pair("orderings", query.ordering.as_query());
            if let Some(after) = query.after.as_deref() {
                pairs.append_pair("after", after);
            }
        }
        self.with_token(&mut url);
        self.run_search("search", url).await
    }

    #[instrument(skip(self, content_ref))]
    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        content_ref: Option<&ContentRef>,
    ) -> Result<Option<Document>, SourceError> {
        let content_ref = self.resolve_ref(content_ref).await?;
        let mut url = self.search_url()?;
        url.query_pairs_mut()
            .append_pair("ref", &content_ref)
            .append_pair("q", &uid_predicate(document_type, uid))
            .append_pair("pageSize", "1");
        self.with_token(&mut url);

        let page = self.run_search("get_by_uid", url).await?;
        Ok(page.items.into_iter().next())
    }
}

/// Drop every `key` pair from the query, then append `value` when given.
fn replace_query_param(url: &mut Url, key: &str, value: Option<&str>) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| &**name != key)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if let Some(value) = value {
        pairs.push((key.to_string(), value.to_string()));
    }
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

/// Continuation URLs end up in public markup, so the repository token never
/// travels with them; `search` adds it back when the cursor is followed.
fn public_cursor(next_page: String) -> String {
    let Ok(mut url) = Url::parse(&next_page) else {
        return next_page;
    };
    if !url.query_pairs().any(|(name, _)| name == ACCESS_TOKEN_PARAM) {
        return next_page;
    }
    replace_query_param(&mut url, ACCESS_TOKEN_PARAM, None);
    url.into()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn type_predicate(document_type: &str) -> String {
    format!("[[at(document.type,{})]]", quote(document_type))
}

fn uid_predicate(document_type: &str, uid: &str) -> String {
    format!("[[at(my.{document_type}.uid,{})]]", quote(uid))
}

pub fn parse_publication_date(value: &str) -> Result<OffsetDateTime, SourceError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(value, COMPACT_OFFSET_FORMAT))
        .map_err(|err| SourceError::Malformed(format!("publication date `{value}`: {err}")))
}

#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    results: Vec<ApiDocument>,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiDocument {
    id: String,
    #[serde(default)]
    uid: Option<String>,
    #[serde(rename = "type")]
    document_type: String,
    #[serde(default)]
    first_publication_date: Option<String>,
    #[serde(default)]
    last_publication_date: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl ApiDocument {
    fn into_document(self) -> Result<Document, SourceError> {
        let first_publication_date = self
            .first_publication_date
            .as_deref()
            .map(parse_publication_date)
            .transpose()?;
        let last_publication_date = self
            .last_publication_date
            .as_deref()
            .map(parse_publication_date)
            .transpose()?;
        Ok(Document {
            id: self.id,
            uid: self.uid,
            document_type: self.document_type,
            first_publication_date,
            last_publication_date,
            data: self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn client() -> PrismicClient {
        PrismicClient::new(
            Url::parse("https://spacetraveling.cdn.prismic.io/api/v2").expect("url"),
            None,
            Duration::from_secs(5),
        )
        .expect("client builds")
    }

    #[test]
    fn parses_compact_offset_dates() {
        let parsed = parse_publication_date("2021-03-25T19:25:28+0000").expect("date parses");
        assert_eq!(parsed, datetime!(2021-03-25 19:25:28 UTC));
    }

    #[test]
    fn parses_rfc3339_dates() {
        let parsed = parse_publication_date("2021-03-25T19:25:28Z").expect("date parses");
        assert_eq!(parsed, datetime!(2021-03-25 19:25:28 UTC));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(matches!(
            parse_publication_date("yesterday"),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn search_url_appends_documents_search() {
        assert_eq!(
            client().search_url().expect("url").as_str(),
            "https://spacetraveling.cdn.prismic.io/api/v2/documents/search"
        );
    }

    #[test]
    fn cursor_from_same_origin_is_accepted() {
        let cursor = "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=2";
        assert!(client().check_cursor(cursor).is_ok());
    }

    #[test]
    fn cursor_from_other_origin_is_rejected() {
        for cursor in ["https://evil.example/api/v2/documents/search?page=2", "page-2"] {
            assert!(matches!(
                client().check_cursor(cursor),
                Err(SourceError::ForeignCursor(_))
            ));
        }
    }

    #[test]
    fn public_cursor_drops_the_access_token() {
        let cursor = public_cursor(
            "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=2&access_token=secret&ref=master"
                .to_string(),
        );
        assert!(!cursor.contains("secret"), "{cursor}");
        assert!(cursor.contains("page=2"));
        assert!(cursor.contains("ref=master"));
    }

    #[test]
    fn public_cursor_keeps_tokenless_urls_verbatim() {
        let cursor = "https://spacetraveling.cdn.prismic.io/api/v2/documents/search?page=2&ref=a%20b";
        assert_eq!(public_cursor(cursor.to_string()), cursor);
    }

    #[test]
    fn replacing_a_param_overrides_every_occurrence() {
        let mut url = Url::parse("https://cms.example/search?ref=a&page=3&ref=b").expect("url");
        replace_query_param(&mut url, "ref", Some("draft"));
        assert_eq!(url.query(), Some("page=3&ref=draft"));

        replace_query_param(&mut url, "page", None);
        replace_query_param(&mut url, "ref", None);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn uid_predicate_escapes_quotes() {
        assert_eq!(
            uid_predicate("post", "a\"b"),
            "[[at(my.post.uid,\"a\\\"b\")]]"
        );
    }

    #[test]
    fn type_predicate_targets_document_type() {
        assert_eq!(type_predicate("post"), "[[at(document.type,\"post\")]]");
    }
}
