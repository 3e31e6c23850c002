use std::time::Duration;

use httpmock::MockServer;
use serde_json::json;
use spacetraveling::application::{
    preview::ContentRef,
    source::{ContentSource, DocumentOrdering, SearchQuery, SourceError},
};
use spacetraveling::infra::prismic::PrismicClient;
use url::Url;

fn client(server: &MockServer, token: Option<&str>) -> PrismicClient {
    PrismicClient::new(
        Url::parse(&server.url("/api/v2")).expect("endpoint url"),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .expect("client builds")
}

fn mock_master_ref(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method("GET").path("/api/v2");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "refs": [
                    {"id": "preview", "ref": "other-ref", "isMasterRef": false},
                    {"id": "master", "ref": "master-ref", "isMasterRef": true}
                ]
            }));
    })
}

fn document(id: &str, uid: &str, published: &str) -> serde_json::Value {
    json!({
        "id": id,
        "uid": uid,
        "type": "post",
        "first_publication_date": published,
        "last_publication_date": published,
        "data": {
            "title": format!("Title {uid}"),
            "subtitle": "Sub",
            "author": "Ana",
            "banner": {"url": "https://images.example/banner.png"},
            "content": []
        }
    })
}

#[tokio::test]
async fn listing_search_uses_master_ref_and_follows_next_page() {
    let server = MockServer::start();
    let root = mock_master_ref(&server);
    let next_page = server.url("/api/v2/documents/search?page=2&ref=master-ref");
    let first = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("ref", "master-ref")
            .query_param("q", "[[at(document.type,\"post\")]]")
            .query_param("pageSize", "2")
            .query_param("orderings", "[document.first_publication_date desc]");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "results": [
                    document("B", "second", "2021-03-26T10:00:00+0000"),
                    document("A", "first", "2021-03-25T19:25:28+0000")
                ],
                "next_page": next_page
            }));
    });
    let second = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("page", "2");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"results": [], "next_page": null}));
    });

    let client = client(&server, None);
    let page = client
        .search(&SearchQuery::new("post", 2))
        .await
        .expect("first page");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].uid.as_deref(), Some("second"));
    assert_eq!(page.next_cursor.as_deref(), Some(next_page.as_str()));

    let cursor = page.next_cursor.expect("cursor");
    let last = client
        .search(&SearchQuery::new("post", 2).resume(cursor))
        .await
        .expect("second page");
    assert!(last.items.is_empty());
    assert!(last.next_cursor.is_none());

    root.assert();
    first.assert();
    second.assert();
}

#[tokio::test]
async fn preview_ref_skips_master_lookup_and_sends_token() {
    let server = MockServer::start();
    let search = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("ref", "draft-ref")
            .query_param("access_token", "secret")
            .query_param("orderings", "[document.first_publication_date]")
            .query_param("after", "A");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "results": [document("B", "second", "2021-03-26T10:00:00Z")],
                "next_page": null
            }));
    });

    let page = client(&server, Some("secret"))
        .search(
            &SearchQuery::new("post", 1)
                .ordered(DocumentOrdering::FirstPublicationAsc)
                .after("A")
                .with_ref(Some(ContentRef::new("draft-ref"))),
        )
        .await
        .expect("search succeeds");

    assert_eq!(page.items.len(), 1);
    search.assert();
}

#[tokio::test]
async fn cursor_hides_the_token_and_gets_it_back_when_followed() {
    let server = MockServer::start();
    mock_master_ref(&server);
    let next_page = server.url("/api/v2/documents/search?page=2&ref=master-ref&access_token=secret");
    server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("pageSize", "1")
            .query_param("access_token", "secret");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "results": [document("B", "second", "2021-03-26T10:00:00+0000")],
                "next_page": next_page
            }));
    });
    let second = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("page", "2")
            .query_param("ref", "master-ref")
            .query_param("access_token", "secret");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "results": [document("A", "first", "2021-03-25T19:25:28+0000")],
                "next_page": null
            }));
    });

    let client = client(&server, Some("secret"));
    let page = client
        .search(&SearchQuery::new("post", 1))
        .await
        .expect("first page");
    let cursor = page.next_cursor.expect("cursor");
    assert!(!cursor.contains("secret"), "{cursor}");
    assert!(!cursor.contains("access_token"), "{cursor}");

    let last = client
        .search(&SearchQuery::new("post", 1).resume(cursor))
        .await
        .expect("second page");
    assert_eq!(last.items[0].uid.as_deref(), Some("first"));
    second.assert();
}

#[tokio::test]
async fn resumed_search_reads_the_preview_ref() {
    let server = MockServer::start();
    let cursor = server.url("/api/v2/documents/search?page=2&pageSize=2&ref=master-ref");
    let resumed = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("page", "2")
            .query_param("pageSize", "2")
            .query_param("ref", "draft-ref");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"results": [], "next_page": null}));
    });

    client(&server, None)
        .search(
            &SearchQuery::new("post", 2)
                .resume(cursor)
                .with_ref(Some(ContentRef::new("draft-ref"))),
        )
        .await
        .expect("resumed page");

    resumed.assert();
}

#[tokio::test]
async fn get_by_uid_returns_first_match_or_none() {
    let server = MockServer::start();
    mock_master_ref(&server);
    server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("q", "[[at(my.post.uid,\"first\")]]")
            .query_param("pageSize", "1");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "results": [document("A", "first", "2021-03-25T19:25:28+0000")],
                "next_page": null
            }));
    });
    server.mock(|when, then| {
        when.method("GET")
            .path("/api/v2/documents/search")
            .query_param("q", "[[at(my.post.uid,\"missing\")]]");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({"results": [], "next_page": null}));
    });

    let client = client(&server, None);
    let found = client
        .get_by_uid("post", "first", None)
        .await
        .expect("lookup succeeds")
        .expect("document present");
    assert_eq!(found.id, "A");
    assert!(found.first_publication_date.is_some());

    let missing = client
        .get_by_uid("post", "missing", None)
        .await
        .expect("lookup succeeds");
    assert!(missing.is_none());
}

#[tokio::test]
async fn error_status_is_reported_with_body() {
    let server = MockServer::start();
    mock_master_ref(&server);
    server.mock(|when, then| {
        when.method("GET").path("/api/v2/documents/search");
        then.status(500).body("upstream exploded");
    });

    let err = client(&server, None)
        .search(&SearchQuery::new("post", 2))
        .await
        .expect_err("server error");
    match err {
        SourceError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_payload_is_rejected() {
    let server = MockServer::start();
    mock_master_ref(&server);
    server.mock(|when, then| {
        when.method("GET").path("/api/v2/documents/search");
        then.status(200)
            .header("content-type", "application/json")
            .body("{\"results\": \"nope\"}");
    });

    let err = client(&server, None)
        .search(&SearchQuery::new("post", 2))
        .await
        .expect_err("bad payload");
    assert!(matches!(err, SourceError::Malformed(_)));
}

#[tokio::test]
async fn cursor_for_another_host_is_refused_without_a_request() {
    let server = MockServer::start();
    let err = client(&server, None)
        .search(&SearchQuery::new("post", 2).resume("https://elsewhere.example/documents/search"))
        .await
        .expect_err("foreign cursor");
    assert!(matches!(err, SourceError::ForeignCursor(_)));
}

#[tokio::test]
async fn unreachable_source_is_reported() {
    let client = PrismicClient::new(
        Url::parse("http://127.0.0.1:9/api/v2").expect("url"),
        None,
        Duration::from_millis(500),
    )
    .expect("client builds");
    let err = client
        .search(&SearchQuery::new("post", 2))
        .await
        .expect_err("nothing listens there");
    assert!(matches!(err, SourceError::Unreachable(_)));
}
