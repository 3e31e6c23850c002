mod support;

use std::sync::Arc;

use spacetraveling::application::{
    error::ContentError,
    preview::{ContentRef, PreviewContext},
};

use support::{InMemorySource, post_document, post_service};

fn link_uid(link: Option<&spacetraveling::domain::posts::PostLink>) -> Option<&str> {
    link.map(|link| link.uid.as_str())
}

#[tokio::test]
async fn oldest_post_has_no_previous() {
    let posts = post_service(Arc::new(InMemorySource::with_posts(3)));
    let published = PreviewContext::published();

    let oldest = posts.fetch_post("post-0", &published).await.expect("post");
    let navigation = posts
        .fetch_navigation(&oldest, &published)
        .await
        .expect("navigation");

    assert!(navigation.previous.is_none());
    assert_eq!(link_uid(navigation.next.as_ref()), Some("post-1"));
}

#[tokio::test]
async fn newest_post_has_no_next() {
    let posts = post_service(Arc::new(InMemorySource::with_posts(3)));
    let published = PreviewContext::published();

    let newest = posts.fetch_post("post-2", &published).await.expect("post");
    let navigation = posts
        .fetch_navigation(&newest, &published)
        .await
        .expect("navigation");

    assert_eq!(link_uid(navigation.previous.as_ref()), Some("post-1"));
    assert!(navigation.next.is_none());
}

#[tokio::test]
async fn middle_post_links_both_neighbours_with_titles() {
    let posts = post_service(Arc::new(InMemorySource::with_posts(5)));
    let published = PreviewContext::published();

    let page = posts.post_page("post-2", &published).await.expect("page");

    let previous = page.navigation.previous.expect("previous");
    let next = page.navigation.next.expect("next");
    assert_eq!((previous.uid.as_str(), previous.title.as_str()), ("post-1", "Post 1"));
    assert_eq!((next.uid.as_str(), next.title.as_str()), ("post-3", "Post 3"));
}

#[tokio::test]
async fn lone_post_has_no_neighbours() {
    let posts = post_service(Arc::new(InMemorySource::with_posts(1)));
    let page = posts
        .post_page("post-0", &PreviewContext::published())
        .await
        .expect("page");
    assert_eq!(page.navigation, Default::default());
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let posts = post_service(Arc::new(InMemorySource::with_posts(2)));
    let err = posts
        .fetch_post("nonexistent-slug", &PreviewContext::published())
        .await
        .expect_err("missing post");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn blank_slug_is_rejected_before_lookup() {
    let source = Arc::new(InMemorySource::with_posts(2));
    let posts = post_service(source.clone());
    let err = posts
        .fetch_post("  ", &PreviewContext::published())
        .await
        .expect_err("blank slug");
    assert!(matches!(err, ContentError::Validation(_)));
    assert!(source.seen_refs().is_empty());
}

#[tokio::test]
async fn post_page_estimates_reading_time() {
    let body = vec!["word"; 399].join(" ");
    let source = Arc::new(InMemorySource::new(vec![post_document(0, &body)]));
    let posts = post_service(source);

    // 399 body words plus the one-word heading.
    let page = posts
        .post_page("post-0", &PreviewContext::published())
        .await
        .expect("page");
    assert_eq!(page.reading_minutes, 2);
}

#[tokio::test]
async fn navigation_uses_the_same_ref_as_the_post() {
    let source = Arc::new(InMemorySource::with_posts(3));
    let posts = post_service(source.clone());
    let preview = PreviewContext::with_ref(ContentRef::new("draft-ref"));

    posts.post_page("post-1", &preview).await.expect("page");

    let refs = source.seen_refs();
    assert_eq!(refs.len(), 3);
    assert!(refs.iter().all(|seen| seen.as_deref() == Some("draft-ref")));
}

#[tokio::test]
async fn retrieval_failure_propagates() {
    let source = Arc::new(InMemorySource::with_posts(3));
    let posts = post_service(source.clone());
    let published = PreviewContext::published();
    let post = posts.fetch_post("post-1", &published).await.expect("post");

    source.fail_next_search();
    let err = posts
        .fetch_navigation(&post, &published)
        .await
        .expect_err("source down");
    assert!(matches!(err, ContentError::Retrieval(_)));
}
