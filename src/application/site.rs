//! Static generation of the listing and every post page.

use std::path::{Path, PathBuf};

use askama::Template;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use crate::{
    application::{
        error::AppError,
        feed::{FeedService, index_context_from_page, post_path},
        listing::{ListingFeed, PaginatedListing},
        preview::PreviewContext,
    },
    infra::error::InfraError,
    presentation::views::{IndexTemplate, LayoutContext, PostTemplate},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub pages_written: usize,
    pub posts: Vec<String>,
}

/// Render `index.html` and `posts/{uid}/index.html` under `out`.
///
/// The listing cursor is followed to the end so every published post gets a
/// page. A static host cannot answer the load-more fragment, so the index
/// lists every post and carries no loader. Post pages are fetched and written
/// `concurrency` at a time.
pub async fn build_site(
    feed: &FeedService,
    out: &Path,
    concurrency: usize,
) -> Result<BuildSummary, AppError> {
    let published = PreviewContext::published();

    let first_page = feed
        .listing()
        .fetch_listing(None, feed.page_size(), &published)
        .await?;

    let mut listing = ListingFeed::from_page(first_page);
    while listing.has_more() {
        listing
            .load_more(feed.listing(), feed.page_size(), &published)
            .await?;
    }

    let summaries = listing.into_items();
    let uids: Vec<String> = summaries
        .iter()
        .map(|summary| summary.uid.clone())
        .collect();
    for uid in &uids {
        post_target(out, uid)?;
    }

    let index = IndexTemplate {
        view: LayoutContext::new(
            feed.chrome(&published, "/"),
            index_context_from_page(PaginatedListing::new(summaries, None)),
        ),
    };
    write_page(&out.join("index.html"), render(index)?).await?;
    let mut pages_written = 1;

    let published = &published;
    let posts: Vec<String> = stream::iter(uids)
        .map(|uid| async move {
            write_post(feed, out, &uid, published).await?;
            Ok::<_, AppError>(uid)
        })
        .buffered(concurrency.clamp(1, 32))
        .try_collect()
        .await?;
    pages_written += posts.len();

    info!(
        pages = pages_written,
        out = %out.display(),
        "static site generated"
    );
    Ok(BuildSummary {
        pages_written,
        posts,
    })
}

async fn write_post(
    feed: &FeedService,
    out: &Path,
    uid: &str,
    published: &PreviewContext,
) -> Result<(), AppError> {
    let target = post_target(out, uid)?;
    let context = feed.post_context(uid, published).await?;
    let chrome = feed
        .chrome(published, &post_path(uid))
        .with_title(&context.title)
        .with_description(&context.description);
    let page = PostTemplate {
        view: LayoutContext::new(chrome, context),
    };
    write_page(&target, render(page)?).await
}

fn post_target(out: &Path, uid: &str) -> Result<PathBuf, AppError> {
    if uid.is_empty() || uid == "." || uid == ".." || uid.contains(['/', '\\']) {
        return Err(AppError::validation(format!(
            "post uid `{uid}` cannot be used as a path segment"
        )));
    }
    Ok(out.join("posts").join(uid).join("index.html"))
}

fn render<T: Template>(template: T) -> Result<String, AppError> {
    template
        .render()
        .map_err(|err| AppError::unexpected(format!("failed to render page: {err}")))
}

async fn write_page(path: &Path, html: String) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| AppError::from(InfraError::Io(err)))?;
    }
    tokio::fs::write(path, html)
        .await
        .map_err(|err| AppError::from(InfraError::Io(err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_target_nests_uid_directory() {
        let target = post_target(Path::new("/tmp/site"), "hello-world").expect("valid uid");
        assert_eq!(
            target,
            Path::new("/tmp/site/posts/hello-world/index.html")
        );
    }

    #[test]
    fn post_target_rejects_traversal() {
        assert!(post_target(Path::new("/tmp/site"), "..").is_err());
        assert!(post_target(Path::new("/tmp/site"), "a/b").is_err());
    }
}
