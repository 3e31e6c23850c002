//! Server-driven datastar responses for the load-more interaction.

use std::convert::Infallible;

use async_stream::stream;
use axum::response::{
    IntoResponse, Response,
    sse::{Event, Sse},
};
use datastar::prelude::{ElementPatchMode, PatchElements, PatchSignals};

pub const POST_GRID_SELECTOR: &str = "#post-grid";
pub const FEED_LOADER_SELECTOR: &str = "#feed-sentinel-container";

/// Ordered list of datastar events sent back as one SSE response.
#[derive(Default)]
pub struct StreamBuilder {
    events: Vec<Event>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_patch(
        &mut self,
        html: String,
        selector: &str,
        mode: ElementPatchMode,
    ) -> &mut Self {
        let event = PatchElements::new(html)
            .selector(selector)
            .mode(mode)
            .write_as_axum_sse_event();
        self.events.push(event);
        self
    }

    /// Append rendered post cards to the end of the grid.
    pub fn append_cards(&mut self, html: String) -> &mut Self {
        self.push_patch(html, POST_GRID_SELECTOR, ElementPatchMode::Append)
    }

    /// Swap the load-more control for one pointing at the next cursor.
    pub fn replace_loader(&mut self, html: String) -> &mut Self {
        self.push_patch(html, FEED_LOADER_SELECTOR, ElementPatchMode::Inner)
    }

    pub fn push_signals(&mut self, payload: &str) -> &mut Self {
        let event = PatchSignals::new(payload).write_as_axum_sse_event();
        self.events.push(event);
        self
    }

    /// Re-enable the load-more control on the client.
    pub fn finish_loading(&mut self) -> &mut Self {
        self.push_signals(r#"{"feedLoading": false}"#)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_response(self) -> Response {
        let stream = stream! {
            for event in self.events {
                yield Ok::<Event, Infallible>(event);
            }
        };
        Sse::new(stream).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_more_sequence_has_three_events() {
        let mut builder = StreamBuilder::new();
        builder
            .append_cards("<article></article>".to_string())
            .replace_loader(String::new())
            .finish_loading();
        assert_eq!(builder.len(), 3);
    }

    #[test]
    fn response_is_an_event_stream() {
        let mut builder = StreamBuilder::new();
        builder.finish_loading();
        let response = builder.into_response();
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/event-stream"));
    }
}
