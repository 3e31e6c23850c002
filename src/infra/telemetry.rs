use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::prismic::{METRIC_CONTENT_REQUEST_MS, METRIC_CONTENT_REQUESTS};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CONTENT_REQUESTS,
            Unit::Count,
            "Requests sent to the content API, labelled by operation and outcome."
        );
        describe_histogram!(
            METRIC_CONTENT_REQUEST_MS,
            Unit::Milliseconds,
            "Content API round-trip latency in milliseconds."
        );
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Rendered pages served from the revalidation cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Page requests that missed or outlived the revalidation cache."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Cached pages evicted due to capacity."
        );
    });
}
