use std::{process, sync::Arc};

use spacetraveling::{
    application::{
        error::AppError, feed::FeedService, listing::ListingService, post::PostService, site,
        source::ContentSource,
    },
    cache::{CacheConfig, CacheState},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        prismic::PrismicClient,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Build(args) => run_build(settings, args).await,
    }
}

fn build_feed_service(settings: &config::Settings) -> Result<FeedService, AppError> {
    let client = PrismicClient::from_settings(&settings.content)?;
    let source: Arc<dyn ContentSource> = Arc::new(client);
    let document_type = settings.content.document_type.clone();

    Ok(FeedService::new(
        ListingService::new(source.clone(), document_type.clone()),
        PostService::new(source, document_type),
        settings.content.page_size.get(),
        settings.site.title.clone(),
    ))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let feed = build_feed_service(&settings)?;

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .enabled
        .then(|| CacheState::new(cache_config.clone(), settings.preview.cookie_name.clone()));

    let state = HttpState {
        feed: Arc::new(feed),
        preview_cookie: settings.preview.cookie_name.clone(),
        cache_control: cache_config.cache_control(),
        cache,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "spacetraveling::serve",
        addr = %settings.server.addr,
        cache = cache_config.enabled,
        revalidate_seconds = cache_config.revalidate_seconds,
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                warn!(
                    target = "spacetraveling::serve",
                    "Graceful shutdown timed out; exiting"
                );
                process::exit(1);
            });
        })
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(target = "spacetraveling::serve", "Shutdown requested");
}

async fn run_build(settings: config::Settings, args: config::BuildArgs) -> Result<(), AppError> {
    let feed = build_feed_service(&settings)?;

    info!(
        target = "spacetraveling::build",
        out = %args.out.display(),
        concurrency = args.concurrency,
        "Starting static build"
    );

    let summary = site::build_site(&feed, &args.out, args.concurrency).await?;

    info!(
        target = "spacetraveling::build",
        pages = summary.pages_written,
        posts = summary.posts.len(),
        "Static build completed"
    );
    Ok(())
}
