use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the spacetraveling binary.
#[derive(Debug, Parser)]
#[command(
    name = "spacetraveling",
    version,
    about = "Blog front-end for a headless content API"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SPACETRAVELING_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the blog over HTTP.
    Serve(Box<ServeArgs>),
    /// Render the listing and every post page to static HTML files.
    Build(BuildArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content API endpoint.
    #[arg(long = "content-api-endpoint", value_name = "URL")]
    pub api_endpoint: Option<String>,

    /// Override the content API access token.
    #[arg(long = "content-access-token", value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Override the number of posts per listing page.
    #[arg(long = "content-page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Toggle the in-process page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override how long rendered pages are served before re-rendering.
    #[arg(long = "cache-revalidate-seconds", value_name = "SECONDS")]
    pub cache_revalidate_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub overrides: ContentOverrides,

    /// Directory receiving the generated pages.
    #[arg(long = "out", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Number of post pages fetched and written at once (clamped to 1..=32).
    #[arg(long = "concurrency", value_name = "COUNT", default_value_t = 4)]
    pub concurrency: usize,
}
