use anyhow::{Context, Result};
use clap::Parser;
use discovery_server::config::{AppConfig, CliConfig, FileConfig};
use discovery_server::discovery::{ApiClientFactory, DiscoveryServices};
use discovery_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(about = "Web UI for discovering artists similar to one you like")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The address to bind to.
    #[clap(long, default_value = "127.0.0.1")]
    pub bind_address: String,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to a frontend directory to serve instead of the embedded page.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Seconds of inactivity after which a browser session is forgotten.
    #[clap(long, default_value_t = 3600)]
    pub session_ttl_secs: u64,

    /// Spotify application client id.
    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub spotify_client_id: Option<String>,

    /// Spotify application client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    /// Shell command printing the Spotify client secret.
    #[clap(long)]
    pub spotify_client_secret_command: Option<String>,

    /// Market used for top tracks.
    #[clap(long)]
    pub spotify_market: Option<String>,

    /// OpenAI API key.
    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Shell command printing the OpenAI API key.
    #[clap(long)]
    pub openai_api_key_command: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[clap(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Model used for recommendations.
    #[clap(long, env = "OPENAI_MODEL")]
    pub openai_model: Option<String>,

    /// Recommendations verified against the catalog at the same time.
    #[clap(long)]
    pub verify_concurrency: Option<usize>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            bind_address: self.bind_address.clone(),
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            session_ttl_secs: self.session_ttl_secs,
            spotify_client_id: self.spotify_client_id.clone(),
            spotify_client_secret: self.spotify_client_secret.clone(),
            spotify_client_secret_command: self.spotify_client_secret_command.clone(),
            spotify_market: self.spotify_market.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_api_key_command: self.openai_api_key_command.clone(),
            openai_base_url: self.openai_base_url.clone(),
            openai_model: self.openai_model.clone(),
            verify_concurrency: self.verify_concurrency,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let credentials = config.credentials();
    if !credentials.catalog.is_configured() {
        warn!("No Spotify credentials configured, they must be provided from the web page");
    }
    if !credentials.llm_api_key.is_configured() {
        warn!("No OpenAI API key configured, it must be provided from the web page");
    }

    let factory = Arc::new(ApiClientFactory {
        spotify: config.spotify_options(),
        llm_base_url: config.llm.base_url.clone(),
        llm_model: config.llm.model.clone(),
    });
    info!(
        "Using model {} at {}, market {}",
        config.llm.model, config.llm.base_url, config.catalog.market
    );

    let services = DiscoveryServices::new(
        factory,
        credentials,
        config.completion_options(),
        config.pipeline_settings(),
    )
    .context("Failed to set up catalog and model clients")?;

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        bind_address: config.bind_address.clone(),
        frontend_dir_path: config.frontend_dir_path.clone(),
        session_ttl: Duration::from_secs(config.session_ttl_secs),
    };

    info!("Ready to serve at {}:{}!", config.bind_address, config.port);
    run_server(server_config, services).await
}
