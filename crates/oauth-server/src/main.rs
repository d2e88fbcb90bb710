//! OAuth Demo Server - Entry Point

use clap::{ArgAction, Parser};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use oauth_server::{config::Config, config::defaults, server::AuthServer};

#[derive(Parser, Debug)]
#[command(name = "oauth-server")]
#[command(about = "Demo OAuth 2.0 authorization server")]
#[command(version)]
struct Cli {
    /// Dump requests to the log (-d false to disable)
    #[arg(
        short = 'd',
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        env = "OAUTH_DUMP_REQUESTS"
    )]
    dump: bool,

    /// The client id being passed in
    #[arg(short = 'i', default_value = defaults::CLIENT_ID, env = "OAUTH_CLIENT_ID")]
    client_id: String,

    /// The client secret being passed in
    #[arg(short = 's', default_value = defaults::CLIENT_SECRET, env = "OAUTH_CLIENT_SECRET")]
    client_secret: String,

    /// The domain of the redirect url
    #[arg(short = 'r', default_value = defaults::CLIENT_DOMAIN, env = "OAUTH_CLIENT_DOMAIN")]
    client_domain: String,

    /// The port for the server
    #[arg(short = 'p', default_value_t = defaults::PORT, env = "PORT")]
    port: u16,

    /// Public base URL (defaults to http://localhost:<port>)
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        client_id = %cli.client_id,
        client_domain = %cli.client_domain,
        dump = cli.dump,
        "Starting OAuth demo server"
    );

    let mut config = Config::new(cli.client_id, cli.client_secret, cli.client_domain, cli.port);
    config.dump_requests = cli.dump;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }

    AuthServer::new(config)?.run_http().await
}
