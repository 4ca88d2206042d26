//! Terminal chat client for the unihub realtime endpoint.
//!
//! Connects through the connection manager, so dropped connections are retried
//! with exponential backoff (up to 10 attempts).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin unihub-client -- --nickname alice
//! cargo run --bin unihub-client -- --member-id 64f0c0ffee --token <jwt>
//! cargo run --bin unihub-client -- --url ws://127.0.0.1:3007/ws -n bob
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, ValueEnum};
use unihub_client::{
    app::{App, AppOptions},
    endpoint::{FileTokenStore, LOCAL_DEV_WS_PORT, TokenStore},
    error::ClientError,
    graphql::GraphqlClient,
    runner::run_client,
    store::{MemberProfile, Theme, ThemeMode},
};
use unihub_shared::{config::AppConfig, logger::setup_logger};
use url::Url;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for ThemeMode {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => ThemeMode::Light,
            ThemeArg::Dark => ThemeMode::Dark,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "unihub-client")]
#[command(about = "Terminal chat client for the unihub realtime endpoint", long_about = None)]
struct Args {
    /// Explicit realtime endpoint (overrides UNIHUB_API_WS)
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Origin of the hosting page; the endpoint is derived from it
    #[arg(short = 'o', long, env = "UNIHUB_PAGE_ORIGIN", default_value = "http://localhost:3000")]
    origin: String,

    /// Realtime port used when the origin is a local development host
    #[arg(long, default_value_t = LOCAL_DEV_WS_PORT)]
    dev_port: u16,

    /// File holding the auth token
    #[arg(long, env = "UNIHUB_TOKEN_FILE", default_value = ".unihub/token")]
    token_file: PathBuf,

    /// Auth token to store before connecting
    #[arg(short = 't', long, env = "UNIHUB_TOKEN")]
    token: Option<String>,

    /// Member id to load the profile for over GraphQL
    #[arg(short = 'm', long)]
    member_id: Option<String>,

    /// Chat as a local profile with this nickname
    #[arg(short = 'n', long)]
    nickname: Option<String>,

    #[arg(long, value_enum, default_value_t = ThemeArg::Light)]
    theme: ThemeArg,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

async fn resolve_profile(
    args: &Args,
    config: &AppConfig,
    tokens: Arc<dyn TokenStore>,
) -> Result<Option<MemberProfile>, ClientError> {
    if let Some(member_id) = &args.member_id {
        let graphql = GraphqlClient::new(&config.graphql_url, tokens);
        let profile = graphql.get_member(member_id).await?;
        return Ok(Some(profile));
    }
    Ok(args.nickname.as_ref().map(|nickname| MemberProfile {
        id: format!("local-{nickname}"),
        nickname: nickname.clone(),
        full_name: None,
        avatar_path: None,
    }))
}

async fn run(args: Args) -> Result<(), ClientError> {
    let config = AppConfig::from_env()?;
    let origin =
        Url::parse(&args.origin).map_err(|_| ClientError::InvalidOrigin(args.origin.clone()))?;

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&args.token_file));
    if let Some(token) = &args.token {
        tokens.save_token(token)?;
    }
    let profile = resolve_profile(&args, &config, Arc::clone(&tokens)).await?;

    let mut options = AppOptions::new(Some(origin), Arc::clone(&tokens));
    options.ws_url = args.url.clone().or(config.ws_url);
    options.dev_port = args.dev_port;

    let app = App::start(options).await;
    app.context().theme.set(Theme {
        mode: args.theme.into(),
    });
    match profile {
        Some(profile) => app.login(profile, None).await?,
        None => tracing::info!("No profile given; chatting is disabled until login"),
    }

    run_client(app).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
