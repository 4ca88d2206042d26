//! Reference realtime chat endpoint for the unihub client.
//!
//! Speaks the `connect` / `getMessages` / `message` / `info` event protocol over
//! `/ws` and keeps the most recent messages in memory.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin unihub-server
//! cargo run --bin unihub-server -- --host 0.0.0.0 --port 3007
//! ```

use std::sync::Arc;

use clap::Parser;
use unihub_server::ui::{Server, state::AppState};
use unihub_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "unihub-server")]
#[command(about = "Reference realtime chat endpoint", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "3007")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Repository, pusher and use cases are wired inside AppState
    let state = AppState::in_memory(Arc::new(SystemClock));

    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
