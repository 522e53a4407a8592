//! Gomoku WebSocket server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin gomoku-server
//! cargo run --bin gomoku-server -- --host 0.0.0.0 --port 3000 --grace-ms 2000
//! ```

use std::time::Duration;

use clap::Parser;
use gomoku::logging::init_tracing;
use gomoku::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "gomoku-server")]
#[command(about = "Real-time two-player Gomoku server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Milliseconds a finished room stays open before teardown
    #[arg(long, default_value = "1000")]
    grace_ms: u64,

    /// Messages buffered per connection before it is dropped as too slow
    #[arg(long, default_value = "256")]
    outbound_capacity: usize,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(env!("CARGO_BIN_NAME"), &args.log_level);

    let room_config = RoomConfig::default()
        .with_close_grace(Duration::from_millis(args.grace_ms))
        .with_outbound_capacity(args.outbound_capacity);

    let server = match GomokuServerBuilder::new()
        .bind(&format!("{}:{}", args.host, args.port))
        .room_config(room_config)
        .build()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
