//! Tic-tac-toe game hall.
//!
//! Serves the built-in tic-tac-toe engine over WebSocket. Configuration
//! comes from `GAMEHALL_*` environment variables; log filtering from
//! `RUST_LOG` (default `info`).

use gamehall::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let server = GameHallServer::builder()
        .config(config)
        .engine::<TicTacToe>()
        .build()
        .await?;
    let rooms: Vec<&str> = server.rooms().names().collect();
    tracing::info!(addr = %server.local_addr()?, ?rooms, "tic-tac-toe hall listening");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
