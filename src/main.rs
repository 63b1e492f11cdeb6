//! Multi-Room Chat Server - Entry Point
//!
//! Binds the TCP listener, owns the shared registry, and accepts
//! connections until Ctrl-C tears everything down.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bisonchat::{handle_connection, Registry, RoomName, DEFAULT_ROOM};

/// Default server address
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=bisonchat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bisonchat=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    // Start TCP listener
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat server listening on {}", addr);

    // The registry every worker shares, with the room all clients land
    // in created up front.
    let registry = Arc::new(Registry::new());
    registry.create_room(RoomName::new(DEFAULT_ROOM)).await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Connection accept loop
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!("New connection from {}", peer);
                    let registry = registry.clone();

                    // Spawn worker task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = &mut shutdown => {
                info!("Ctrl-C received, closing all connections");
                registry.teardown().await;
                break;
            }
        }
    }

    Ok(())
}
