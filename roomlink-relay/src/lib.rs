//! WebSocket relay for roomlink rooms.
//!
//! Each connection gets a fresh [`PeerId`](roomlink_core::PeerId) announced
//! with `init`. Membership changes are broadcast to the room; offers,
//! answers and candidates are forwarded to their target with the sender
//! stamped by the relay.

mod config;
mod error;
mod relay;
mod ws_handler;

pub use config::*;
pub use error::*;
pub use relay::*;
pub use ws_handler::*;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Routes for the relay. `/` and `/ws` both upgrade to the signaling socket.
pub fn router(relay: Relay) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(relay)
}

/// Serve on an already bound listener until the future is dropped.
pub async fn serve_listener(listener: TcpListener, relay: Relay) -> Result<()> {
    info!("Relay listening on {}", listener.local_addr()?);
    axum::serve(listener, router(relay)).await?;
    Ok(())
}

/// Bind `config.bind` and serve.
pub async fn serve(config: &RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.bind,
            source,
        })?;
    serve_listener(listener, Relay::new()).await
}
