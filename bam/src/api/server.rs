//! Debug HTTP server.

use core::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use super::status::{self, DebugState};

/// Debug HTTP server.
pub struct Server {
    addr: SocketAddr,
    state: Arc<DebugState>,
}

impl Server {
    /// Creates a new debug server.
    pub fn new(addr: SocketAddr, state: Arc<DebugState>) -> Self {
        Self { addr, state }
    }

    /// Runs the debug server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let app = Router::new().merge(status::router(self.state));

        let listener = TcpListener::bind(self.addr).await?;
        let addr = listener.local_addr()?;
        log::info!("debug endpoint listening on {addr}");

        axum::serve(listener, app).await
    }
}
