use std::net::SocketAddr;
use std::sync::Arc;

use piproto_news::NewsFeed;
use piproto_state::StateEngine;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::router;

/// Shared state passed to every handler.
pub struct ApiServerState {
    pub engine: Arc<StateEngine>,
    pub news: Arc<NewsFeed>,
}

/// The HTTP server.
pub struct ApiServer {
    state: Arc<ApiServerState>,
}

/// A running server. Dropping it leaves the server running; await `task` to
/// block on it.
pub struct ApiServerHandle {
    pub local_addr: SocketAddr,
    pub task: JoinHandle<std::io::Result<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<ApiServerState>) -> Self {
        Self { state }
    }

    /// Bind `addr` and start serving in the background.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ApiServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let app = router(self.state);
        let task = tokio::spawn(async move { axum::serve(listener, app).await });
        info!(%local_addr, "HTTP server started");
        Ok(ApiServerHandle { local_addr, task })
    }
}
