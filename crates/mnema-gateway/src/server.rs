use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use mnema_core::{QueryPipeline, SyncOrchestrator};
use mnema_memory::NoteIndex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;
use crate::router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub sync: Arc<SyncOrchestrator>,
    pub query: Arc<QueryPipeline>,
    pub index: Arc<NoteIndex>,
    pub cancel: CancellationToken,
    pub started_at: Instant,
}

pub struct GatewayServer {
    addr: SocketAddr,
    auth_token: Option<String>,
    rate_limit: u32,
    max_body_size: usize,
    sync: Arc<SyncOrchestrator>,
    query: Arc<QueryPipeline>,
    index: Arc<NoteIndex>,
    cancel: CancellationToken,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        sync: Arc<SyncOrchestrator>,
        query: Arc<QueryPipeline>,
        index: Arc<NoteIndex>,
        cancel: CancellationToken,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to 0.0.0.0 — ensure this is intended for production");
        }

        Self {
            addr,
            auth_token: None,
            rate_limit: 120,
            max_body_size: 1_048_576,
            sync,
            query,
            index,
            cancel,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Start the HTTP gateway server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let state = AppState {
            sync: self.sync,
            query: self.query,
            index: self.index,
            cancel: self.cancel,
            started_at: Instant::now(),
        };

        let router = build_router(state, self.auth_token, self.rate_limit, self.max_body_size);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            tracing::info!("gateway shutting down");
        })
        .await
        .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnema_core::{NoteSource, RepoError};
    use mnema_llm::mock::{MockChat, MockEmbedder};
    use mnema_memory::InMemoryVectorStore;

    struct EmptySource;

    impl NoteSource for EmptySource {
        fn ensure_up_to_date(
            &self,
        ) -> mnema_core::repo::BoxFuture<'_, Result<Vec<String>, RepoError>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn read<'a>(
            &'a self,
            rel_path: &'a str,
        ) -> mnema_core::repo::BoxFuture<'a, Result<String, RepoError>> {
            Box::pin(async move { Err(RepoError::Git(format!("no such file: {rel_path}"))) })
        }
    }

    fn components() -> (Arc<SyncOrchestrator>, Arc<QueryPipeline>, Arc<NoteIndex>) {
        let index = Arc::new(NoteIndex::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(MockEmbedder::default()),
            "notes",
        ));
        let sync = Arc::new(SyncOrchestrator::new(
            Arc::new(EmptySource),
            Arc::clone(&index),
            Arc::new(MockEmbedder::default()),
            10_000,
            0.2,
            None,
        ));
        let query = Arc::new(QueryPipeline::new(
            Arc::new(MockChat::default()),
            Arc::clone(&index),
            4,
        ));
        (sync, query, index)
    }

    #[test]
    fn server_builder_chain() {
        let (sync, query, index) = components();
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new(
            "127.0.0.1",
            8090,
            sync,
            query,
            index,
            CancellationToken::new(),
            srx,
        )
        .with_auth(Some("token".into()))
        .with_rate_limit(60)
        .with_max_body_size(512);

        assert_eq!(server.rate_limit, 60);
        assert_eq!(server.max_body_size, 512);
        assert!(server.auth_token.is_some());
    }

    #[test]
    fn server_invalid_bind_fallback() {
        let (sync, query, index) = components();
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new(
            "not_an_ip",
            9999,
            sync,
            query,
            index,
            CancellationToken::new(),
            srx,
        );
        assert_eq!(server.addr.port(), 9999);
    }
}
