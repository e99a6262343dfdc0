//! Shared test utilities for mvirt-paas integration tests.

use mvirt_paas::bootstrap::load_templates;
use mvirt_paas::config::TemplatesConfig;
use mvirt_paas::rest::{AppState, create_router};
use mvirt_paas::{AuditLogger, MemoryStore, Services};
use reqwest::{Client, Response as ReqwestResponse};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Test server wrapper around the REST API backed by an in-memory store.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn a server with an empty repository.
    pub async fn spawn() -> Self {
        Self::start(Services::new(Arc::new(MemoryStore::new()))).await
    }

    /// Spawn a server with the built-in `vm-template-1` and `k8s-template-1`.
    pub async fn spawn_with_default_templates() -> Self {
        let services = Services::new(Arc::new(MemoryStore::new()));

        let mut templates = TemplatesConfig::default();
        templates.vm.file = PathBuf::from("/nonexistent/vm-template.tmpl");
        templates.kubernetes.file = PathBuf::from("/nonexistent/kubernetes-template.tmpl");
        load_templates(&templates, &services.templates).expect("Failed to load templates");

        Self::start(services).await
    }

    async fn start(services: Services) -> Self {
        // Create app state with noop audit logger
        let app_state = Arc::new(AppState {
            services,
            audit: Arc::new(AuditLogger::new_noop()),
        });

        let router = create_router(app_state);

        // Bind to port 0 to let OS choose available port
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
        let actual_addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr: actual_addr,
            client: Client::new(),
            shutdown_tx,
        }
    }

    /// Get base URL for the REST API.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Perform a GET request.
    pub async fn get(&self, path: &str) -> ReqwestResponse {
        self.client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a POST request with JSON body.
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> ReqwestResponse {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a POST request with a raw body.
    pub async fn post_raw(&self, path: &str, body: &'static str) -> ReqwestResponse {
        self.client
            .post(format!("{}{}", self.base_url(), path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a PUT request with JSON body.
    pub async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> ReqwestResponse {
        self.client
            .put(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform a DELETE request.
    pub async fn delete(&self, path: &str) -> ReqwestResponse {
        self.client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}
