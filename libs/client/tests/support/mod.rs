//! In-process API server for client tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use api::jwt::{JwtConfig, JwtKeys};
use api::{AppState, create_router};
use client::{Client, ClientConfig, MemoryStorage, SessionStorage};
use common::{Alert, AlertType, Identity, Position};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use client::AlertDraft;

pub const ADMIN_PIN: &str = "TREE2025";
pub const PASSWORD: &str = "secret123";

/// API server on an ephemeral port, over in-memory backends
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let jwt = JwtConfig {
            keys: JwtKeys::Hmac("client-test-signing-secret".to_string()),
            access_token_expiry: 3600,
        };
        let state = AppState::in_memory(jwt, ADMIN_PIN).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A client with its own in-memory session
    pub fn client(&self) -> Client {
        self.client_with(Arc::new(MemoryStorage::new()))
    }

    pub fn client_with(&self, storage: Arc<dyn SessionStorage>) -> Client {
        Client::with_storage(config_for(self.base_url()), storage)
    }

    /// Stop serving and wait for open connections to close
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub fn config_for(base_url: String) -> ClientConfig {
    ClientConfig {
        base_url,
        ..ClientConfig::default()
    }
}

/// An address nothing listens on
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub async fn signed_in_user(server: &TestServer, email: &str) -> (Client, Identity) {
    let client = server.client();
    let identity = client
        .identity
        .register("Field Reporter", email, PASSWORD)
        .await
        .unwrap();
    (client, identity)
}

pub async fn signed_in_admin(server: &TestServer, email: &str) -> (Client, Identity) {
    let (client, _) = signed_in_user(server, email).await;
    let identity = client.identity.upgrade_role(ADMIN_PIN).await.unwrap();
    (client, identity)
}

pub fn logging_draft() -> AlertDraft {
    AlertDraft::new(
        "Illegal logging near river",
        "Fresh stumps and tire tracks along the east bank",
        AlertType::Deforestation,
    )
    .at(Position::new(45.9432, 24.9668, 8.0))
}

pub async fn report(client: &Client, title: &str) -> Alert {
    let draft = AlertDraft::new(
        title,
        "Observed this morning near the trailhead",
        AlertType::Pollution,
    )
    .at(Position::new(10.0, 20.0, 5.0));
    client.alerts.create(&draft).await.unwrap()
}
