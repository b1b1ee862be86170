use std::{net::SocketAddr, sync::Arc};

use fault_relay::{
    config::AppConfig,
    engine::Orchestrator,
    http_server,
    test_helpers::{RecordingSleeper, ScriptedTransport, create_test_config},
};
use reqwest::Client;
use tokio::task;
use tokio_util::sync::CancellationToken;

pub const TEST_SECRET: &str = "test-secret";

pub struct TestServer {
    pub address: SocketAddr,
    pub client: Client,
    pub transport: Arc<ScriptedTransport>,
    shutdown: CancellationToken,
    _server_handle: task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with(create_test_config(TEST_SECRET), ScriptedTransport::accepting()).await
    }

    pub async fn with(mut config: AppConfig, transport: ScriptedTransport) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get address");
        drop(listener); // Release port for the app to use

        config.server.listen_address = addr.to_string();
        let transport = Arc::new(transport);
        let shutdown = CancellationToken::new();

        let orchestrator = Orchestrator::builder()
            .config(config.clone())
            .transport(transport.clone())
            .sleeper(Arc::new(RecordingSleeper::default()))
            .cancellation_token(shutdown.clone())
            .build()
            .expect("Failed to build orchestrator");

        let token = shutdown.clone();
        let server_handle = task::spawn(async move {
            http_server::run_server_from_config(Arc::new(config), Arc::new(orchestrator), token)
                .await
                .expect("Server failed");
        });

        // Wait for server to start
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        Self {
            address: addr,
            client: Client::new(),
            transport,
            shutdown,
            _server_handle: server_handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
