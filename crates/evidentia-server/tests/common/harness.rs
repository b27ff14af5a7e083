//! Test server harness.

use evidentia::config::Config;
use evidentia_server::gateway::{HandlerState, create_router_with_state};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

/// Small infection-control and safety corpus served by the offline index.
pub const TEST_CORPUS: &str = r#"[
  {
    "id": "ic-1",
    "title": "Hand Hygiene Policy",
    "reference_number": "IC-001",
    "section": "4.1",
    "content": "Hand hygiene must be performed before and after every patient contact. Alcohol based hand rub is preferred unless hands are visibly soiled.",
    "score": 0.0,
    "applies_to": ["MAIN", "NORTH"],
    "source_file": "ic-001.pdf"
  },
  {
    "id": "ic-2",
    "title": "Hand Hygiene Policy",
    "reference_number": "IC-001",
    "section": "4.2",
    "content": "Staff must perform hand hygiene before touching a patient and after patient contact or contact with patient surroundings.",
    "score": 0.0,
    "applies_to": ["MAIN"],
    "source_file": "ic-001.pdf"
  },
  {
    "id": "fp-1",
    "title": "Fall Prevention",
    "reference_number": "NS-014",
    "section": "2",
    "content": "Patients at high fall risk require bed alarms and hourly rounding.",
    "score": 0.0,
    "applies_to": ["NORTH"],
    "source_file": "ns-014.pdf"
  }
]"#;

#[derive(Debug, Clone, Default)]
pub struct TestServerConfig {
    /// Corpus JSON; `None` uses [`TEST_CORPUS`].
    pub corpus: Option<String>,
    /// Synonym table JSON.
    pub synonyms: Option<String>,
    pub rate_limit: Option<u32>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _temp_dir: TempDir,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
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

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Spawns a server wired exactly like the binary, with offline search and lexical rerank.
///
/// Data files are written to a temp dir that lives as long as the returned server.
pub async fn spawn_test_server(
    config: TestServerConfig,
) -> Result<TestServer, ServerStartupError> {
    let temp_dir = TempDir::new()?;
    let corpus = config.corpus.as_deref().unwrap_or(TEST_CORPUS);

    let mut server_config = Config {
        corpus_path: Some(write_file(&temp_dir, "corpus.json", corpus)?),
        mock_services: true,
        ..Config::default()
    };
    if let Some(synonyms) = &config.synonyms {
        server_config.synonyms_path = Some(write_file(&temp_dir, "synonyms.json", synonyms)?);
    }
    if let Some(limit) = config.rate_limit {
        server_config.resilience = server_config
            .resilience
            .with_rate_limit(limit, Duration::from_secs(60));
    }
    server_config
        .validate()
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let state = HandlerState::from_config(&server_config)
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    let app = create_router_with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    wait_for_server_ready(
        addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
        _temp_dir: temp_dir,
    })
}
