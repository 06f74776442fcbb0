//! Web server for the archive.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::{FileStorage, UploadLimits};
use crate::{ArchiveError, Database};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_openapi_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// CORS allowed origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: Database, storage: FileStorage) -> crate::Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ArchiveError::Config(format!("invalid server address: {e}")))?;

        let limits = UploadLimits::from_config(&config.storage);

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, storage, limits)),
            jwt_state: Arc::new(JwtState::new(&config.auth.jwt_secret)),
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Full application router.
    pub fn router(&self) -> Router {
        create_router(self.app_state.clone(), self.jwt_state.clone(), &self.cors_origins)
            .merge(create_health_router())
            .merge(create_openapi_router())
    }

    /// Run the web server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(base: &str) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.auth.jwt_secret = "test-secret-key".to_string();
        config.storage.base_path = base.to_string();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let temp = TempDir::new().unwrap();
        let config = create_test_config(temp.path().to_str().unwrap());
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp.path()).unwrap();

        let server = WebServer::new(&config, db, storage).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_invalid_host_is_config_error() {
        let temp = TempDir::new().unwrap();
        let mut config = create_test_config(temp.path().to_str().unwrap());
        config.server.host = "not a host".to_string();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp.path()).unwrap();

        let result = WebServer::new(&config, db, storage);
        assert!(matches!(result, Err(ArchiveError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_server_serves_health() {
        let temp = TempDir::new().unwrap();
        let config = create_test_config(temp.path().to_str().unwrap());
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp.path()).unwrap();

        let server = WebServer::new(&config, db, storage).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
    }
}
