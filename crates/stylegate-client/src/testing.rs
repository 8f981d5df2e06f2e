//! In-process HTTP servers for tests
//!
//! Fake inference apps and the gateway router are both served this way, on
//! an ephemeral loopback port, for as long as the [`TestServer`] lives.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::Result;

const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A router served on `127.0.0.1:<ephemeral>`, stopped on drop
pub struct TestServer {
    pub addr: SocketAddr,
    /// Plain HTTP client for driving the server
    pub http: reqwest::Client,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` with a 5s client timeout
    ///
    /// ```ignore
    /// let server = TestServer::start(router).await?;
    /// let response = server.http.get(server.url("/config")).send().await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with_timeout(router, DEFAULT_TEST_TIMEOUT).await
    }

    /// Serve `router`; `timeout` applies to requests made through `http`
    pub async fn start_with_timeout(router: axum::Router, timeout: Duration) -> Result<Self> {
        // The socket is listening once bound, so early requests just queue
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                stopped.await.ok();
            });
            if let Err(e) = serve.await {
                tracing::debug!(error = %e, "Test server exited with error");
            }
        });

        Ok(Self {
            addr,
            http,
            stop: Some(stop),
            task: Some(task),
        })
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Absolute URL for `path`, with or without a leading slash
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    /// Stop accepting connections and wait for the serve task to finish
    pub async fn shutdown(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            task.await.ok();
        }
    }

    fn signal_stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send(()).ok();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_url_joins_paths() {
        let server = TestServer::start(axum::Router::new()).await.unwrap();
        assert_eq!(
            server.url("/config"),
            format!("http://{}/config", server.addr)
        );
        assert_eq!(server.url("config"), server.url("/config"));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_serves_router_until_shutdown() {
        let router = axum::Router::new().route("/ping", get(|| async { "pong" }));
        let server = TestServer::start(router).await.unwrap();

        let body = server
            .http
            .get(server.url("/ping"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");

        let http = server.http.clone();
        let url = server.url("/ping");
        server.shutdown().await;
        assert!(http.get(url).send().await.is_err());
    }
}
