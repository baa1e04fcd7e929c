//! HttpSender - GET requests carrying the feed id as body

use std::sync::Arc;
use std::time::Duration;

use observability::record_request;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::DestinationMetrics;
use crate::senders::pool::{run_workers, Worker};
use crate::senders::QuerySender;
use crate::Signal;

/// Sender issuing one HTTP GET per released signal
///
/// `init` builds a single client (one connection pool) and hands a clone
/// of it to each worker, so all workers of a destination reuse the same
/// connections.
pub struct HttpSender {
    name: String,
    clients: Vec<reqwest::Client>,
    metrics: Arc<DestinationMetrics>,
}

impl HttpSender {
    pub fn new(name: impl Into<String>, metrics: Arc<DestinationMetrics>) -> Self {
        Self {
            name: name.into(),
            clients: Vec::new(),
            metrics,
        }
    }

    /// Number of prepared clients (0 before `init`)
    pub fn pool_size(&self) -> usize {
        self.clients.len()
    }
}

impl QuerySender for HttpSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "http_sender_init", skip(self), fields(destination = %self.name))]
    fn init(
        &mut self,
        timeout: Option<Duration>,
        pool_size: usize,
    ) -> Result<(), DispatcherError> {
        if pool_size == 0 {
            return Err(DispatcherError::sender_init(
                &self.name,
                "pool size must be at least 1",
            ));
        }

        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(pool_size / 2);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DispatcherError::sender_init(&self.name, e.to_string()))?;

        self.clients = vec![client; pool_size];
        debug!(clients = pool_size, "HTTP clients ready");
        Ok(())
    }

    async fn send(
        self,
        cancel: CancellationToken,
        address: String,
        inbound: async_channel::Receiver<Signal>,
    ) {
        if self.clients.is_empty() {
            warn!(destination = %self.name, "HttpSender not initialized, not sending");
            return;
        }

        info!(
            destination = %self.name,
            address = %address,
            workers = self.clients.len(),
            "HttpSender started"
        );

        let address: Arc<str> = address.into();
        let destination: Arc<str> = self.name.as_str().into();
        let workers: Vec<HttpWorker> = self
            .clients
            .into_iter()
            .map(|client| HttpWorker {
                client,
                address: Arc::clone(&address),
                destination: Arc::clone(&destination),
                metrics: Arc::clone(&self.metrics),
            })
            .collect();

        run_workers(&self.name, workers, cancel, inbound).await;
        info!(destination = %self.name, "HttpSender stopped");
    }
}

struct HttpWorker {
    client: reqwest::Client,
    address: Arc<str>,
    destination: Arc<str>,
    metrics: Arc<DestinationMetrics>,
}

impl Worker for HttpWorker {
    async fn handle(&mut self, signal: Signal, cancel: &CancellationToken) {
        let request = self.client.get(&*self.address).body(signal.to_string());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            outcome = request.send() => outcome,
        };

        match outcome {
            Ok(response) => {
                let status = response.status();
                // Read the body so the connection goes back to the pool
                let body = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    body = response.bytes() => body,
                };
                if let Err(e) = body {
                    debug!(destination = %self.destination, error = %e, "response body discarded");
                }

                self.metrics.inc_sent();
                record_request(&self.destination, true);
                debug!(
                    destination = %self.destination,
                    feed = %signal,
                    status = status.as_u16(),
                    "query sent"
                );
            }
            Err(e) => {
                self.metrics.inc_failed();
                record_request(&self.destination, false);
                error!(
                    destination = %self.destination,
                    feed = %signal,
                    error = %e,
                    "query failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::time::{sleep, timeout};

    async fn spawn_hook(bodies: Arc<Mutex<Vec<String>>>) -> SocketAddr {
        let app = Router::new().route(
            "/hook",
            get(move |body: String| {
                let bodies = Arc::clone(&bodies);
                async move {
                    bodies.lock().unwrap().push(body);
                    "ok"
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_init_rejects_empty_pool() {
        let mut sender = HttpSender::new("d", Arc::new(DestinationMetrics::new()));
        let err = sender.init(None, 0).unwrap_err();
        assert!(matches!(err, DispatcherError::SenderInit { .. }));
    }

    #[test]
    fn test_init_prepares_pool() {
        let mut sender = HttpSender::new("d", Arc::new(DestinationMetrics::new()));
        sender.init(Some(Duration::from_secs(2)), 4).unwrap();
        assert_eq!(sender.pool_size(), 4);
    }

    #[tokio::test]
    async fn test_delivers_feed_id_as_body() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let addr = spawn_hook(Arc::clone(&bodies)).await;

        let metrics = Arc::new(DestinationMetrics::new());
        let mut sender = HttpSender::new("d", Arc::clone(&metrics));
        sender.init(Some(Duration::from_secs(5)), 2).unwrap();

        let (tx, rx) = async_channel::bounded(8);
        for feed in ["1", "2", "1"] {
            tx.send(feed.into()).await.unwrap();
        }
        drop(tx);

        timeout(
            Duration::from_secs(5),
            sender.send(CancellationToken::new(), format!("http://{addr}/hook"), rx),
        )
        .await
        .unwrap();

        let mut received = bodies.lock().unwrap().clone();
        received.sort();
        assert_eq!(received, ["1", "1", "2"]);
        assert_eq!(metrics.sent(), 3);
        assert_eq!(metrics.failed(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_is_counted_not_propagated() {
        // Bind and drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let metrics = Arc::new(DestinationMetrics::new());
        let mut sender = HttpSender::new("d", Arc::clone(&metrics));
        sender.init(Some(Duration::from_secs(2)), 1).unwrap();

        let (tx, rx) = async_channel::bounded(4);
        tx.send("1".into()).await.unwrap();
        tx.send("2".into()).await.unwrap();
        drop(tx);

        timeout(
            Duration::from_secs(5),
            sender.send(CancellationToken::new(), format!("http://{addr}/hook"), rx),
        )
        .await
        .unwrap();

        assert_eq!(metrics.failed(), 2);
        assert_eq!(metrics.sent(), 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_workers() {
        let metrics = Arc::new(DestinationMetrics::new());
        let mut sender = HttpSender::new("d", metrics);
        sender.init(None, 3).unwrap();

        let (_tx, rx) = async_channel::bounded::<Signal>(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(sender.send(cancel.clone(), "http://127.0.0.1:1/".into(), rx));

        sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
