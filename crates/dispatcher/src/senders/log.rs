//! LogSender - logs each released signal via tracing

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::DispatcherError;
use crate::metrics::DestinationMetrics;
use crate::senders::pool::{run_workers, Worker};
use crate::senders::QuerySender;
use crate::Signal;

/// Sender that logs instead of calling the network, for dry runs
pub struct LogSender {
    name: String,
    pool_size: usize,
    metrics: Arc<DestinationMetrics>,
}

impl LogSender {
    pub fn new(name: impl Into<String>, metrics: Arc<DestinationMetrics>) -> Self {
        Self {
            name: name.into(),
            pool_size: 0,
            metrics,
        }
    }
}

impl QuerySender for LogSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(
        &mut self,
        _timeout: Option<Duration>,
        pool_size: usize,
    ) -> Result<(), DispatcherError> {
        if pool_size == 0 {
            return Err(DispatcherError::sender_init(
                &self.name,
                "pool size must be at least 1",
            ));
        }
        self.pool_size = pool_size;
        Ok(())
    }

    #[instrument(
        name = "log_sender_send",
        skip(self, cancel, inbound),
        fields(destination = %self.name)
    )]
    async fn send(
        self,
        cancel: CancellationToken,
        address: String,
        inbound: async_channel::Receiver<Signal>,
    ) {
        let destination: Arc<str> = self.name.as_str().into();
        let address: Arc<str> = address.into();
        let workers: Vec<LogWorker> = (0..self.pool_size)
            .map(|_| LogWorker {
                destination: Arc::clone(&destination),
                address: Arc::clone(&address),
                metrics: Arc::clone(&self.metrics),
            })
            .collect();

        run_workers(&self.name, workers, cancel, inbound).await;
        info!(destination = %self.name, "LogSender closed");
    }
}

struct LogWorker {
    destination: Arc<str>,
    address: Arc<str>,
    metrics: Arc<DestinationMetrics>,
}

impl Worker for LogWorker {
    async fn handle(&mut self, signal: Signal, _cancel: &CancellationToken) {
        self.metrics.inc_sent();
        info!(
            destination = %self.destination,
            address = %self.address,
            feed = %signal,
            "signal released"
        );
    }
}
