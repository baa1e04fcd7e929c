//! Destination senders
//!
//! A sender owns the worker pool of one destination. Workers share the
//! destination's outbound channel and turn every paced signal into one
//! outbound call.

mod any;
mod http;
mod log;
mod pool;

use std::sync::Arc;
use std::time::Duration;

use contracts::DestinationSpec;
use tokio_util::sync::CancellationToken;

use crate::error::DispatcherError;
use crate::metrics::DestinationMetrics;
use crate::Signal;

pub use self::any::{AnySender, ConfiguredSenderFactory};
pub use self::http::HttpSender;
pub use self::log::LogSender;

/// Outbound transport for one destination
#[trait_variant::make(QuerySender: Send)]
pub trait LocalQuerySender {
    /// Destination id, used in logs
    fn name(&self) -> &str;

    /// Prepare `pool_size` reusable clients
    fn init(&mut self, timeout: Option<Duration>, pool_size: usize)
        -> Result<(), DispatcherError>;

    /// Run the worker pool against `inbound` until cancelled or closed
    async fn send(
        self,
        cancel: CancellationToken,
        address: String,
        inbound: async_channel::Receiver<Signal>,
    );
}

/// Creates one sender per destination
pub trait SenderFactory {
    type Sender: QuerySender + 'static;

    fn new_sender(
        &self,
        destination: &DestinationSpec,
        metrics: Arc<DestinationMetrics>,
    ) -> Self::Sender;
}
