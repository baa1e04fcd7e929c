//! Per-destination sender selection

use std::sync::Arc;
use std::time::Duration;

use contracts::{DestinationSpec, SenderKind};
use tokio_util::sync::CancellationToken;

use crate::error::DispatcherError;
use crate::metrics::DestinationMetrics;
use crate::senders::{HttpSender, LogSender, QuerySender, SenderFactory};
use crate::Signal;

/// Sender selected by a destination's `sender` field
pub enum AnySender {
    Http(HttpSender),
    Log(LogSender),
}

impl QuerySender for AnySender {
    fn name(&self) -> &str {
        match self {
            Self::Http(sender) => sender.name(),
            Self::Log(sender) => sender.name(),
        }
    }

    fn init(
        &mut self,
        timeout: Option<Duration>,
        pool_size: usize,
    ) -> Result<(), DispatcherError> {
        match self {
            Self::Http(sender) => sender.init(timeout, pool_size),
            Self::Log(sender) => sender.init(timeout, pool_size),
        }
    }

    async fn send(
        self,
        cancel: CancellationToken,
        address: String,
        inbound: async_channel::Receiver<Signal>,
    ) {
        match self {
            Self::Http(sender) => sender.send(cancel, address, inbound).await,
            Self::Log(sender) => sender.send(cancel, address, inbound).await,
        }
    }
}

/// Factory honoring [`DestinationSpec::sender`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredSenderFactory;

impl ConfiguredSenderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl SenderFactory for ConfiguredSenderFactory {
    type Sender = AnySender;

    fn new_sender(
        &self,
        destination: &DestinationSpec,
        metrics: Arc<DestinationMetrics>,
    ) -> AnySender {
        match destination.sender {
            SenderKind::Http => AnySender::Http(HttpSender::new(&destination.id, metrics)),
            SenderKind::Log => AnySender::Log(LogSender::new(&destination.id, metrics)),
        }
    }
}
