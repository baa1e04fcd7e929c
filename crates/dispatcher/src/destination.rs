//! Destination - one outbound target with its running sender pool

use std::sync::Arc;
use std::time::Duration;

use contracts::{DestinationSpec, FeedLimit};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument};

use crate::error::DispatcherError;
use crate::limiter::QpsLimiter;
use crate::metrics::DestinationMetrics;
use crate::senders::QuerySender;
use crate::Signal;

/// Handle to a destination whose sender is running
///
/// Holds the producer side of the outbound channel; limiters attached
/// through [`Destination::attach_limiter`] receive clones of it.
pub struct Destination {
    id: String,
    address: String,
    outbound: async_channel::Sender<Signal>,
    metrics: Arc<DestinationMetrics>,
}

impl Destination {
    /// Initialize `sender` and start its worker pool on `tracker`
    #[instrument(
        name = "destination_spawn",
        skip_all,
        fields(destination = %spec.id, address = %spec.value, pool_size = pool_size)
    )]
    pub fn spawn<S: QuerySender + 'static>(
        spec: &DestinationSpec,
        mut sender: S,
        metrics: Arc<DestinationMetrics>,
        timeout: Option<Duration>,
        pool_size: usize,
        cancel: &CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<Self, DispatcherError> {
        sender.init(timeout, pool_size)?;

        let (outbound, inbound) = async_channel::bounded(pool_size.max(1));
        tracker.spawn(sender.send(cancel.clone(), spec.value.clone(), inbound));
        debug!("sender pool started");

        Ok(Self {
            id: spec.id.clone(),
            address: spec.value.clone(),
            outbound,
            metrics,
        })
    }

    /// Wire `limiter` to this destination and start it on `tracker`
    ///
    /// Returns the limiter's intake handle.
    pub fn attach_limiter<L: QpsLimiter + 'static>(
        &self,
        mut limiter: L,
        limit: FeedLimit,
        cancel: &CancellationToken,
        tracker: &TaskTracker,
    ) -> mpsc::Sender<Signal> {
        let intake = limiter.init(self.outbound.clone());
        tracker.spawn(limiter.run(cancel.clone(), limit));
        intake
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn metrics(&self) -> &Arc<DestinationMetrics> {
        &self.metrics
    }
}
