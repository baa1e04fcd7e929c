//! QPS limiters
//!
//! A limiter sits between `Fanouter::fanout` and one destination's outbound
//! channel. It owns the intake channel for one (destination, feed) binding.

mod channel;

use std::sync::Arc;

use contracts::{FeedId, FeedLimit};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::metrics::DestinationMetrics;
use crate::Signal;

pub use self::channel::{ChannelLimiter, ChannelLimiterFactory};

/// Rate shaping strategy
#[trait_variant::make(QpsLimiter: Send)]
pub trait LocalQpsLimiter {
    /// Wire the limiter to its destination, returning the intake handle
    fn init(&mut self, outbound: async_channel::Sender<Signal>) -> mpsc::Sender<Signal>;

    /// Shape traffic until `cancel` fires
    async fn run(self, cancel: CancellationToken, limit: FeedLimit);
}

/// Creates one limiter per feed binding
pub trait LimiterFactory {
    type Limiter: QpsLimiter + 'static;

    fn new_limiter(
        &self,
        destination: &str,
        feed: &FeedId,
        metrics: Arc<DestinationMetrics>,
    ) -> Self::Limiter;
}
