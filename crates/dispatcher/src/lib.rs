//! # Dispatcher
//!
//! Rate-limited fanout engine.
//!
//! Responsible for:
//! - materializing the feed -> destination topology
//! - pacing each (destination, feed) binding through a QPS limiter
//! - driving per-destination sender pools against the paced signals
//! - shutting the whole topology down on one cancellation token

pub mod destination;
pub mod error;
pub mod fanouter;
pub mod limiter;
pub mod metrics;
pub mod senders;

/// Payload travelling from `fanout` to a sender worker: the feed id itself
pub type Signal = contracts::FeedId;

pub use destination::Destination;
pub use error::DispatcherError;
pub use fanouter::{FanoutBuilder, Fanouter};
pub use limiter::{ChannelLimiter, ChannelLimiterFactory, LimiterFactory, QpsLimiter};
pub use metrics::{DestinationMetrics, MetricsSnapshot};
pub use senders::{
    AnySender, ConfiguredSenderFactory, HttpSender, LogSender, QuerySender, SenderFactory,
};
