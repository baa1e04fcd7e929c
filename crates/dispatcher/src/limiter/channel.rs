//! ChannelLimiter - bounded admission buffer drained by a ticker

use std::sync::Arc;

use contracts::{FeedId, FeedLimit};
use observability::{record_signal_admitted, record_signal_dropped};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::limiter::{LimiterFactory, QpsLimiter};
use crate::metrics::DestinationMetrics;
use crate::Signal;

/// Intake depth. One slot instead of a rendezvous: a handoff completes once
/// the signal is queued, at most one signal ahead of the intake loop.
const INTAKE_CAPACITY: usize = 1;

/// Limiter releasing at most one signal per `1s / limit` tick
///
/// Two loops run concurrently inside [`QpsLimiter::run`]:
/// - intake: moves each incoming signal into the admission buffer once,
///   dropping it when the buffer (capacity = limit) is full
/// - pacing: on every tick, forwards at most one buffered signal
pub struct ChannelLimiter {
    destination: String,
    feed: FeedId,
    intake_tx: mpsc::Sender<Signal>,
    intake_rx: mpsc::Receiver<Signal>,
    outbound: Option<async_channel::Sender<Signal>>,
    metrics: Arc<DestinationMetrics>,
}

impl ChannelLimiter {
    pub fn new(
        destination: impl Into<String>,
        feed: FeedId,
        metrics: Arc<DestinationMetrics>,
    ) -> Self {
        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_CAPACITY);
        Self {
            destination: destination.into(),
            feed,
            intake_tx,
            intake_rx,
            outbound: None,
            metrics,
        }
    }
}

impl QpsLimiter for ChannelLimiter {
    fn init(&mut self, outbound: async_channel::Sender<Signal>) -> mpsc::Sender<Signal> {
        self.outbound = Some(outbound);
        self.intake_tx.clone()
    }

    #[instrument(
        name = "channel_limiter_run",
        skip(self, cancel, limit),
        fields(destination = %self.destination, feed = %self.feed, limit = limit.get())
    )]
    async fn run(self, cancel: CancellationToken, limit: FeedLimit) {
        let Self {
            destination,
            feed,
            intake_tx,
            mut intake_rx,
            outbound,
            metrics,
        } = self;
        // Only handles given out by `init` may keep the intake open
        drop(intake_tx);

        let Some(outbound) = outbound else {
            warn!("limiter started without an outbound channel, not running");
            return;
        };

        let (buffer_tx, mut buffer_rx) = mpsc::channel::<Signal>(limit.buffer_capacity());
        debug!(
            capacity = limit.buffer_capacity(),
            period_us = limit.pacing_period().as_micros() as u64,
            "limiter started"
        );

        let intake_cancel = cancel.clone();
        let intake_metrics = Arc::clone(&metrics);
        let intake_loop = async move {
            loop {
                let signal = tokio::select! {
                    biased;
                    _ = intake_cancel.cancelled() => break,
                    received = intake_rx.recv() => match received {
                        Some(signal) => signal,
                        None => break,
                    },
                };

                match buffer_tx.try_send(signal) {
                    Ok(()) => {
                        intake_metrics.inc_admitted();
                        record_signal_admitted(&destination, &feed);
                    }
                    Err(TrySendError::Full(_)) => {
                        intake_metrics.inc_dropped();
                        record_signal_dropped(&destination, &feed);
                        debug!("admission buffer full, signal dropped");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            // Dropping buffer_tx lets the pacing loop finish what is buffered
            // when the intake closes without cancellation.
        };

        let pacing_loop = async move {
            let mut ticker = interval(limit.pacing_period());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let signal = match buffer_rx.try_recv() {
                    Ok(signal) => signal,
                    Err(TryRecvError::Empty) => continue,
                    Err(TryRecvError::Disconnected) => break,
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = outbound.send(signal) => {
                        if sent.is_err() {
                            debug!("outbound channel closed");
                            break;
                        }
                        metrics.inc_released();
                    }
                }
            }
        };

        tokio::join!(intake_loop, pacing_loop);
        debug!("limiter stopped");
    }
}

/// Factory for [`ChannelLimiter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelLimiterFactory;

impl ChannelLimiterFactory {
    pub fn new() -> Self {
        Self
    }
}

impl LimiterFactory for ChannelLimiterFactory {
    type Limiter = ChannelLimiter;

    fn new_limiter(
        &self,
        destination: &str,
        feed: &FeedId,
        metrics: Arc<DestinationMetrics>,
    ) -> ChannelLimiter {
        ChannelLimiter::new(destination, feed.clone(), metrics)
    }
}
