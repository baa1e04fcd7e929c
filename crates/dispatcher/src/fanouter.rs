//! Fanouter - feed index plus the running destination topology

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{FanoutTopology, FeedId, ParamRepository};
use observability::record_trigger;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument};

use crate::destination::Destination;
use crate::error::DispatcherError;
use crate::limiter::LimiterFactory;
use crate::metrics::{DestinationMetrics, MetricsSnapshot};
use crate::senders::SenderFactory;
use crate::Signal;

/// Intake handle of one limiter, tagged with its destination
struct LimiterIntake {
    destination: String,
    tx: mpsc::Sender<Signal>,
}

/// Builder for the one [`Fanouter`] of a process
///
/// `build` consumes the builder, so a topology is materialized exactly once.
pub struct FanoutBuilder<R, SF, LF> {
    repository: R,
    senders: SF,
    limiters: LF,
}

impl<R, SF, LF> FanoutBuilder<R, SF, LF>
where
    R: ParamRepository,
    SF: SenderFactory,
    LF: LimiterFactory,
{
    pub fn new(repository: R, senders: SF, limiters: LF) -> Self {
        Self {
            repository,
            senders,
            limiters,
        }
    }

    /// Load the topology and start every sender pool and limiter
    ///
    /// Tasks run under a child of `parent`; on failure, whatever was already
    /// started is cancelled and `parent` is left untouched.
    #[instrument(name = "fanout_builder_build", skip_all)]
    pub async fn build(self, parent: &CancellationToken) -> Result<Fanouter, DispatcherError> {
        let topology = self.repository.load()?;

        let cancel = parent.child_token();
        let tracker = TaskTracker::new();

        match self.materialize(&topology, &cancel, &tracker) {
            Ok((destinations, feeds)) => {
                info!(
                    destinations = destinations.len(),
                    feeds = feeds.len(),
                    limiters = topology.binding_count(),
                    "fanout topology started"
                );
                Ok(Fanouter {
                    feeds,
                    destinations,
                    cancel,
                    tracker,
                })
            }
            Err(e) => {
                cancel.cancel();
                tracker.close();
                tracker.wait().await;
                Err(e)
            }
        }
    }

    fn materialize(
        &self,
        topology: &FanoutTopology,
        cancel: &CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<(Vec<Destination>, HashMap<FeedId, Vec<LimiterIntake>>), DispatcherError> {
        let timeout = topology.request_timeout();
        let mut destinations = Vec::with_capacity(topology.urls.len());
        let mut feeds: HashMap<FeedId, Vec<LimiterIntake>> = HashMap::new();

        for spec in &topology.urls {
            let metrics = Arc::new(DestinationMetrics::new());
            let sender = self.senders.new_sender(spec, Arc::clone(&metrics));
            let destination = Destination::spawn(
                spec,
                sender,
                Arc::clone(&metrics),
                timeout,
                topology.poolsize,
                cancel,
                tracker,
            )?;

            for binding in &spec.feeds {
                let limiter =
                    self.limiters
                        .new_limiter(&spec.id, &binding.id, Arc::clone(&metrics));
                let tx = destination.attach_limiter(limiter, binding.limit, cancel, tracker);
                feeds.entry(binding.id.clone()).or_default().push(LimiterIntake {
                    destination: spec.id.clone(),
                    tx,
                });
            }

            destinations.push(destination);
        }

        Ok((destinations, feeds))
    }
}

/// Running fanout topology
pub struct Fanouter {
    feeds: HashMap<FeedId, Vec<LimiterIntake>>,
    destinations: Vec<Destination>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Fanouter {
    /// Hand `feed_id` to every limiter bound to it, in declaration order
    ///
    /// Each handoff waits for room in the limiter's one-slot intake, so it
    /// completes at most one signal ahead of the intake loop; a stalled
    /// limiter holds up the limiters listed after it.
    /// Unknown ids fail with NotFound and touch nothing.
    #[instrument(name = "fanouter_fanout", skip(self))]
    pub async fn fanout(&self, feed_id: &str) -> Result<(), DispatcherError> {
        let Some((signal, intakes)) = self.feeds.get_key_value(feed_id) else {
            record_trigger(feed_id, false);
            debug!("unknown feed");
            return Err(DispatcherError::not_found(feed_id));
        };
        record_trigger(feed_id, true);

        for intake in intakes {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("topology cancelled, fanout abandoned");
                    return Ok(());
                }
                sent = intake.tx.send(signal.clone()) => {
                    if sent.is_err() {
                        debug!(destination = %intake.destination, "limiter intake closed, skipped");
                    }
                }
            }
        }

        Ok(())
    }

    pub fn contains_feed(&self, feed_id: &str) -> bool {
        self.feeds.contains_key(feed_id)
    }

    /// Distinct feed ids with at least one binding
    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    pub fn limiter_count(&self) -> usize {
        self.feeds.values().map(Vec::len).sum()
    }

    /// Per-destination counters, in declaration order
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.destinations
            .iter()
            .map(|d| (d.id().to_string(), d.metrics().snapshot()))
            .collect()
    }

    /// Token governing every task of this topology
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every limiter and sender pool and wait for them to exit
    #[instrument(name = "fanouter_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("fanout topology stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::ChannelLimiterFactory;
    use crate::senders::QuerySender;
    use contracts::{ContractError, DestinationSpec, FeedBinding, FeedLimit, SenderKind};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    struct StaticRepo(Result<FanoutTopology, String>);

    impl ParamRepository for StaticRepo {
        fn load(&self) -> Result<FanoutTopology, ContractError> {
            self.0
                .clone()
                .map_err(|message| ContractError::config_validation("urls", message))
        }
    }

    type Deliveries = Arc<Mutex<Vec<(String, String)>>>;

    /// Records (destination, feed) for every released signal
    struct RecordingSender {
        name: String,
        deliveries: Deliveries,
    }

    impl QuerySender for RecordingSender {
        fn name(&self) -> &str {
            &self.name
        }

        fn init(
            &mut self,
            _timeout: Option<Duration>,
            pool_size: usize,
        ) -> Result<(), DispatcherError> {
            if pool_size == 0 {
                return Err(DispatcherError::sender_init(&self.name, "empty pool"));
            }
            Ok(())
        }

        async fn send(
            self,
            cancel: CancellationToken,
            _address: String,
            inbound: async_channel::Receiver<Signal>,
        ) {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = inbound.recv() => match received {
                        Ok(signal) => self
                            .deliveries
                            .lock()
                            .unwrap()
                            .push((self.name.clone(), signal.to_string())),
                        Err(_) => break,
                    },
                }
            }
        }
    }

    struct RecordingFactory(Deliveries);

    impl SenderFactory for RecordingFactory {
        type Sender = RecordingSender;

        fn new_sender(
            &self,
            destination: &DestinationSpec,
            _metrics: Arc<DestinationMetrics>,
        ) -> RecordingSender {
            RecordingSender {
                name: destination.id.clone(),
                deliveries: Arc::clone(&self.0),
            }
        }
    }

    fn topology(destinations: usize, feed: &str, limit: u32, poolsize: usize) -> FanoutTopology {
        FanoutTopology {
            timeout: 10,
            poolsize,
            urls: (0..destinations)
                .map(|i| DestinationSpec {
                    id: i.to_string(),
                    value: format!("http://127.0.0.1:{}/", 9000 + i),
                    sender: SenderKind::Http,
                    feeds: vec![FeedBinding {
                        id: feed.into(),
                        limit: FeedLimit::new(limit),
                    }],
                })
                .collect(),
        }
    }

    async fn build(
        topology: Result<FanoutTopology, String>,
        deliveries: &Deliveries,
    ) -> Result<Fanouter, DispatcherError> {
        FanoutBuilder::new(
            StaticRepo(topology),
            RecordingFactory(Arc::clone(deliveries)),
            ChannelLimiterFactory::new(),
        )
        .build(&CancellationToken::new())
        .await
    }

    #[tokio::test]
    async fn test_unknown_feed_is_not_found() {
        let deliveries = Deliveries::default();
        let fanouter = build(Ok(topology(1, "1", 50, 2)), &deliveries).await.unwrap();

        let err = fanouter.fanout("unknown").await.unwrap_err();
        assert!(err.is_not_found());

        sleep(Duration::from_millis(100)).await;
        assert!(deliveries.lock().unwrap().is_empty());
        fanouter.shutdown().await;
    }

    #[tokio::test]
    async fn test_shared_feed_reaches_every_destination_once() {
        let deliveries = Deliveries::default();
        let fanouter = build(Ok(topology(10, "1", 50, 5)), &deliveries).await.unwrap();
        assert_eq!(fanouter.destination_count(), 10);
        assert_eq!(fanouter.limiter_count(), 10);
        assert_eq!(fanouter.feed_count(), 1);

        fanouter.fanout("1").await.unwrap();
        sleep(Duration::from_millis(200)).await;

        let mut seen: Vec<String> = deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(destination, feed)| {
                assert_eq!(feed, "1");
                destination.clone()
            })
            .collect();
        seen.sort_by_key(|d| d.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);

        let admitted: u64 = fanouter.metrics().iter().map(|(_, m)| m.admitted).sum();
        assert_eq!(admitted, 10);
        fanouter.shutdown().await;
    }

    #[tokio::test]
    async fn test_repository_failure_is_startup_error() {
        let deliveries = Deliveries::default();
        let err = build(Err("bad".to_string()), &deliveries).await.err().unwrap();
        assert!(matches!(err, DispatcherError::Startup(_)));
    }

    #[tokio::test]
    async fn test_sender_init_failure_leaves_parent_running() {
        let deliveries = Deliveries::default();
        let parent = CancellationToken::new();
        let result = FanoutBuilder::new(
            StaticRepo(Ok(topology(2, "1", 5, 0))),
            RecordingFactory(Arc::clone(&deliveries)),
            ChannelLimiterFactory::new(),
        )
        .build(&parent)
        .await;

        assert!(matches!(result, Err(DispatcherError::SenderInit { .. })));
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_joins_and_later_fanout_is_quiet() {
        let deliveries = Deliveries::default();
        let fanouter = build(Ok(topology(3, "1", 10, 2)), &deliveries).await.unwrap();

        timeout(Duration::from_secs(2), fanouter.shutdown())
            .await
            .unwrap();
        assert!(fanouter.cancellation_token().is_cancelled());

        fanouter.fanout("1").await.unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(deliveries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_topology() {
        let deliveries = Deliveries::default();
        let parent = CancellationToken::new();
        let fanouter = FanoutBuilder::new(
            StaticRepo(Ok(topology(1, "1", 10, 1))),
            RecordingFactory(Arc::clone(&deliveries)),
            ChannelLimiterFactory::new(),
        )
        .build(&parent)
        .await
        .unwrap();

        parent.cancel();
        assert!(fanouter.cancellation_token().is_cancelled());
        timeout(Duration::from_secs(2), fanouter.shutdown())
            .await
            .unwrap();
    }
}
