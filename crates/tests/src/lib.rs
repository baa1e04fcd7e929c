//! # Integration Tests
//!
//! End-to-end fanout scenarios against real local HTTP destinations.
//!
//! Covers:
//! - delivery below the rate limit (no drops)
//! - capping above the rate limit
//! - unknown feeds
//! - one trigger reaching many destinations
//! - shutdown

#[cfg(test)]
mod contract_tests {
    use contracts::FeedLimit;
    use std::time::Duration;

    #[test]
    fn test_zero_limit_paces_like_one() {
        let limit = FeedLimit::new(0);
        assert_eq!(limit.pacing_period(), Duration::from_secs(1));
        assert_eq!(limit.buffer_capacity(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::routing::get;
    use axum::Router;
    use config_loader::{FileParamRepo, MemoryParamRepo};
    use contracts::ParamRepository;
    use dispatcher::{ChannelLimiterFactory, ConfiguredSenderFactory, FanoutBuilder, Fanouter};
    use tokio::net::TcpListener;
    use tokio::time::{interval, sleep, Instant};
    use tokio_util::sync::CancellationToken;

    const FEED: &str = "1";

    /// Local destination counting requests whose body is `feed`
    async fn spawn_destination(feed: &'static str) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/",
            get(move |body: String| {
                let counter = Arc::clone(&counter);
                async move {
                    if body == feed {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    "ok"
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), hits)
    }

    async fn start<R: ParamRepository>(repository: R) -> Fanouter {
        FanoutBuilder::new(
            repository,
            ConfiguredSenderFactory::new(),
            ChannelLimiterFactory::new(),
        )
        .build(&CancellationToken::new())
        .await
        .unwrap()
    }

    /// Call `fanout(FEED)` at `rate` per second for `duration`
    async fn drive(fanouter: &Fanouter, rate: u32, duration: Duration) -> u32 {
        let mut ticker = interval(Duration::from_secs(1) / rate);
        let deadline = Instant::now() + duration;
        let mut triggers = 0;
        loop {
            ticker.tick().await;
            if Instant::now() >= deadline {
                break;
            }
            fanouter.fanout(FEED).await.unwrap();
            triggers += 1;
        }
        triggers
    }

    /// Below the limit every trigger is delivered exactly once
    #[tokio::test]
    async fn test_low_rate_delivers_every_trigger() {
        let (url, hits) = spawn_destination(FEED).await;
        let fanouter = start(MemoryParamRepo::single_feed(&[url], FEED, 50)).await;

        let triggers = drive(&fanouter, 5, Duration::from_secs(2)).await;
        sleep(Duration::from_millis(300)).await;

        assert!(triggers >= 9, "triggers {triggers}");
        assert_eq!(hits.load(Ordering::SeqCst), triggers);

        let metrics = fanouter.metrics()[0].1;
        assert_eq!(metrics.dropped, 0);
        assert_eq!(metrics.sent, u64::from(triggers));
        fanouter.shutdown().await;
    }

    /// Above the limit delivery is capped near limit * duration
    #[tokio::test]
    async fn test_high_rate_is_capped_at_limit() {
        const LIMIT: u32 = 50;
        let (url, hits) = spawn_destination(FEED).await;
        let fanouter = Arc::new(start(MemoryParamRepo::single_feed(&[url], FEED, LIMIT)).await);

        let sampler_hits = Arc::clone(&hits);
        let sampler = tokio::spawn(async move {
            let mut samples = Vec::new();
            for _ in 0..2 {
                sleep(Duration::from_secs(1)).await;
                samples.push(sampler_hits.load(Ordering::SeqCst));
            }
            samples
        });

        let triggers = drive(&fanouter, 100, Duration::from_secs(2)).await;
        let delivered = hits.load(Ordering::SeqCst);
        fanouter.shutdown().await;
        let samples = sampler.await.unwrap();

        assert!(triggers > 150, "triggers {triggers}");
        assert!(delivered <= 2 * LIMIT + 2, "delivered {delivered}");
        assert!(delivered >= 2 * LIMIT - 20, "delivered {delivered}");

        let mut previous = 0;
        for sample in samples {
            assert!(sample - previous <= LIMIT + 2, "per-second delta {}", sample - previous);
            previous = sample;
        }

        let metrics = fanouter.metrics()[0].1;
        assert!(metrics.dropped > 0);
        // The last handoff may still sit in the intake when shutdown lands
        let seen = metrics.admitted + metrics.dropped;
        assert!(seen + 1 >= u64::from(triggers) && seen <= u64::from(triggers));
    }

    /// Unknown feeds fail and produce no traffic
    #[tokio::test]
    async fn test_unknown_feed_is_not_found() {
        let (url, hits) = spawn_destination(FEED).await;
        let fanouter = start(MemoryParamRepo::single_feed(&[url], FEED, 50)).await;

        let err = fanouter.fanout("unknown").await.unwrap_err();
        assert!(err.is_not_found());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        fanouter.shutdown().await;
    }

    /// One trigger reaches each of ten destinations exactly once
    #[tokio::test]
    async fn test_shared_feed_fans_out_to_all_destinations() {
        let mut urls = Vec::new();
        let mut counters = Vec::new();
        for _ in 0..10 {
            let (url, hits) = spawn_destination(FEED).await;
            urls.push(url);
            counters.push(hits);
        }
        let fanouter = start(MemoryParamRepo::single_feed(&urls, FEED, 50)).await;

        fanouter.fanout(FEED).await.unwrap();
        sleep(Duration::from_millis(300)).await;

        for (index, hits) in counters.iter().enumerate() {
            assert_eq!(hits.load(Ordering::SeqCst), 1, "destination {index}");
        }
        let admitted: u64 = fanouter.metrics().iter().map(|(_, m)| m.admitted).sum();
        assert_eq!(admitted, 10);
        fanouter.shutdown().await;
    }

    /// No traffic after shutdown completes, and later triggers are ignored
    #[tokio::test]
    async fn test_shutdown_halts_delivery() {
        let (url, hits) = spawn_destination(FEED).await;
        let fanouter = start(MemoryParamRepo::single_feed(&[url], FEED, 10)).await;

        // Fill the admission buffer well beyond what can be released
        for _ in 0..30 {
            fanouter.fanout(FEED).await.unwrap();
        }
        sleep(Duration::from_millis(250)).await;

        tokio::time::timeout(Duration::from_secs(2), fanouter.shutdown())
            .await
            .unwrap();
        let at_shutdown = hits.load(Ordering::SeqCst);

        fanouter.fanout(FEED).await.unwrap();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), at_shutdown);
        assert!(at_shutdown < 10, "delivered {at_shutdown}");
    }

    /// Parameters read from a file drive real delivery
    #[tokio::test]
    async fn test_file_repository_end_to_end() {
        let (url, hits) = spawn_destination("7").await;
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{ "timeout": 5, "poolsize": 2,
                 "urls": [ {{ "id": "local", "value": "{url}",
                             "feeds": [ {{ "id": "7", "limit": "20" }} ] }} ] }}"#
        )
        .unwrap();

        let fanouter = start(FileParamRepo::new(file.path())).await;
        assert!(fanouter.contains_feed("7"));
        assert!(!fanouter.contains_feed(FEED));

        fanouter.fanout("7").await.unwrap();
        fanouter.fanout("7").await.unwrap();
        sleep(Duration::from_millis(300)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        fanouter.shutdown().await;
    }
}
