//! FanoutTopology - Parameter Repository output
//!
//! Declarative description of every destination and the feeds bound to it.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::FeedId;

/// Complete fanout parameters, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutTopology {
    /// Per-request deadline in seconds (0 = no deadline)
    #[serde(default)]
    pub timeout: u64,

    /// Workers (and pooled clients) per destination
    pub poolsize: usize,

    /// Destinations in declaration order
    #[serde(default)]
    pub urls: Vec<DestinationSpec>,
}

impl FanoutTopology {
    /// Deadline applied to every outbound request
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    /// Total number of feed bindings, i.e. rate limiters to spawn
    pub fn binding_count(&self) -> usize {
        self.urls.iter().map(|d| d.feeds.len()).sum()
    }

    /// Feed id -> destination ids, in declaration order
    ///
    /// Feeds bound to no destination are absent.
    pub fn feed_index(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut index: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for destination in &self.urls {
            for feed in &destination.feeds {
                index
                    .entry(feed.id.as_str())
                    .or_default()
                    .push(destination.id.as_str());
            }
        }
        index
    }
}

/// One outbound target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSpec {
    /// Unique identifier (used for logs/metrics)
    pub id: String,

    /// Target address (e.g. "http://10.0.0.5:8080/hook")
    pub value: String,

    /// Transport used for this destination
    #[serde(default)]
    pub sender: SenderKind,

    /// Feeds delivered to this destination
    #[serde(default)]
    pub feeds: Vec<FeedBinding>,
}

/// Sender implementation selected per destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    /// HTTP GET carrying the feed id as body
    #[default]
    Http,
    /// Log each release instead of calling the network
    Log,
}

/// Feed bound to a destination with its QPS ceiling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedBinding {
    pub id: FeedId,
    pub limit: FeedLimit,
}

/// Shortest tick the pacing loop accepts
const MIN_PACING_PERIOD: Duration = Duration::from_nanos(1);

/// Queries-per-second ceiling of one feed binding
///
/// Accepts either an integer or a decimal string (`"50"`) on input and is
/// written back as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedLimit(u32);

impl FeedLimit {
    pub fn new(limit: u32) -> Self {
        Self(limit)
    }

    /// Limit as configured
    pub fn get(self) -> u32 {
        self.0
    }

    /// Limit used for scheduling and buffer sizing (0 counts as 1)
    pub fn effective(self) -> u32 {
        self.0.max(1)
    }

    /// Tick period of the pacing loop
    ///
    /// Never zero: limits above 10^9 QPS all tick every nanosecond.
    pub fn pacing_period(self) -> Duration {
        (Duration::from_secs(1) / self.effective()).max(MIN_PACING_PERIOD)
    }

    /// Admission buffer capacity
    pub fn buffer_capacity(self) -> usize {
        self.effective() as usize
    }
}

impl From<u32> for FeedLimit {
    fn from(limit: u32) -> Self {
        Self(limit)
    }
}

impl fmt::Display for FeedLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for FeedLimit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FeedLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FeedLimitVisitor)
    }
}

struct FeedLimitVisitor;

impl Visitor<'_> for FeedLimitVisitor {
    type Value = FeedLimit;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or an integer string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FeedLimit, E> {
        u32::try_from(v)
            .map(FeedLimit)
            .map_err(|_| E::custom(format!("limit {v} is out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FeedLimit, E> {
        u32::try_from(v)
            .map(FeedLimit)
            .map_err(|_| E::custom(format!("limit {v} is out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FeedLimit, E> {
        v.trim()
            .parse::<u32>()
            .map(FeedLimit)
            .map_err(|e| E::custom(format!("invalid limit '{v}': {e}")))
    }
}
