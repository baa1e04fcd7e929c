//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::FanoutTopology;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Topology info for JSON output
#[derive(Serialize)]
struct TopologyInfo {
    timeout_secs: u64,
    poolsize: usize,
    destinations: Vec<DestinationInfo>,
    feed_index: BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct DestinationInfo {
    id: String,
    address: String,
    sender: String,
    feeds: Vec<FeedInfo>,
}

#[derive(Serialize)]
struct FeedInfo {
    id: String,
    limit: u32,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(params = %args.params.display(), "Loading fanout parameters");

    if !args.params.exists() {
        anyhow::bail!("Parameter file not found: {}", args.params.display());
    }

    let topology = config_loader::ConfigLoader::load_topology_from_path(&args.params)
        .with_context(|| format!("Failed to load params from {}", args.params.display()))?;

    if args.json {
        let info = build_topology_info(&topology);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize topology info")?;
        println!("{}", json);
    } else {
        print_topology_info(&topology);
    }

    Ok(())
}

fn build_topology_info(topology: &FanoutTopology) -> TopologyInfo {
    let destinations = topology
        .urls
        .iter()
        .map(|d| DestinationInfo {
            id: d.id.clone(),
            address: d.value.clone(),
            sender: format!("{:?}", d.sender).to_lowercase(),
            feeds: d
                .feeds
                .iter()
                .map(|f| FeedInfo {
                    id: f.id.to_string(),
                    limit: f.limit.get(),
                })
                .collect(),
        })
        .collect();

    let feed_index = topology
        .feed_index()
        .into_iter()
        .map(|(feed, destinations)| {
            (
                feed.to_string(),
                destinations.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

    TopologyInfo {
        timeout_secs: topology.timeout,
        poolsize: topology.poolsize,
        destinations,
        feed_index,
    }
}

fn print_topology_info(topology: &FanoutTopology) {
    println!("=== Fanout Topology ===\n");
    match topology.request_timeout() {
        Some(timeout) => println!("Request timeout: {}s", timeout.as_secs()),
        None => println!("Request timeout: none"),
    }
    println!("Pool size: {}", topology.poolsize);

    println!("\nDestinations ({}):", topology.urls.len());
    for destination in &topology.urls {
        println!(
            "  - {} -> {} ({:?})",
            destination.id, destination.value, destination.sender
        );
        for feed in &destination.feeds {
            println!("      feed {} @ {} qps", feed.id, feed.limit);
        }
    }

    let index = topology.feed_index();
    println!("\nFeeds ({}):", index.len());
    for (feed, destinations) in index {
        println!("  - {} -> [{}]", feed, destinations.join(", "));
    }

    println!();
}
