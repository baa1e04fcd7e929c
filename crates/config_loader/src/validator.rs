//! Topology validation
//!
//! Rules:
//! - poolsize > 0
//! - destination ids are non-empty and unique
//! - destination addresses are non-empty; http destinations use http(s)
//! - feed ids are non-empty

use std::collections::HashSet;

use contracts::{ContractError, FanoutTopology, SenderKind};

/// Validate a topology, returning the first error found
pub fn validate(topology: &FanoutTopology) -> Result<(), ContractError> {
    validate_pool_size(topology)?;
    validate_destinations(topology)?;
    validate_feeds(topology)?;
    Ok(())
}

fn validate_pool_size(topology: &FanoutTopology) -> Result<(), ContractError> {
    if topology.poolsize == 0 {
        return Err(ContractError::config_validation(
            "poolsize",
            "poolsize must be > 0",
        ));
    }
    Ok(())
}

fn validate_destinations(topology: &FanoutTopology) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, destination) in topology.urls.iter().enumerate() {
        if destination.id.is_empty() {
            return Err(ContractError::config_validation(
                format!("urls[{idx}].id"),
                "destination id cannot be empty",
            ));
        }
        if !seen.insert(destination.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("urls[id={}]", destination.id),
                "duplicate destination id",
            ));
        }
        if destination.value.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("urls[{}].value", destination.id),
                "destination address cannot be empty",
            ));
        }
        if destination.sender == SenderKind::Http && !is_http_address(&destination.value) {
            return Err(ContractError::config_validation(
                format!("urls[{}].value", destination.id),
                format!(
                    "address '{}' must start with http:// or https://",
                    destination.value
                ),
            ));
        }
    }
    Ok(())
}

fn validate_feeds(topology: &FanoutTopology) -> Result<(), ContractError> {
    for destination in &topology.urls {
        for (idx, feed) in destination.feeds.iter().enumerate() {
            if feed.id.is_empty() {
                return Err(ContractError::config_validation(
                    format!("urls[{}].feeds[{idx}].id", destination.id),
                    "feed id cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

fn is_http_address(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Collect non-fatal issues worth reporting
pub fn collect_warnings(topology: &FanoutTopology) -> Vec<String> {
    let mut warnings = Vec::new();

    if topology.urls.is_empty() {
        warnings.push("No destinations configured - every feed id is unknown".to_string());
    }

    if topology.timeout == 0 {
        warnings.push("timeout is 0 - outbound requests have no deadline".to_string());
    }

    for destination in &topology.urls {
        if destination.feeds.is_empty() {
            warnings.push(format!(
                "Destination '{}' has no feeds and will never receive requests",
                destination.id
            ));
        }

        let mut seen = HashSet::new();
        for feed in &destination.feeds {
            if !seen.insert(feed.id.as_str()) {
                warnings.push(format!(
                    "Feed '{}' is bound to destination '{}' more than once",
                    feed.id, destination.id
                ));
            }
            if feed.limit.get() == 0 {
                warnings.push(format!(
                    "Feed '{}' on destination '{}' has limit 0 - paced as 1 QPS",
                    feed.id, destination.id
                ));
            }
        }
    }

    warnings
}
