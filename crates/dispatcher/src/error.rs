//! Dispatcher error types

use thiserror::Error;

/// Errors that cross the dispatcher boundary
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Unknown feed id passed to `fanout`
    #[error("feed '{feed_id}' not found")]
    NotFound { feed_id: String },

    /// Parameters could not be loaded, parsed or validated
    #[error("failed to load fanout parameters: {0}")]
    Startup(#[from] contracts::ContractError),

    /// A destination sender could not be constructed
    #[error("failed to initialize sender for destination '{destination}': {message}")]
    SenderInit {
        destination: String,
        message: String,
    },
}

impl DispatcherError {
    pub fn not_found(feed_id: impl Into<String>) -> Self {
        Self::NotFound {
            feed_id: feed_id.into(),
        }
    }

    pub fn sender_init(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SenderInit {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// True for the NotFound condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
