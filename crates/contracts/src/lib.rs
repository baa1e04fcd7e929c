//! # Contracts
//!
//! Interface contracts shared by every fanouter crate: the fanout topology,
//! process configuration, the parameter repository seam and the error type.
//! Business crates depend on this crate, never the other way around.

mod app;
mod error;
mod feed_id;
mod repository;
mod topology;

pub use app::*;
pub use error::*;
pub use feed_id::FeedId;
pub use repository::ParamRepository;
pub use topology::*;
