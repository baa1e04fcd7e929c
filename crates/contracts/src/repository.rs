//! ParamRepository trait - source of the fanout topology

use crate::{ContractError, FanoutTopology};

/// Supplies the declarative topology the dispatcher materializes.
///
/// Called once at startup; any error is fatal.
pub trait ParamRepository: Send + Sync {
    fn load(&self) -> Result<FanoutTopology, ContractError>;
}

impl<R: ParamRepository + ?Sized> ParamRepository for Box<R> {
    fn load(&self) -> Result<FanoutTopology, ContractError> {
        (**self).load()
    }
}
