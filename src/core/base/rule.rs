use crate::Result;
use std::fmt;

/// The seam between the admission slots and concrete rule entities.
/// Rules are value objects: equality and hashing follow their configured
/// content, so they are usable as counter-table keys.
pub trait FlowRule: fmt::Debug + fmt::Display + Send + Sync {
    fn resource_name(&self) -> String;

    fn is_valid(&self) -> Result<()> {
        Ok(())
    }
}
