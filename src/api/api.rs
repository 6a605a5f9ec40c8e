use crate::base::{
    EntryContext, EntryGuard, EntryInput, GatewayEntry, ParamsList, ResourceType, ResourceWrapper,
    SlotChain, TokenResult, TrafficType,
};
use crate::utils::format_time_nanos_curr;
use crate::{Error, Result};
use std::sync::{Arc, RwLock};

/// EntryBuilder is the basic API of the crate.
///
/// `build()` runs the slot chain for one request. On admission it returns an
/// [`EntryGuard`] that must be exited exactly once; on rejection it returns
/// an error downcastable to [`crate::base::BlockError`], and a fatal
/// configuration fault surfaces as-is, distinguishable from a rejection.
pub struct EntryBuilder {
    resource_name: String,
    resource_type: ResourceType,
    traffic_type: TrafficType,
    batch_count: u32,
    slot_chain: Arc<SlotChain>,
    args: Option<ParamsList>,
}

impl EntryBuilder {
    pub fn new(resource_name: String, slot_chain: Arc<SlotChain>) -> Self {
        EntryBuilder {
            resource_name,
            resource_type: ResourceType::default(),
            traffic_type: TrafficType::default(),
            batch_count: 1,
            slot_chain,
            args: None,
        }
    }

    /// `build()` would consume EntryBuilder
    pub fn build(self) -> Result<EntryGuard> {
        let mut ctx = EntryContext::new();

        ctx.set_resource(ResourceWrapper::new(
            self.resource_name,
            self.resource_type,
            self.traffic_type,
        ));

        let mut input = EntryInput::new(self.batch_count);
        if let Some(args) = self.args {
            input.set_args(args);
        }
        ctx.set_input(input);

        let ctx = Arc::new(RwLock::new(ctx));
        let entry = Arc::new(RwLock::new(GatewayEntry::new(
            Arc::clone(&ctx),
            Arc::clone(&self.slot_chain),
        )));
        ctx.write().unwrap().set_entry(Arc::downgrade(&entry));

        let r = self.slot_chain.entry(Arc::clone(&ctx));
        match r {
            TokenResult::Blocked(block_err) => {
                entry.read().unwrap().exit();
                // a configuration fault recorded by the slots outranks the
                // generic blocked result
                if let Some(err) = ctx.write().unwrap().take_err() {
                    return Err(err);
                }
                Err(Error::new(block_err))
            }
            TokenResult::Pass => Ok(EntryGuard::new(entry)),
        }
    }

    pub fn with_resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    pub fn with_traffic_type(mut self, traffic_type: TrafficType) -> Self {
        self.traffic_type = traffic_type;
        self
    }

    pub fn with_batch_count(mut self, batch_count: u32) -> Self {
        self.batch_count = batch_count;
        self
    }

    pub fn with_args(mut self, args: Option<ParamsList>) -> Self {
        self.args = args;
        self
    }
}

impl Default for EntryBuilder {
    fn default() -> Self {
        EntryBuilder::new(format_time_nanos_curr(), Arc::new(SlotChain::new()))
    }
}
