use crate::{
    base::{BaseSlot, BlockError, EntryContext, StatSlot},
    logging,
    runtime::GatewayRuntime,
};
use std::sync::Arc;

const STAT_SLOT_ORDER: u32 = 4000;

/// ParamStatSlot records the in-flight thread counts for all tracked
/// argument positions. Counts go up when an entry passes and down exactly
/// once on the matching exit; blocked entries touch no counters.
pub struct ParamStatSlot {
    runtime: Arc<GatewayRuntime>,
}

impl ParamStatSlot {
    pub fn new(runtime: Arc<GatewayRuntime>) -> Self {
        ParamStatSlot { runtime }
    }
}

impl BaseSlot for ParamStatSlot {
    fn order(&self) -> u32 {
        STAT_SLOT_ORDER
    }
}

impl StatSlot for ParamStatSlot {
    fn on_entry_pass(&self, ctx: &EntryContext) {
        let res = ctx.resource().name();
        let args = match ctx.input().args() {
            Some(args) => args,
            None => return,
        };
        match self.runtime.registry().metric_for(res) {
            Some(metric) => metric.add_thread_count(args),
            None => {
                logging::debug!(
                    "[ParamStatSlot on_entry_pass] Resource has no parameter metric, resource: {}",
                    res
                );
            }
        }
    }

    fn on_entry_blocked(&self, _ctx: &EntryContext, _block_error: BlockError) {}

    fn on_completed(&self, ctx: &mut EntryContext) {
        let res = ctx.resource().name();
        let args = match ctx.input().args() {
            Some(args) => args,
            None => return,
        };
        match self.runtime.registry().metric_for(res) {
            Some(metric) => metric.decrease_thread_count(args),
            None => {
                logging::debug!(
                    "[ParamStatSlot on_completed] Resource has no parameter metric, resource: {}",
                    res
                );
            }
        }
    }
}
