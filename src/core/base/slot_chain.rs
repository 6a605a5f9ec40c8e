use super::{BlockError, ContextPtr, EntryContext, TokenResult, SLOT_INIT};
use crate::logging;
use crate::utils::AsAny;
use std::any::Any;
use std::sync::Arc;

/// trait `PartialOrd` is not object safe.
/// SlotChain will sort all its slots by ascending sort value in each bucket
/// (RuleCheckSlot bucket and StatSlot bucket)
pub trait BaseSlot: Any + AsAny + Sync + Send {
    /// order returns the sort value of the slot.
    fn order(&self) -> u32 {
        0
    }
}

/// RuleCheckSlot is rule based checking strategy.
/// All checking rules must implement this interface.
pub trait RuleCheckSlot: BaseSlot {
    // check function do some validation
    // It can break off the slot pipeline
    // Each TokenResult will return check result
    // The upper logic will control pipeline according to SlotResult.
    fn check(&self, ctx: &mut EntryContext) -> TokenResult {
        ctx.result().clone()
    }
}

/// StatSlot is responsible for counting all custom biz metrics.
/// StatSlot would not handle any panic, and pass up all panic to slot chain
pub trait StatSlot: BaseSlot {
    /// on_entry_pass function will be invoked when RuleCheckSlots execute pass.
    /// StatSlots will do some statistic logic, such as counter bookkeeping.
    fn on_entry_pass(&self, _ctx: &EntryContext) {}
    /// on_entry_blocked function will be invoked when RuleCheckSlots fail to execute.
    /// blockError introduce the block detail
    fn on_entry_blocked(&self, _ctx: &EntryContext, _block_error: BlockError) {}
    /// on_completed function will be invoked when chain exits.
    /// The semantics of on_completed is the entry passed and completed.
    /// Note: blocked entry will not call this function
    fn on_completed(&self, _ctx: &mut EntryContext) {}
}

/// SlotChain holds all system slots and customized slots.
/// SlotChain supports plug-in slots developed by developers.
pub struct SlotChain {
    /// rule_checks is in ascending order by RuleCheckSlot.order() value.
    pub(self) rule_checks: Vec<Arc<dyn RuleCheckSlot>>,
    /// stats is in ascending order by StatSlot.order() value.
    pub(self) stats: Vec<Arc<dyn StatSlot>>,
}

impl Default for SlotChain {
    fn default() -> Self {
        Self {
            rule_checks: Vec::with_capacity(SLOT_INIT),
            stats: Vec::with_capacity(SLOT_INIT),
        }
    }
}

impl SlotChain {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn exit(&self, ctx_ptr: ContextPtr) {
        let mut ctx = ctx_ptr.write().unwrap();
        if ctx.entry().is_none() {
            logging::error!("GatewayEntry is nil in SlotChain.exit()");
            return;
        }
        if ctx.is_blocked() {
            return;
        }
        // The on_completed is called only when entry passed
        for s in &self.stats {
            s.on_completed(&mut ctx);
        }
    }

    /// add_rule_check_slot adds the RuleCheckSlot to the RuleCheckSlot list of the SlotChain.
    /// All RuleCheckSlot in the list will be sorted according to RuleCheckSlot.order() in ascending order.
    /// add_rule_check_slot is non-thread safe,
    /// In concurrency scenario, add_rule_check_slot must be guarded by SlotChain.RWMutex#Lock
    pub fn add_rule_check_slot(&mut self, s: Arc<dyn RuleCheckSlot>) {
        self.rule_checks.push(s);
        self.rule_checks.sort_unstable_by_key(|a| a.order());
    }

    /// add_stat_slot adds the StatSlot to the StatSlot list of the SlotChain.
    /// All StatSlot in the list will be sorted according to StatSlot.order() in ascending order.
    /// add_stat_slot is non-thread safe,
    /// In concurrency scenario, add_stat_slot must be guarded by SlotChain.RWMutex#Lock
    pub fn add_stat_slot(&mut self, s: Arc<dyn StatSlot>) {
        self.stats.push(s);
        self.stats.sort_unstable_by_key(|a| a.order());
    }

    /// The entrance of slot chain
    /// Return the TokenResult
    pub fn entry(&self, ctx_ptr: ContextPtr) -> TokenResult {
        let mut ctx = ctx_ptr.write().unwrap();

        // execute rule based checking slot
        ctx.reset_result_to_pass();
        for s in &self.rule_checks {
            let res = s.check(&mut ctx);
            // check slot result
            if res.is_blocked() {
                ctx.set_result(res);
                break;
            }
        }

        // execute statistic slot
        for s in &self.stats {
            // indicate the result of rule based checking slot.
            if ctx.result().is_pass() {
                s.on_entry_pass(&ctx)
            } else if ctx.result().is_blocked() {
                // The block error should not be none.
                s.on_entry_blocked(&ctx, ctx.result().block_err().unwrap())
            }
        }
        ctx.result().clone()
    }
}

#[cfg(test)]
pub(crate) use test::aggregation::{MockRuleCheckSlot, MockStatSlot};
