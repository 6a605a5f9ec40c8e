use super::{ContextPtr, SlotChain};
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

// ctx and entry are mutually referenced, and they may cross thread
// boundaries, therefore, we need Arc (for Sync and Send) and RwLock
// (for inner mutability)
type EntryStrongPtrInner = Arc<RwLock<GatewayEntry>>;
pub struct EntryGuard(EntryStrongPtrInner);
pub type EntryWeakPtr = Weak<RwLock<GatewayEntry>>;

impl fmt::Debug for EntryGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryGuard").finish_non_exhaustive()
    }
}

/// GatewayEntry binds one admitted request to the slot chain it traversed.
/// Every entry must be exited exactly once so the in-flight bookkeeping of
/// the stat slots runs on the matching exit path.
pub struct GatewayEntry {
    ctx: ContextPtr,
    /// each entry traverses a slot chain,
    /// global slot chain is wrapped by Arc, thus here we use Arc
    sc: Arc<SlotChain>,
}

impl GatewayEntry {
    pub fn new(ctx: ContextPtr, sc: Arc<SlotChain>) -> Self {
        GatewayEntry { ctx, sc }
    }

    pub fn context(&self) -> &ContextPtr {
        &self.ctx
    }

    pub fn exit(&self) {
        self.sc.exit(self.ctx.clone());
    }
}

impl EntryGuard {
    pub fn new(entry: EntryStrongPtrInner) -> EntryGuard {
        EntryGuard(entry)
    }

    pub fn context(&self) -> ContextPtr {
        let entry = self.0.read().unwrap();
        entry.context().clone()
    }

    pub fn exit(&self) {
        self.0.read().unwrap().exit();
    }
}
