//! mod `api` provides the topmost fundamental APIs for users of the crate.
//! Construct a [`crate::runtime::GatewayRuntime`] first, build its slot
//! chain, then wrap every protected invocation in an [`EntryBuilder`] entry.

mod api;

pub use api::*;
