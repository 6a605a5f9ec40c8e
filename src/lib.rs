//! # Gateway hot-parameter flow control
//!
//! `gateway-param-flow` is the hot-parameter admission-control layer of an
//! API-gateway flow-control stack. For every inbound request it decides, per
//! distinguished argument value ("hot parameter"), whether to admit, reject,
//! or re-evaluate the request against a lower-priority backup rule set. The
//! counters backing those decisions live in a shared remote key-value store,
//! so every gateway process in a cluster observes the same state.
//!
//! The crate adopts the Chain-of-Responsibility pattern: requests enter
//! through a [`base::SlotChain`] holding the rule-checking
//! [`param::GatewayFlowSlot`] and the bookkeeping [`param::ParamStatSlot`].
//! Generally, there are several steps when using the crate:
//! 1. Build a [`config::ConfigEntity`] (from a YAML file, the process
//!    environment, or by hand) and validate it.
//! 2. Construct a [`runtime::GatewayRuntime`] around a rule catalog and a
//!    rule checker. With cluster mode enabled this connects to the remote
//!    counter store and fails fast on a missing address.
//! 3. Load parameter flow rules into the catalog.
//! 4. Wrap request handling in [`api::EntryBuilder`] entries, and exit every
//!    entry exactly once.
//!
//! ```rust,ignore
//! use gateway_param_flow::{api::EntryBuilder, base, param, runtime::GatewayRuntime};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(param::InMemoryRuleCatalog::default());
//! let runtime = Arc::new(GatewayRuntime::new(
//!     config_entity,
//!     catalog.clone(),
//!     Arc::new(param::RejectTokenChecker::default()),
//! )?);
//! let chain = runtime.build_slot_chain();
//!
//! let entry = EntryBuilder::new("orderSvc".into(), chain.clone())
//!     .with_args(Some(vec!["user-42".into()]))
//!     .build();
//! match entry {
//!     Ok(entry) => {
//!         // admitted; handle the request, then release the in-flight counts
//!         entry.exit();
//!     }
//!     Err(err) => {
//!         // rejected or misconfigured; see `base::BlockError` downcast
//!     }
//! }
//! ```

/// Topmost entry/exit API.
pub mod api;
/// Core implementations: the request context and slot chain, the distributed
/// counter abstractions, the parameter metric tables and their registry, and
/// the gateway admission slot.
pub mod core;
/// Adapters for different logging crates.
pub mod logging;
/// Utility functions.
pub mod utils;

// re-export preludes
pub use crate::core::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
