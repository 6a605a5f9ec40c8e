//! `cluster` mod provides the client abstractions over the shared remote
//! key-value store that keeps per-parameter counters consistent across every
//! gateway process.

pub mod counter;
pub mod map;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use counter::*;
pub use map::*;
pub use memory::*;
pub use redis_store::*;
pub use store::*;
