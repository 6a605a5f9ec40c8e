use std::any::Any;
use std::sync::Arc;

pub mod time;

pub use self::time::*;

pub fn is_blank(path: &str) -> bool {
    path.trim().is_empty()
}

/// Trait for upcast/downcast
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &(dyn Any + Send + Sync);
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

// impl the required AsAny trait for structs
impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
