//! The process-wide default heap.

use std::sync::{Arc, OnceLock};

use crate::config::HeapConfig;
use crate::heap::Heap;

static DEFAULT_HEAP: OnceLock<Arc<Heap>> = OnceLock::new();

/// The heap used by [`Struct::new`](crate::Struct::new), built with
/// [`HeapConfig::default`] on first access.
///
/// Concurrent first calls build exactly one heap.
pub fn default_heap() -> Arc<Heap> {
    Arc::clone(DEFAULT_HEAP.get_or_init(|| {
        Heap::new(HeapConfig::default()).expect("default heap config is valid")
    }))
}
