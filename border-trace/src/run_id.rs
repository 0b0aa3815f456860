//! Run identifiers used to namespace trace files.
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

static GLOBAL_REGISTRY: RunIdRegistry = RunIdRegistry::new();

/// Pair of identifiers separating the files of concurrent runs in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunNamespace {
    /// Run id given by a [`RunIdRegistry`].
    pub run_id: usize,

    /// Id of the process which wrote the files.
    pub process_id: u32,
}

impl fmt::Display for RunNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.run_id, self.process_id)
    }
}

/// Hands out increasing run ids.
///
/// [`TraceRecorder::build()`](crate::TraceRecorder::build) uses the process-wide
/// registry returned by [`RunIdRegistry::global()`]. A separate registry can be
/// given to [`TraceRecorder::build_with_registry()`](crate::TraceRecorder::build_with_registry),
/// which keeps run ids deterministic in tests.
#[derive(Debug, Default)]
pub struct RunIdRegistry {
    next: AtomicUsize,
}

impl RunIdRegistry {
    /// Creates a registry starting at run id 0.
    pub const fn new() -> Self {
        Self {
            next: AtomicUsize::new(0),
        }
    }

    /// The registry shared by all recorders of the process.
    pub fn global() -> &'static RunIdRegistry {
        &GLOBAL_REGISTRY
    }

    /// Takes the next run id.
    pub fn next_id(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Takes the next run id and pairs it with the id of this process.
    pub fn next_namespace(&self) -> RunNamespace {
        RunNamespace {
            run_id: self.next_id(),
            process_id: std::process::id(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_registry_ids_are_distinct() {
        let registry = RunIdRegistry::new();
        let ns1 = registry.next_namespace();
        let ns2 = registry.next_namespace();
        assert_eq!(ns1.run_id, 0);
        assert_eq!(ns2.run_id, 1);
        assert_eq!(ns1.process_id, ns2.process_id);
        assert_ne!(ns1, ns2);
    }

    #[test]
    fn test_global_registry_is_shared() {
        let a = RunIdRegistry::global().next_id();
        let b = RunIdRegistry::global().next_id();
        assert!(b > a);
    }
}
