use hashbrown::HashMap;
use spin::Mutex;

use super::{ArrayDescriptor, ArrayHandle, ArrayOps};
use crate::{Communicator, Result, StatusCode};

/// Call counters of one operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallStats {
    /// Number of calls.
    pub calls: u64,
    /// Number of calls that returned an error.
    pub failures: u64,
}

/// Wraps an [`ArrayOps`] implementation and counts the calls going through it.
///
/// Every call is forwarded unchanged and logged with its status.
#[derive(Debug)]
pub struct Instrumented<A> {
    inner: A,
    stats: Mutex<HashMap<&'static str, CallStats>>,
}

impl<A> Instrumented<A> {
    /// Wraps `inner`.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Counters of the operation named `operation` (`"create_array"` or `"destroy_array"`).
    pub fn stats(&self, operation: &str) -> CallStats {
        self.stats.lock().get(operation).copied().unwrap_or_default()
    }

    /// The wrapped implementation.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Unwraps the wrapped implementation.
    pub fn into_inner(self) -> A {
        self.inner
    }

    fn record<T>(&self, operation: &'static str, result: &Result<T>) {
        let status = StatusCode::of(result);
        {
            let mut stats = self.stats.lock();
            let entry = stats.entry(operation).or_default();
            entry.calls += 1;
            if status != StatusCode::Success {
                entry.failures += 1;
            }
        }
        log::debug!("{operation} returned {status:?}");
    }
}

impl<C: Communicator, A: ArrayOps<C>> ArrayOps<C> for Instrumented<A> {
    fn create_array<'g>(&self, descriptor: &ArrayDescriptor<'g, C>) -> Result<ArrayHandle<'g, C>> {
        let result = self.inner.create_array(descriptor);
        self.record("create_array", &result);
        result
    }

    fn destroy_array(&self, handle: ArrayHandle<'_, C>) -> Result<()> {
        let result = self.inner.destroy_array(handle);
        self.record("destroy_array", &result);
        result
    }
}
