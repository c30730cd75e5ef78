use alloc::sync::Arc;

use crate::{ArrayConfig, Communicator, Result};

/// Library state shared by every array created through it.
///
/// Initialization duplicates the caller's group for internal use. Clones share that group; each
/// [`Context::finalize`] gives up one reference and the last one releases the group.
#[derive(Debug)]
pub struct Context<C: Communicator> {
    inner: Arc<Inner<C>>,
}

#[derive(Debug)]
struct Inner<C> {
    comm: C,
    config: ArrayConfig,
}

impl<C: Communicator> Context<C> {
    /// Initializes the library over `comm`. Collective on `comm`.
    pub fn initialize(comm: &C, config: ArrayConfig) -> Result<Self> {
        let comm = comm.duplicate()?;
        log::debug!(
            "[{}] initialized over {} processes with {:?}",
            comm.rank(),
            comm.size(),
            config
        );
        Ok(Self {
            inner: Arc::new(Inner { comm, config }),
        })
    }

    /// Gives up this reference; the last one releases the internal group. Collective for the
    /// last reference.
    pub fn finalize(self) -> Result<()> {
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => {
                let rank = inner.comm.rank();
                let released = inner.comm.release();
                log::debug!("[{rank}] finalized");
                released
            }
            Err(_still_shared) => Ok(()),
        }
    }

    /// Rank of the calling process in the internal group.
    pub fn rank(&self) -> usize {
        self.inner.comm.rank()
    }

    /// Number of processes in the internal group.
    pub fn size(&self) -> usize {
        self.inner.comm.size()
    }

    /// Settings used to create arrays.
    pub fn config(&self) -> &ArrayConfig {
        &self.inner.config
    }

    /// Number of live references to the context.
    pub fn references(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<C: Communicator> Clone for Context<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::LocalGroup;

    #[test]
    fn test_clones_share_one_internal_group() {
        let results = LocalGroup::run(LocalGroup::new(2), |group| {
            let context = Context::initialize(&group, ArrayConfig::default()).unwrap();
            let clone = context.clone();
            let shared = context.references();

            clone.finalize().unwrap();
            let after_first = context.references();
            context.finalize().unwrap();
            (shared, after_first)
        });

        assert_eq!(results, [(2, 1), (2, 1)]);
    }

    #[test]
    fn test_context_reports_the_group() {
        let results = LocalGroup::run(LocalGroup::new(3), |group| {
            let config = ArrayConfig::default().with_verbose(true);
            let context = Context::initialize(&group, config).unwrap();
            let summary = (context.rank(), context.size(), context.config().verbose);
            context.finalize().unwrap();
            summary
        });

        assert_eq!(results, [(0, 3, true), (1, 3, true), (2, 3, true)]);
    }
}
