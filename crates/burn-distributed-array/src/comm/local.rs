use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use std::sync::{Barrier, Mutex, MutexGuard};

use super::{Communicator, Window};
use crate::{Error, Result};

/// A process group whose processes are threads of the current program.
///
/// [`LocalGroup::new`] returns one endpoint per process; each endpoint is meant to be moved to
/// its own thread. Collective operations meet on a shared barrier, so every endpoint must take
/// part in them in the same order.
#[derive(Debug)]
pub struct LocalGroup {
    rank: usize,
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    size: usize,
    barrier: Barrier,
    reduction: Mutex<Option<Vec<i64>>>,
    duplicate: Mutex<Option<Arc<Shared>>>,
    live_windows: Mutex<HashMap<usize, usize>>,
    failing_allocation: Option<usize>,
}

impl Shared {
    fn new(size: usize, failing_allocation: Option<usize>) -> Self {
        Self {
            size,
            barrier: Barrier::new(size),
            reduction: Mutex::new(None),
            duplicate: Mutex::new(None),
            live_windows: Mutex::new(HashMap::new()),
            failing_allocation,
        }
    }
}

impl LocalGroup {
    /// Endpoints of a new group of `size` processes, ordered by rank.
    pub fn new(size: usize) -> Vec<LocalGroup> {
        Self::endpoints(Arc::new(Shared::new(size, None)))
    }

    /// Like [`LocalGroup::new`], but window allocation fails on `rank`.
    pub fn with_failing_allocation(size: usize, rank: usize) -> Vec<LocalGroup> {
        Self::endpoints(Arc::new(Shared::new(size, Some(rank))))
    }

    fn endpoints(shared: Arc<Shared>) -> Vec<LocalGroup> {
        (0..shared.size)
            .map(|rank| LocalGroup {
                rank,
                shared: shared.clone(),
            })
            .collect()
    }

    /// Runs `process` on one thread per endpoint and returns the results ordered by rank.
    pub fn run<R, F>(endpoints: Vec<LocalGroup>, process: F) -> Vec<R>
    where
        R: Send,
        F: Fn(LocalGroup) -> R + Sync,
    {
        let process = &process;
        std::thread::scope(|scope| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|group| scope.spawn(move || process(group)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// Number of windows currently allocated by all processes of the group.
    pub fn live_windows(&self) -> Result<usize> {
        Ok(lock(&self.shared.live_windows, "live_windows")?.values().sum())
    }

    fn track_window(&self, operation: &'static str, allocated: bool) -> Result<()> {
        let mut live = lock(&self.shared.live_windows, operation)?;
        let count = live.entry(self.rank).or_default();
        if allocated {
            *count += 1;
        } else {
            *count = count.saturating_sub(1);
        }
        Ok(())
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, operation: &'static str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| Error::substrate(operation, "a process panicked holding the group state"))
}

impl Communicator for LocalGroup {
    type Window = LocalWindow;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_reduce_max(&self, values: &mut [i64]) -> Result<()> {
        const OPERATION: &str = "all_reduce_max";
        let mut mismatch = false;
        {
            let mut slot = lock(&self.shared.reduction, OPERATION)?;
            match slot.as_mut() {
                None => *slot = Some(values.to_vec()),
                Some(acc) => {
                    mismatch = acc.len() != values.len();
                    for (max, &value) in acc.iter_mut().zip(values.iter()) {
                        *max = (*max).max(value);
                    }
                }
            }
        }
        self.shared.barrier.wait();

        if let Some(acc) = lock(&self.shared.reduction, OPERATION)?.as_ref() {
            mismatch |= acc.len() != values.len();
            for (value, &max) in values.iter_mut().zip(acc.iter()) {
                *value = max;
            }
        }
        if self.shared.barrier.wait().is_leader() {
            *lock(&self.shared.reduction, OPERATION)? = None;
        }
        self.shared.barrier.wait();

        if mismatch {
            return Err(Error::substrate(
                OPERATION,
                "processes reduced buffers of different lengths",
            ));
        }
        Ok(())
    }

    fn duplicate(&self) -> Result<Self> {
        const OPERATION: &str = "duplicate";
        if self.shared.barrier.wait().is_leader() {
            *lock(&self.shared.duplicate, OPERATION)? =
                Some(Arc::new(Shared::new(self.shared.size, self.shared.failing_allocation)));
        }
        self.shared.barrier.wait();

        let shared = lock(&self.shared.duplicate, OPERATION)?.clone();
        if self.shared.barrier.wait().is_leader() {
            *lock(&self.shared.duplicate, OPERATION)? = None;
        }
        self.shared.barrier.wait();

        let shared =
            shared.ok_or_else(|| Error::substrate(OPERATION, "no duplicate was published"))?;
        Ok(LocalGroup {
            rank: self.rank,
            shared,
        })
    }

    fn release(self) -> Result<()> {
        self.shared.barrier.wait();
        Ok(())
    }

    fn allocate_window(&self, bytes: usize, disp_unit: usize) -> Result<LocalWindow> {
        const OPERATION: &str = "allocate_window";
        self.shared.barrier.wait();

        if self.shared.failing_allocation == Some(self.rank) {
            return Err(Error::substrate(
                OPERATION,
                format!("allocation of {bytes} bytes refused on rank {}", self.rank),
            ));
        }
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|err| Error::substrate(OPERATION, err.to_string()))?;
        data.resize(bytes, 0u8);
        self.track_window(OPERATION, true)?;

        log::trace!(
            target: "burn_distributed_array::window",
            "[{}] allocated window of {bytes} bytes",
            self.rank
        );
        Ok(LocalWindow {
            data,
            disp_unit,
            name: None,
        })
    }

    fn free_window(&self, window: LocalWindow) -> Result<()> {
        self.shared.barrier.wait();
        let tracked = self.track_window("free_window", false);
        self.shared.barrier.wait();
        tracked?;
        log::trace!(
            target: "burn_distributed_array::window",
            "[{}] freed window of {} bytes",
            self.rank,
            window.len()
        );
        Ok(())
    }

    fn set_window_name(&self, window: &mut LocalWindow, name: &str) -> Result<()> {
        window.name = Some(name.to_string());
        Ok(())
    }
}

/// Window of a [`LocalGroup`]: a zero-initialized buffer owned by one process.
#[derive(Debug)]
pub struct LocalWindow {
    data: Vec<u8>,
    disp_unit: usize,
    name: Option<String>,
}

impl LocalWindow {
    /// Local bytes of the window.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable local bytes of the window.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Unit in which displacements into the window are expressed.
    pub fn disp_unit(&self) -> usize {
        self.disp_unit
    }
}

impl Window for LocalWindow {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_and_sizes() {
        let ranks = LocalGroup::run(LocalGroup::new(3), |group| (group.rank(), group.size()));

        assert_eq!(ranks, [(0, 3), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_reduction_takes_the_maximum_of_every_slot() {
        let results = LocalGroup::run(LocalGroup::new(4), |group| {
            let rank = group.rank() as i64;
            let mut values = [rank, -rank, 7];
            group.all_reduce_max(&mut values).unwrap();
            values
        });

        assert!(results.iter().all(|values| *values == [3, 0, 7]));
    }

    #[test]
    fn test_consecutive_reductions_do_not_mix() {
        let results = LocalGroup::run(LocalGroup::new(3), |group| {
            (0..20)
                .map(|round| {
                    let mut values = [round * 10 + group.rank() as i64];
                    group.all_reduce_max(&mut values).unwrap();
                    values[0]
                })
                .collect::<Vec<_>>()
        });

        let expected: Vec<i64> = (0..20).map(|round| round * 10 + 2).collect();
        assert!(results.iter().all(|rounds| *rounds == expected));
    }

    #[test]
    fn test_duplicate_is_an_independent_group() {
        let results = LocalGroup::run(LocalGroup::new(2), |group| {
            let dup = group.duplicate().unwrap();
            let mut values = [dup.rank() as i64 + 1];
            dup.all_reduce_max(&mut values).unwrap();
            let shared = Arc::ptr_eq(&group.shared, &dup.shared);
            let rank = dup.rank();
            dup.release().unwrap();
            (rank, values[0], shared)
        });

        assert_eq!(results, [(0, 2, false), (1, 2, false)]);
    }

    #[test]
    fn test_windows_may_differ_in_size() {
        let results = LocalGroup::run(LocalGroup::new(3), |group| {
            let mut window = group.allocate_window(group.rank() * 8, 8).unwrap();
            group.set_window_name(&mut window, "halo").unwrap();
            let summary = (window.len(), window.name().map(String::from), window.disp_unit());
            group.free_window(window).unwrap();
            (summary, group.live_windows().unwrap())
        });

        assert_eq!(results[0].0, (0, Some("halo".into()), 8));
        assert_eq!(results[2].0, (16, Some("halo".into()), 8));
        assert!(results.iter().all(|(_, live)| *live == 0));
    }

    #[test]
    fn test_failing_allocation_is_reported_on_its_rank_only() {
        let results = LocalGroup::run(LocalGroup::with_failing_allocation(2, 1), |group| {
            group.allocate_window(64, 1).map(|window| window.len())
        });

        assert_eq!(results[0], Ok(64));
        assert!(matches!(results[1], Err(Error::Substrate { operation: "allocate_window", .. })));
    }
}
