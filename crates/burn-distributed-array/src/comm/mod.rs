//! Interface to the communication substrate that distributed arrays are built on.
//!
//! The substrate provides the process group: rank and size queries, a group-wide maximum
//! reduction, duplication of the group, and collective allocation of memory windows whose
//! size may differ from one process to the next.

#[cfg(feature = "std")]
mod local;

#[cfg(feature = "std")]
pub use local::*;

use crate::{ElementType, Result};

/// Memory registered with the substrate so that any member of the group may access it.
pub trait Window {
    /// Size of the local part of the window in bytes.
    fn len(&self) -> usize;

    /// Whether the local part of the window is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Diagnostic name attached to the window, if any.
    fn name(&self) -> Option<&str>;
}

/// A process group able to run the collective operations distributed arrays need.
///
/// Collective methods must be called by every process of the group, in the same order, or the
/// group stalls.
pub trait Communicator: Sized {
    /// Window type allocated by this substrate.
    type Window: Window;

    /// Rank of the calling process, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Replaces `values` with their element-wise maximum over the group. Collective.
    fn all_reduce_max(&self, values: &mut [i64]) -> Result<()>;

    /// Duplicates the group for internal use. Collective.
    fn duplicate(&self) -> Result<Self>;

    /// Releases a group obtained with [`Communicator::duplicate`]. Collective.
    fn release(self) -> Result<()>;

    /// Allocates a window of `bytes` local bytes addressed in units of `disp_unit`. Collective,
    /// although `bytes` may differ between processes.
    fn allocate_window(&self, bytes: usize, disp_unit: usize) -> Result<Self::Window>;

    /// Frees a window. Collective.
    fn free_window(&self, window: Self::Window) -> Result<()>;

    /// Attaches a diagnostic name to a window.
    fn set_window_name(&self, window: &mut Self::Window, name: &str) -> Result<()>;

    /// Size in bytes of one element of `element`.
    fn type_size(&self, element: &ElementType) -> usize {
        element.size()
    }

    /// Whether `element` is one of the substrate's predefined types.
    fn is_predefined(&self, element: &ElementType) -> bool {
        element.is_predefined()
    }
}
