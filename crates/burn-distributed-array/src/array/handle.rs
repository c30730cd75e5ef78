use alloc::string::String;
use core::fmt;

use crate::planner::DistributionPlan;
use crate::{ArrayShape, BlockSizes, Communicator, ElementType, ProcessGrid, Window};

/// A live distributed array: this process's window plus the layout it was created with.
///
/// Handles cannot be cloned; they are given back to [`ArrayOps::destroy_array`](super::ArrayOps)
/// to free the window.
pub struct ArrayHandle<'g, C: Communicator> {
    pub(crate) group: &'g C,
    pub(crate) window: C::Window,
    pub(crate) element: ElementType,
    pub(crate) shape: ArrayShape,
    pub(crate) plan: DistributionPlan,
    pub(crate) name: Option<String>,
    pub(crate) local_len: usize,
}

impl<'g, C: Communicator> ArrayHandle<'g, C> {
    /// Process group the array is distributed over.
    pub fn group(&self) -> &'g C {
        self.group
    }

    /// Type of the elements.
    pub fn element_type(&self) -> &ElementType {
        &self.element
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Global extents.
    pub fn dims(&self) -> &ArrayShape {
        &self.shape
    }

    /// Resolved block sizes.
    pub fn blocks(&self) -> &BlockSizes {
        self.plan.blocks()
    }

    /// Process grid the array is laid out on.
    pub fn grid(&self) -> &ProcessGrid {
        self.plan.grid()
    }

    /// Full distribution plan.
    pub fn plan(&self) -> &DistributionPlan {
        &self.plan
    }

    /// Diagnostic name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of elements owned by this process.
    pub fn local_len(&self) -> usize {
        self.local_len
    }

    /// Memory window holding the local elements.
    pub fn window(&self) -> &C::Window {
        &self.window
    }

    /// Mutable access to the memory window.
    pub fn window_mut(&mut self) -> &mut C::Window {
        &mut self.window
    }
}

impl<C: Communicator> fmt::Debug for ArrayHandle<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayHandle")
            .field("element", &self.element)
            .field("shape", &self.shape)
            .field("plan", &self.plan)
            .field("name", &self.name)
            .field("local_len", &self.local_len)
            .field("window_bytes", &self.window.len())
            .finish()
    }
}

impl<C: Communicator> fmt::Display for ArrayHandle<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} of {}, {}, {} local elements",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.shape,
            self.element,
            self.plan,
            self.local_len
        )
    }
}
