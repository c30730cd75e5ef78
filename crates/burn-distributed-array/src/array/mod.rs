//! Collective creation and destruction of distributed arrays.
//!
//! Creation runs the same steps on every process of the descriptor's group:
//!
//! 1. local validation of the descriptor, failing fast without talking to the group,
//! 2. a group-wide check that every process asked for the same shape and block sizes,
//! 3. rejection of element types the substrate cannot move as-is,
//! 4. planning of the process grid and block sizes,
//! 5. collective allocation of a window sized for the local share of each process,
//! 6. naming of the window.
//!
//! Steps 2 and 5 are collective: every process of the group must create its arrays in the same
//! order.

mod consistency;
mod descriptor;
mod handle;
mod instrument;

pub use descriptor::*;
pub use handle::*;
pub use instrument::*;

use alloc::format;
use log::Level;

use crate::{Communicator, Context, Error, Result, Window};

const TARGET: &str = "burn_distributed_array::alloc";

/// Creation and destruction of distributed arrays.
pub trait ArrayOps<C: Communicator> {
    /// Creates the array described by `descriptor`. Collective over the descriptor's group.
    ///
    /// A mismatch between processes fails with [`Error::InconsistentArguments`] on every process
    /// before any window is allocated.
    fn create_array<'g>(&self, descriptor: &ArrayDescriptor<'g, C>) -> Result<ArrayHandle<'g, C>>;

    /// Frees the window of `handle`. Collective over the handle's group.
    fn destroy_array(&self, handle: ArrayHandle<'_, C>) -> Result<()>;
}

impl<C: Communicator> ArrayOps<C> for Context<C> {
    fn create_array<'g>(&self, descriptor: &ArrayDescriptor<'g, C>) -> Result<ArrayHandle<'g, C>> {
        descriptor.validate()?;

        let group = descriptor.group();
        let (shape, blocks) = (descriptor.shape(), descriptor.blocks());
        let rank = group.rank();

        let element = *descriptor.element();
        consistency::check(group, shape, blocks, &element)?;

        if !group.is_predefined(&element) {
            return Err(Error::UnsupportedElementType(element.describe()));
        }

        let plan = self.config().planner().plan(shape, group.size(), blocks);
        if !plan.is_valid() {
            log::warn!(target: TARGET, "[{rank}] planning {shape} failed");
            return Err(Error::Planning {
                shape: format!("{shape}"),
                npes: group.size(),
            });
        }

        let element_size = group.type_size(&element);
        let too_large = || {
            log::warn!(target: TARGET, "[{rank}] local share of {shape} does not fit in memory");
            Error::WindowTooLarge {
                local_shape: format!("{}", plan.local_shape(shape, rank)),
                element_size,
            }
        };
        let local_len = plan.local_len(shape, rank).ok_or_else(too_large)?;
        let bytes = local_len.checked_mul(element_size).ok_or_else(too_large)?;

        let mut window = group.allocate_window(bytes, element_size).inspect_err(|err| {
            log::warn!(target: TARGET, "[{rank}] {err}");
        })?;
        if let Some(name) = descriptor.name() {
            group.set_window_name(&mut window, name)?;
        }

        let handle = ArrayHandle {
            group,
            window,
            element,
            shape: *shape,
            plan,
            name: descriptor.name().map(Into::into),
            local_len,
        };
        let level = if self.config().verbose {
            Level::Info
        } else {
            Level::Debug
        };
        log::log!(target: TARGET, level, "[{rank}] created {handle}");
        Ok(handle)
    }

    fn destroy_array(&self, handle: ArrayHandle<'_, C>) -> Result<()> {
        let rank = handle.group.rank();
        let bytes = handle.window.len();
        handle.group.free_window(handle.window)?;
        log::debug!(target: TARGET, "[{rank}] destroyed window of {bytes} bytes");
        Ok(())
    }
}
