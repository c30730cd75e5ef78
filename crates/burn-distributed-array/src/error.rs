use alloc::string::String;
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Coarse outcome of a public operation, stable across every process of a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    /// The operation completed.
    Success = 0,
    /// Bad shape, mismatched arguments between processes or an unsupported element type.
    InputError = 1,
    /// The communication substrate (or the planner's scratch memory) failed.
    SubstrateError = 2,
}

impl StatusCode {
    /// Status of a finished operation.
    pub fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => StatusCode::Success,
            Err(err) => err.status(),
        }
    }
}

/// Errors raised while describing, planning, creating or destroying a distributed array.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The number of dimensions is outside `[1, MAX_DIM]`.
    #[error("array must have between 1 and {max} dimensions, got {ndim}")]
    DimensionCount {
        /// Requested number of dimensions.
        ndim: usize,
        /// Largest supported number of dimensions.
        max: usize,
    },

    /// An extent is zero or too large to be exchanged between processes.
    #[error("extent {extent} of dimension {dim} is invalid")]
    InvalidExtent {
        /// Offending dimension.
        dim: usize,
        /// Offending extent.
        extent: usize,
    },

    /// A requested block size is larger than the extent it divides.
    #[error("block size {block} of dimension {dim} exceeds its extent {extent}")]
    BlockExceedsExtent {
        /// Offending dimension.
        dim: usize,
        /// Requested block size.
        block: usize,
        /// Extent of the dimension.
        extent: usize,
    },

    /// Block sizes were given for a different number of dimensions than the shape.
    #[error("expected {expected} block sizes but got {actual}")]
    BlockCountMismatch {
        /// Number of dimensions of the shape.
        expected: usize,
        /// Number of block sizes supplied.
        actual: usize,
    },

    /// A required argument was never supplied.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// At least one process of the group supplied a different value.
    #[error("processes disagree on the {field}")]
    InconsistentArguments {
        /// Field that differs, e.g. `extent of dimension 0`.
        field: String,
    },

    /// The element type is structured or otherwise not predefined by the substrate.
    #[error("element type {0} is not a predefined type")]
    UnsupportedElementType(String),

    /// The local share does not fit in the address space.
    #[error("local share {local_shape} of {element_size}-byte elements is too large")]
    WindowTooLarge {
        /// Rendered local extents.
        local_shape: String,
        /// Size of one element in bytes.
        element_size: usize,
    },

    /// The planner could not produce a usable plan.
    #[error("no usable process grid for shape {shape} over {npes} processes")]
    Planning {
        /// Rendered array shape.
        shape: String,
        /// Number of processes in the group.
        npes: usize,
    },

    /// A collective or local call into the communication substrate failed.
    #[error("{operation} failed: {message}")]
    Substrate {
        /// Name of the substrate operation.
        operation: &'static str,
        /// Message reported by the substrate.
        message: String,
    },
}

impl Error {
    /// Maps the error onto the status taxonomy.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Substrate { .. } | Error::Planning { .. } => StatusCode::SubstrateError,
            _ => StatusCode::InputError,
        }
    }

    /// Builds a substrate error.
    pub fn substrate<M: Into<String>>(operation: &'static str, message: M) -> Self {
        Error::Substrate {
            operation,
            message: message.into(),
        }
    }
}
