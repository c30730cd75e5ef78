#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Burn distributed arrays.
//!
//! An N-dimensional array is laid out across a process group: a planner picks a process grid
//! and per-dimension block sizes, every process checks that the group agrees on the request,
//! and a memory window sized for the local share is allocated collectively.

extern crate alloc;

mod config;
mod context;
mod dims;
mod element;
mod error;

pub mod array;
pub mod comm;
pub mod planner;

pub use array::*;
pub use comm::*;
pub use config::*;
pub use context::*;
pub use dims::*;
pub use element::*;
pub use error::*;
