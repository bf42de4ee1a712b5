//! Reactive Primitives
//!
//! This module implements the reactive engine: cells, computations, and
//! batched updates, coordinated by a [`Runtime`].
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] is a container for a value. When it is read while a
//! computation is running, it subscribes that computation. When it is
//! written, every subscriber is re-run. A derived cell gets its value from a
//! function of other cells and is recomputed whenever those change.
//!
//! ## Computations
//!
//! A [`Computation`] is a side-effecting closure. It runs once when created
//! and again every time a cell it read during its last run changes.
//! Dependencies are rebuilt from scratch on every run, so a computation that
//! stops reading a cell also stops reacting to it.
//!
//! ## Batches
//!
//! [`Runtime::batch`] defers re-runs until a block of writes is done, so each
//! affected computation runs once no matter how many of its inputs changed.
//!
//! # Implementation Notes
//!
//! Cells hold only weak, generation-stamped subscriptions to computations. A
//! computation lives as long as someone holds its handle; the reactive graph
//! itself never keeps anything alive.
//!
//! Everything is single-threaded. Runtimes, cells and computations are
//! `!Send`, and a thread-local default runtime backs the free functions in
//! this module.

mod batch;
mod cell;
mod computation;
mod context;
mod global;
mod runtime;
mod subscriber;

pub use cell::{Cell, CellId, CellKind};
pub use computation::Computation;
pub use global::{
    batch, create_cell, create_computation, create_derived, default_runtime, untracked,
};
pub use runtime::Runtime;
pub use subscriber::ComputationId;
