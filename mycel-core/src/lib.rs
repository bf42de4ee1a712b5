//! Mycel Core
//!
//! This crate provides a minimal fine-grained reactive state engine. It
//! implements:
//!
//! - Reactive cells (source and derived)
//! - Computations with automatic, per-run dependency tracking
//! - Batched updates that coalesce re-runs
//!
//! It is the dependency-tracking kernel a UI or data-flow layer can build on
//! instead of managing subscriptions by hand.
//!
//! # Architecture
//!
//! - `reactive`: cells, computations, batching and the runtime that
//!   schedules them
//! - `error`: the error type returned by cell writes
//!
//! # Example
//!
//! ```rust
//! use mycel_core::reactive::Runtime;
//!
//! let rt = Runtime::new();
//!
//! // Create a cell
//! let count = rt.cell(0);
//!
//! // Create a derived value
//! let doubled = rt.derived({
//!     let count = count.clone();
//!     move || count.read() * 2
//! });
//!
//! // Create a computation
//! let _effect = rt.computation({
//!     let (count, doubled) = (count.clone(), doubled.clone());
//!     move || println!("Count: {}, Doubled: {}", count.read(), doubled.read())
//! });
//!
//! // Update the cell
//! count.set(5).unwrap();
//! // Computation runs again, prints: "Count: 5, Doubled: 10"
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
