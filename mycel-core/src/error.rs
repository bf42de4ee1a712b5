//! Error types for mycel-core.

use thiserror::Error;

use crate::reactive::CellId;

/// Result type for mycel-core operations.
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Errors that can occur when mutating reactive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// `set` or `update` was called on a derived cell. Derived values are only
    /// ever written by their own computation.
    #[error("write to derived value (cell {cell})")]
    DerivedWrite {
        /// The cell the write was aimed at.
        cell: CellId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_write_message_names_the_cell() {
        let err = ReactiveError::DerivedWrite {
            cell: CellId::from(7),
        };
        assert_eq!(err.to_string(), "write to derived value (cell 7)");
    }
}
