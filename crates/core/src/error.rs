//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("grid is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("slot {index} is out of range (capacity {capacity})")]
    SlotOutOfRange { index: usize, capacity: usize },

    #[error("slot {index} is empty")]
    EmptySlot { index: usize },

    #[error("slot {index} holds an upload that has not been confirmed")]
    SlotBusy { index: usize },

    #[error("cannot move slot {from} to {to}: both positions must hold confirmed items")]
    IllegalReorder { from: usize, to: usize },

    #[error("grid capacity must be positive")]
    InvalidCapacity,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
