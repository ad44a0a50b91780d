//! Error types for the UI core

use thiserror_no_std::Error;

/// Errors returned by window, layer and stack operations.
///
/// Capacity errors are the embedded equivalent of an allocation failure: the
/// fixed-size arenas have no free slot left.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UiError {
    /// No free window slot
    #[error("No memory for window (max: {max})")]
    WindowCapacity {
        /// Maximum number of live windows
        max: usize,
    },

    /// No free layer slot
    #[error("No memory for layer (max: {max})")]
    LayerCapacity {
        /// Maximum number of live layers
        max: usize,
    },

    /// A layer already has the maximum number of children
    #[error("Layer child capacity exceeded (max: {max})")]
    ChildCapacity {
        /// Maximum children per layer
        max: usize,
    },

    /// The window stack is full
    #[error("Window stack full (max: {max})")]
    StackFull {
        /// Maximum stack depth
        max: usize,
    },

    /// Stale or unknown window handle
    #[error("Invalid window handle")]
    InvalidWindow,

    /// Stale or unknown layer handle
    #[error("Invalid layer handle")]
    InvalidLayer,

    /// Adding the layer would make it its own ancestor
    #[error("Layer cannot be added below itself")]
    Cycle,
}

/// Result type for UI operations
pub type UiResult<T> = Result<T, UiError>;
