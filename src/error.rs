//! Error types and handling for Seurat

/// Result type alias for Seurat operations
pub type Result<T> = std::result::Result<T, SeuratError>;

/// Comprehensive error types for the Seurat readout data-path
#[derive(Debug, thiserror::Error)]
pub enum SeuratError {
    /// I/O related errors (mmap, mlock, thread spawn, etc.)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Memory allocation or mapping failures
    #[error("Memory error: {message}")]
    Memory { message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A required ring channel could not be found
    #[error("Ring not found: {name}")]
    RingNotFound { name: String },

    /// Ring channel is full
    #[error("Ring full: {name}")]
    RingFull { name: String },

    /// Insufficient space for an allocation or a data region
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Alignment requirements not met
    #[error("Alignment error: address {address:#x} not aligned to {alignment}")]
    Alignment { address: usize, alignment: usize },

    /// Core topology or geometry configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Operation requires a connected core
    #[error("Core not connected: {core}")]
    NotConnected { core: String },
}

impl SeuratError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a ring not found error
    pub fn ring_not_found(name: impl Into<String>) -> Self {
        Self::RingNotFound { name: name.into() }
    }

    /// Create a ring full error
    pub fn ring_full(name: impl Into<String>) -> Self {
        Self::RingFull { name: name.into() }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create an alignment error
    pub fn alignment(address: usize, alignment: usize) -> Self {
        Self::Alignment { address, alignment }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not connected error
    pub fn not_connected(core: impl Into<String>) -> Self {
        Self::NotConnected { core: core.into() }
    }
}
