//! Error types for peripheral operations.
//!
//! One error type covers every external collaborator of the two nodes:
//! keypad, display, actuator, sensor, alarm, credential store and tick source.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Credential store reported a failed read or write.
    #[error("Storage fault at 0x{address:03X}: {message}")]
    Storage { address: u16, message: String },

    /// Address lies outside the store.
    #[error("Address 0x{address:03X} out of range (capacity {capacity} bytes)")]
    AddressOutOfRange { address: u16, capacity: usize },

    /// Invalid data received from or sent to a device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// A second handler was registered for a timer that already has one.
    #[error("Timer {timer} already has a tick handler")]
    AlreadyRegistered { timer: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new storage fault.
    pub fn storage(address: u16, message: impl Into<String>) -> Self {
        Self::Storage {
            address,
            message: message.into(),
        }
    }

    pub fn address_out_of_range(address: u16, capacity: usize) -> Self {
        Self::AddressOutOfRange { address, capacity }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn already_registered(timer: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            timer: timer.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns `true` for faults reported by the credential store.
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::AddressOutOfRange { .. })
    }
}
