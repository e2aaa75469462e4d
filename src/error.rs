use crate::bus::BusType;
use thiserror::Error;

/// Everything that can go wrong while talking to a storage device.
///
/// None of these escape the public surface as a hard failure: enumeration
/// degrades the affected device and `update()` reports `false`.
#[derive(Debug, Error)]
pub enum SmartError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot open {path}: {source}")]
    Open {
        path:   String,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} ioctl failed: {source}")]
    Ioctl {
        op:     &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} rejected by device (status {status:#x})")]
    CommandRejected { op: &'static str, status: u32 },

    #[error("I/O Kit call {op} failed ({code:#010x})")]
    IoKit { op: &'static str, code: i32 },

    #[error("device does not expose the {0} interface")]
    InterfaceUnavailable(&'static str),

    #[error("SMART is not supported on {0:?} devices by this backend")]
    Unsupported(BusType),

    #[error("short response: expected {expected} bytes, got {got}")]
    ShortBuffer { expected: usize, got: usize },
}

impl SmartError {
    pub fn ioctl(op: &'static str) -> Self {
        SmartError::Ioctl { op, source: std::io::Error::last_os_error() }
    }
}

pub type Result<T> = std::result::Result<T, SmartError>;
