// src/io/error.rs
//
// Typed transport errors. Boundary functions that return `Result<T, String>`
// convert with `?` through the `From` impl below.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// The transport could not be opened.
    Connection { device: String, message: String },
    /// Reading from an open transport failed.
    Read { device: String, message: String },
    /// A named device does not exist.
    NotFound { device: String },
    /// A capture file could not be loaded or parsed.
    Capture { path: String, message: String },
}

impl IoError {
    pub fn connection(device: &str, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn read(device: &str, message: impl Into<String>) -> Self {
        IoError::Read {
            device: device.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(device: &str) -> Self {
        IoError::NotFound {
            device: device.to_string(),
        }
    }

    pub fn capture(path: &str, message: impl Into<String>) -> Self {
        IoError::Capture {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Device or file the error refers to.
    pub fn device(&self) -> &str {
        match self {
            IoError::Connection { device, .. }
            | IoError::Read { device, .. }
            | IoError::NotFound { device } => device,
            IoError::Capture { path, .. } => path,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IoError::Connection { device, message } => {
                write!(f, "Failed to open {}: {}", device, message)
            }
            IoError::Read { device, message } => write!(f, "Read error on {}: {}", device, message),
            IoError::NotFound { device } => write!(f, "Device not found: {}", device),
            IoError::Capture { path, message } => {
                write!(f, "Failed to load capture {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for String {
    fn from(e: IoError) -> String {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = IoError::connection("/dev/ttyUSB0", "permission denied");
        assert_eq!(e.to_string(), "Failed to open /dev/ttyUSB0: permission denied");
        assert_eq!(e.device(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_into_string() {
        fn boundary() -> Result<(), String> {
            Err(IoError::not_found("COM7"))?;
            Ok(())
        }
        assert_eq!(boundary(), Err("Device not found: COM7".to_string()));
    }
}
