// src/io/serial/reader.rs
//
// Serial link to the tester: port enumeration, the port prompt and a
// non-blocking byte source.

use serde::Serialize;
use std::io::{BufRead, Read, Write};
use std::time::Duration;

use super::utils::{is_listed_port, to_port_info};
use crate::io::{ByteSource, IoError};

/// The tester talks 8-N-1 at this rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

const READ_BUFFER_SIZE: usize = 1024;

// ============================================================================
// Types
// ============================================================================

/// Information about an available serial port
#[derive(Clone, Debug, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Product name, else manufacturer, else the bus type.
    pub fn description(&self) -> String {
        self.product
            .clone()
            .or_else(|| self.manufacturer.clone())
            .unwrap_or_else(|| self.port_type.clone())
    }
}

// ============================================================================
// Serial Source
// ============================================================================

/// Open serial port polled without blocking.
pub struct SerialSource {
    port_name: String,
    port: Box<dyn serialport::SerialPort>,
    buf: [u8; READ_BUFFER_SIZE],
}

/// Open `port_name` at `baud_rate`, 8-N-1, zero read timeout.
pub fn open_serial(port_name: &str, baud_rate: u32) -> Result<SerialSource, IoError> {
    let port = serialport::new(port_name, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(Duration::from_millis(0))
        .open()
        .map_err(|e| match e.kind() {
            serialport::ErrorKind::NoDevice => IoError::not_found(port_name),
            _ => IoError::connection(port_name, e.to_string()),
        })?;

    tlog!("[serial] Opened {} at {} baud (8-N-1)", port_name, baud_rate);

    Ok(SerialSource {
        port_name: port_name.to_string(),
        port,
        buf: [0u8; READ_BUFFER_SIZE],
    })
}

impl ByteSource for SerialSource {
    fn name(&self) -> &str {
        &self.port_name
    }

    fn poll_bytes(&mut self) -> Result<Option<Vec<u8>>, IoError> {
        let waiting = self
            .port
            .bytes_to_read()
            .map_err(|e| IoError::read(&self.port_name, e.to_string()))?;
        if waiting == 0 {
            return Ok(Some(Vec::new()));
        }

        let want = (waiting as usize).min(self.buf.len());
        match self.port.read(&mut self.buf[..want]) {
            Ok(n) => Ok(Some(self.buf[..n].to_vec())),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Some(Vec::new())),
            Err(e) => Err(IoError::read(&self.port_name, e.to_string())),
        }
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// List available serial ports
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    Ok(ports
        .into_iter()
        .filter(|p| is_listed_port(&p.port_name))
        .map(to_port_info)
        .collect())
}

/// Print the available ports and read a port name from `input`.
pub fn prompt_for_port<R: BufRead, W: Write>(
    ports: &[SerialPortInfo],
    mut input: R,
    mut output: W,
) -> Result<String, String> {
    if ports.is_empty() {
        return Err("No serial ports available".to_string());
    }

    let write_err = |e: std::io::Error| format!("Failed to write prompt: {}", e);
    writeln!(
        output,
        "Enter a name of a serial port used for communication with the device:"
    )
    .map_err(write_err)?;
    for port in ports {
        writeln!(output, "{} ({})", port.port_name, port.description()).map_err(write_err)?;
    }
    write!(output, "Name: ").map_err(write_err)?;
    output.flush().map_err(write_err)?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| format!("Failed to read port name: {}", e))?;
    let name = line.trim();
    if name.is_empty() {
        return Err("No port selected".to_string());
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn port(name: &str, product: Option<&str>) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: "USB".to_string(),
            manufacturer: Some("Silicon Labs".to_string()),
            product: product.map(str::to_string),
            serial_number: None,
            vid: Some(0x10C4),
            pid: Some(0xEA60),
        }
    }

    #[test]
    fn test_description_fallbacks() {
        assert_eq!(port("COM3", Some("CP2102")).description(), "CP2102");
        assert_eq!(port("COM3", None).description(), "Silicon Labs");
    }

    #[test]
    fn test_prompt_lists_ports_and_reads_name() {
        let ports = vec![port("/dev/ttyUSB0", Some("CP2102")), port("/dev/ttyS0", None)];
        let mut output = Vec::new();
        let name = prompt_for_port(&ports, Cursor::new("/dev/ttyUSB0\n"), &mut output).unwrap();
        assert_eq!(name, "/dev/ttyUSB0");

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("/dev/ttyUSB0 (CP2102)\n"));
        assert!(shown.contains("/dev/ttyS0 (Silicon Labs)\n"));
        assert!(shown.ends_with("Name: "));
    }

    #[test]
    fn test_prompt_without_ports() {
        let result = prompt_for_port(&[], Cursor::new("COM1\n"), Vec::new());
        assert_eq!(result, Err("No serial ports available".to_string()));
    }

    #[test]
    fn test_prompt_empty_answer() {
        let ports = vec![port("COM3", None)];
        let result = prompt_for_port(&ports, Cursor::new("\n"), Vec::new());
        assert_eq!(result, Err("No port selected".to_string()));
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = open_serial("/dev/kbtinfo-no-such-port", DEFAULT_BAUD_RATE);
        assert!(result.is_err());
    }
}
