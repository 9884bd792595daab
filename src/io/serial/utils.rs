// src/io/serial/utils.rs
//
// Conversions between serialport crate types and our port descriptions.

use serialport::{SerialPortInfo as SpPortInfo, SerialPortType};

use super::reader::SerialPortInfo;

/// Short label for a port's bus type.
pub fn port_type_label(port_type: &SerialPortType) -> &'static str {
    match port_type {
        SerialPortType::UsbPort(_) => "USB",
        SerialPortType::BluetoothPort => "Bluetooth",
        SerialPortType::PciPort => "PCI",
        SerialPortType::Unknown => "Unknown",
    }
}

/// Whether a port should be offered to the user.
///
/// On macOS only /dev/cu.* (calling unit) devices are listed; the /dev/tty.*
/// twins block on open waiting for carrier detect.
pub fn is_listed_port(port_name: &str) -> bool {
    if cfg!(target_os = "macos") {
        !port_name.starts_with("/dev/tty.")
    } else {
        true
    }
}

pub fn to_port_info(port: SpPortInfo) -> SerialPortInfo {
    let port_type = port_type_label(&port.port_type).to_string();
    match port.port_type {
        SerialPortType::UsbPort(usb) => SerialPortInfo {
            port_name: port.port_name,
            port_type,
            manufacturer: usb.manufacturer,
            product: usb.product,
            serial_number: usb.serial_number,
            vid: Some(usb.vid),
            pid: Some(usb.pid),
        },
        _ => SerialPortInfo {
            port_name: port.port_name,
            port_type,
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        },
    }
}
