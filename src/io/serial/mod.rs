// src/io/serial/mod.rs
//
// Serial port transport for the tester link.

pub mod reader;
pub(crate) mod utils;

pub use reader::{
    list_serial_ports, open_serial, prompt_for_port, SerialPortInfo, SerialSource,
    DEFAULT_BAUD_RATE,
};
