//! Byte-duplex transport abstraction
//!
//! The protocol layer only needs a blocking, timeout-bounded byte channel.
//! The real device is a USB-CDC serial port; tests substitute scripted
//! in-memory transports.

use std::io::{Read, Write};
use std::time::Duration;

use log::info;
use serialport::ClearBuffer;

use crate::errors::TransportError;

/// Anything that can carry the command/response frames and the sample
/// stream. Reads are expected to block up to the port timeout and surface
/// `ErrorKind::TimedOut` when nothing arrived; writes are expected to
/// accept whole frames.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Opens the serial device with a short per-`read` timeout and cleared
/// buffers. The timeout bounds a single `read` call, not a whole chunk
/// accumulation window, so cancellation stays prompt.
pub fn open_serial(port_name: &str, baud_rate: u32, poll_timeout: Duration) -> Result<Box<dyn Transport>, TransportError> {
    let port = serialport::new(port_name, baud_rate).timeout(poll_timeout).open()?;
    port.clear(ClearBuffer::All)?;
    info!("Opened serial transport on {port_name} at {baud_rate} baud");
    Ok(Box::new(port))
}
