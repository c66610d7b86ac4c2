//! Serial transport adapter
//!
//! Presents any `embedded-io` serial port as a [`ByteTransport`]. Chip HALs
//! already implement the `embedded-io` traits for their UARTs, so no
//! per-chip glue is needed here.

use embedded_io::{ErrorType, Read, ReadReady, Write};

use crate::transport::ByteTransport;

/// Serial port wrapped as a polled byte transport
///
/// Reads are gated on [`ReadReady`] so the engine never blocks on an idle
/// line.
pub struct SerialTransport<U> {
    port: U,
}

impl<U> SerialTransport<U>
where
    U: Read + ReadReady + Write,
{
    /// Wrap a serial port
    pub fn new(port: U) -> Self {
        Self { port }
    }

    /// Borrow the underlying port
    pub fn port(&self) -> &U {
        &self.port
    }

    /// Mutably borrow the underlying port
    pub fn port_mut(&mut self) -> &mut U {
        &mut self.port
    }

    /// Release the underlying port
    pub fn into_inner(self) -> U {
        self.port
    }
}

impl<U> ByteTransport for SerialTransport<U>
where
    U: Read + ReadReady + Write,
{
    type Error = <U as ErrorType>::Error;

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(usize::from(self.port.read_ready()?))
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.port.read_ready()? {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        match Read::read(&mut self.port, &mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        Write::write_all(&mut self.port, &[byte])
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        Write::write_all(&mut self.port, bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Write::flush(&mut self.port)
    }
}
