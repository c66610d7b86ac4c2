//! Byte transport capability
//!
//! The protocol engine never touches a peripheral directly. It polls a
//! [`ByteTransport`] for buffered input and pushes encoded output through it.

/// Polled, non-blocking byte transport
///
/// Implementations must deliver received bytes in FIFO order. None of the
/// methods may block waiting for the peer: `read` returns `Ok(None)` when
/// nothing is buffered.
pub trait ByteTransport {
    /// Error type for transport operations
    type Error;

    /// Number of bytes that can be read without blocking
    ///
    /// This is a lower bound; adapters that can only tell "something is
    /// ready" report 1.
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Read the next buffered byte, or `None` if nothing is buffered
    fn read(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Queue a single byte for transmission
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Queue a run of bytes for transmission
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        for &byte in bytes {
            self.write(byte)?;
        }
        Ok(())
    }

    /// Push any buffered output to the link
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    type Error = T::Error;

    fn available(&mut self) -> Result<usize, Self::Error> {
        (**self).available()
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        (**self).read()
    }

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        (**self).write(byte)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        (**self).flush()
    }
}
