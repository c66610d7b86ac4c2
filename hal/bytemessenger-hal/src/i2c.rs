//! I2C target-mode transport
//!
//! On I2C the microcontroller is addressed by the host as a target (slave).
//! Bytes arrive in controller write transactions and leave when the
//! controller issues a read. [`I2cTarget`] buffers both directions so the
//! protocol engine can treat the bus like any other polled byte stream.
//!
//! The bus glue (an interrupt-driven or async target driver) feeds
//! [`I2cTarget::on_receive`] and answers reads from [`I2cTarget::on_request`].
//! Both must run on the same execution context as the engine that owns the
//! transport.

use heapless::Deque;

use crate::transport::ByteTransport;

/// Default receive queue depth
pub const DEFAULT_RX_CAPACITY: usize = 64;

/// Default transmit queue depth
pub const DEFAULT_TX_CAPACITY: usize = 64;

/// Errors from the I2C target queues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cTargetError {
    /// Receive queue full; the controller wrote faster than the engine polled
    RxFull,
    /// Transmit queue full; the controller has not read pending output
    TxFull,
}

/// Buffered I2C target transport
///
/// `RX` and `TX` are the receive and transmit queue depths in bytes.
pub struct I2cTarget<const RX: usize = DEFAULT_RX_CAPACITY, const TX: usize = DEFAULT_TX_CAPACITY>
{
    rx: Deque<u8, RX>,
    tx: Deque<u8, TX>,
}

impl<const RX: usize, const TX: usize> Default for I2cTarget<RX, TX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const RX: usize, const TX: usize> I2cTarget<RX, TX> {
    /// Create an empty target transport
    pub const fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Deque::new(),
        }
    }

    /// Accept bytes from a controller write transaction
    ///
    /// Bytes are queued in order until the receive queue fills. Returns the
    /// number queued, or [`I2cTargetError::RxFull`] if any byte was refused.
    /// Refused bytes are dropped, never written over queued ones.
    pub fn on_receive(&mut self, data: &[u8]) -> Result<usize, I2cTargetError> {
        for &byte in data {
            // A partial accept still reports the loss
            self.rx.push_back(byte).map_err(|_| I2cTargetError::RxFull)?;
        }
        Ok(data.len())
    }

    /// Answer a controller read request from the transmit queue
    ///
    /// Returns the number of bytes placed in `buf`.
    pub fn on_request(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.tx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Number of bytes waiting for the controller to read
    pub fn pending_tx(&self) -> usize {
        self.tx.len()
    }

    /// Drop all queued input and output
    pub fn clear(&mut self) {
        self.rx.clear();
        self.tx.clear();
    }
}

impl<const RX: usize, const TX: usize> ByteTransport for I2cTarget<RX, TX> {
    type Error = I2cTargetError;

    fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.rx.len())
    }

    fn read(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.rx.pop_front())
    }

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.tx.push_back(byte).map_err(|_| I2cTargetError::TxFull)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        // All or nothing: a slice handed over in one call is never half-queued
        if TX - self.tx.len() < bytes.len() {
            return Err(I2cTargetError::TxFull);
        }
        for &byte in bytes {
            self.write(byte)?;
        }
        Ok(())
    }
}
