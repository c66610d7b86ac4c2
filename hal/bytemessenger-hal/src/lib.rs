//! ByteMessenger Hardware Abstraction Layer
//!
//! This crate defines the byte transport capability consumed by the
//! ByteMessenger protocol engine, plus adapters that present a serial port
//! or an I2C target peripheral through that one interface. The same engine
//! runs unchanged over either link.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  bytemessenger-protocol (Messenger)      │
//! └──────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌──────────────────────────────────────────┐
//! │  bytemessenger-hal (ByteTransport)       │
//! └──────────────────────────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ SerialTransport │     │    I2cTarget    │
//! │  (embedded-io)  │     │ (heapless FIFOs)│
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`transport::ByteTransport`] - Polled byte source and sink
//!
//! # Adapters
//!
//! - [`uart::SerialTransport`] - Any `embedded-io` serial port
//! - [`i2c::I2cTarget`] - I2C target (slave) receive/transmit queues

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;
pub mod transport;
pub mod uart;

// Re-export key types at crate root for convenience
pub use i2c::{I2cTarget, I2cTargetError};
pub use transport::ByteTransport;
pub use uart::SerialTransport;
