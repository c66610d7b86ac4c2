//! ByteMessenger Protocol
//!
//! This crate turns a polled byte stream into discrete commands for a
//! microcontroller talking to a host over serial or I2C, and encodes
//! outgoing payloads into the same framing. One engine serves both links
//! through the [`ByteTransport`](bytemessenger_hal::ByteTransport) trait.
//!
//! # Protocol Overview
//!
//! ```text
//! System reset   ┌──────┐
//!                │ 0xFF │
//!                └──────┘
//! Sysex          ┌──────┬─────────┬───────────────────┬──────┐
//!                │ 0xF0 │ COMMAND │ (LSB MSB) × N     │ 0xF7 │
//!                │ 1B   │ 1B      │ 2B per 14-bit val │ 1B   │
//!                └──────┴─────────┴───────────────────┴──────┘
//! Plain command  ┌──────────────────┐
//!                │ CMD(hi) | CH(lo) │  below 0xF0
//!                └──────────────────┘
//! ```
//!
//! Data flow:
//!
//! ```text
//! transport → FrameParser → CallbackRegistry → handler
//! values    → encoder     → transport
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut on_sysex = |command: u8, data: &[u8]| { /* drive hardware */ };
//! let mut messenger = Messenger::new(SerialTransport::new(uart));
//! messenger.on_sysex(&mut on_sysex);
//!
//! loop {
//!     messenger.poll()?;
//!     messenger.send_sysex(SEND_INT_VAL, &[position])?;
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod callbacks;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod messages;
pub mod parser;
pub mod wire;

pub use callbacks::{Callback, CallbackCategory, CallbackRegistry, ResetHandler, SysexHandler};
pub use config::{ConfigError, EngineConfig, MultiByteCommand, OverflowPolicy};
pub use encoder::{encode_sysex, EncodeError};
pub use engine::{EngineError, EngineStats, Messenger};
pub use messages::{decode_values, SysexCommand, SysexMessage};
pub use parser::{FrameParser, MultiByteMessage, ParseError, ParseEvent, ParseState};
pub use wire::{classify, Classified, END_SYSEX, MAX_DATA_BYTES, START_SYSEX, SYSTEM_RESET};
