//! Message types carried inside sysex frames
//!
//! Command identifiers shared with the hardware modules (pin control,
//! integer reporting) and helpers for the 14-bit values a frame carries.

use heapless::Vec;

use crate::encoder::{encode_sysex, encoded_len, EncodeError};
use crate::wire::decode_14bit;

// Plain system command: configure a pin
pub const SET_PIN_MODE: u8 = 0xF4;

// Sysex sub-commands
pub const SET_PIN: u8 = 0x32;
pub const SEND_INT_VAL: u8 = 0x33;
pub const COMMAND_NOT_FOUND: u8 = 0x34;

/// Maximum values in an owned [`SysexMessage`]
pub const MAX_SYSEX_VALUES: usize = 15;

/// Known sysex sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysexCommand {
    /// Drive a pin to a value
    SetPin,
    /// Report an integer value
    SendIntVal,
    /// Reply to a sub-command nobody handles
    CommandNotFound,
}

impl SysexCommand {
    /// Parse a sub-command from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SET_PIN => Some(SysexCommand::SetPin),
            SEND_INT_VAL => Some(SysexCommand::SendIntVal),
            COMMAND_NOT_FOUND => Some(SysexCommand::CommandNotFound),
            _ => None,
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            SysexCommand::SetPin => SET_PIN,
            SysexCommand::SendIntVal => SEND_INT_VAL,
            SysexCommand::CommandNotFound => COMMAND_NOT_FOUND,
        }
    }
}

/// Iterator over the 14-bit values in a received frame
#[derive(Debug, Clone)]
pub struct SysexValues<'a> {
    pairs: core::slice::ChunksExact<'a, u8>,
}

impl<'a> SysexValues<'a> {
    /// Trailing byte that did not form a pair, if the frame had odd length
    pub fn remainder(&self) -> Option<u8> {
        self.pairs.remainder().first().copied()
    }
}

impl Iterator for SysexValues<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        self.pairs.next().map(|pair| decode_14bit(pair[0], pair[1]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pairs.size_hint()
    }
}

impl ExactSizeIterator for SysexValues<'_> {}

/// Decode the `(lsb, msb)` pairs of a sysex payload
pub fn decode_values(data: &[u8]) -> SysexValues<'_> {
    SysexValues {
        pairs: data.chunks_exact(2),
    }
}

/// Owned outbound sysex message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SysexMessage {
    /// Sub-command byte
    pub command: u8,
    /// Payload values (14-bit)
    pub values: Vec<u16, MAX_SYSEX_VALUES>,
}

impl SysexMessage {
    /// Create a message from a command and its values
    pub fn new(command: u8, values: &[u16]) -> Result<Self, EncodeError> {
        crate::encoder::validate(command, values)?;
        let values = Vec::from_slice(values).map_err(|_| EncodeError::BufferTooSmall)?;
        Ok(Self { command, values })
    }

    /// Create a message with no values
    pub fn empty(command: u8) -> Result<Self, EncodeError> {
        Self::new(command, &[])
    }

    /// `SEND_INT_VAL` carrying one value
    pub fn int_value(value: u16) -> Result<Self, EncodeError> {
        Self::new(SEND_INT_VAL, &[value])
    }

    /// `COMMAND_NOT_FOUND` naming the unhandled sub-command
    pub fn command_not_found(sub_command: u8) -> Result<Self, EncodeError> {
        Self::new(COMMAND_NOT_FOUND, &[u16::from(sub_command)])
    }

    /// Rebuild a message from a received frame
    ///
    /// Odd-length payloads are rejected since the last value is incomplete.
    pub fn from_frame(sub_command: u8, data: &[u8]) -> Option<Self> {
        let values = decode_values(data);
        if values.remainder().is_some() {
            return None;
        }
        let mut out = Vec::new();
        for value in values {
            out.push(value).ok()?;
        }
        Some(Self {
            command: sub_command,
            values: out,
        })
    }

    /// Known sub-command, if this is one
    pub fn kind(&self) -> Option<SysexCommand> {
        SysexCommand::from_byte(self.command)
    }

    /// Bytes this message occupies on the wire
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.values.len())
    }

    /// Encode into a byte buffer, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        encode_sysex(self.command, &self.values, buffer)
    }
}
