//! Message encoder
//!
//! Sysex frame format on the wire:
//! - START_SYSEX (1 byte): 0xF0
//! - COMMAND (1 byte): sub-command, sent raw, must be below 0x80
//! - VALUES (2 bytes each): `(value & 0x7F, (value >> 7) & 0x7F)`
//! - END_SYSEX (1 byte): 0xF7
//!
//! Every input is validated before the first byte is produced, so a
//! rejected message never leaves a half-written frame on the link.

use bytemessenger_hal::ByteTransport;

use crate::messages::MAX_SYSEX_VALUES;
use crate::wire::{encode_14bit, is_data_byte, END_SYSEX, MAX_14BIT_VALUE, START_SYSEX};

/// Errors that can occur while encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Sub-command does not fit in 7 bits
    CommandOutOfRange(u8),
    /// Payload value does not fit in 14 bits
    ValueOutOfRange {
        /// Position of the value in the payload
        index: usize,
        /// Offending value
        value: u16,
    },
    /// Output buffer too small for the frame
    BufferTooSmall,
}

/// Encoded length of a frame carrying `values` payload values
pub const fn encoded_len(values: usize) -> usize {
    3 + 2 * values
}

/// Longest frame a 32-byte receive buffer accepts, markers included
pub const MAX_FRAME_LEN: usize = encoded_len(MAX_SYSEX_VALUES);

/// Check the 7-bit command and 14-bit values
pub fn validate(command: u8, values: &[u16]) -> Result<(), EncodeError> {
    if !is_data_byte(command) {
        return Err(EncodeError::CommandOutOfRange(command));
    }
    match values
        .iter()
        .position(|&value| value > MAX_14BIT_VALUE)
    {
        Some(index) => Err(EncodeError::ValueOutOfRange {
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// Encode a sysex frame into `buffer`
///
/// Returns the number of bytes written.
pub fn encode_sysex(command: u8, values: &[u16], buffer: &mut [u8]) -> Result<usize, EncodeError> {
    validate(command, values)?;

    let frame_len = encoded_len(values.len());
    if buffer.len() < frame_len {
        return Err(EncodeError::BufferTooSmall);
    }

    buffer[0] = START_SYSEX;
    buffer[1] = command;
    for (pair, &value) in buffer[2..frame_len - 1].chunks_exact_mut(2).zip(values) {
        pair.copy_from_slice(&encode_14bit(value));
    }
    buffer[frame_len - 1] = END_SYSEX;

    Ok(frame_len)
}

/// Outcome of [`write_sysex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError<E> {
    /// Message rejected before anything was written
    Encode(EncodeError),
    /// The transport failed mid-frame
    Transport(E),
}

impl<E> From<EncodeError> for WriteError<E> {
    fn from(e: EncodeError) -> Self {
        WriteError::Encode(e)
    }
}

/// Validate and write a sysex frame straight to a transport
///
/// The frame is encoded on the stack and handed over in one `write_all`,
/// so transports with all-or-nothing writes never queue a frame without
/// its END_SYSEX. Payloads above [`MAX_SYSEX_VALUES`] values are rejected
/// with [`EncodeError::BufferTooSmall`].
pub fn write_sysex<T: ByteTransport>(
    transport: &mut T,
    command: u8,
    values: &[u16],
) -> Result<(), WriteError<T::Error>> {
    let mut frame = [0u8; MAX_FRAME_LEN];
    let len = encode_sysex(command, values, &mut frame)?;

    transport
        .write_all(&frame[..len])
        .map_err(WriteError::Transport)?;
    transport.flush().map_err(WriteError::Transport)
}
