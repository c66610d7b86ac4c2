//! Wire constants, byte classification, and the 14-bit value codec
//!
//! Wire grammar (identical on serial and I2C):
//!
//! ```text
//! System reset   0xFF
//! Sysex          0xF0  SUB_COMMAND  (LSB MSB)*  0xF7
//! Plain command  b  where b < 0xF0 splits into command = b & 0xF0,
//!                                              channel = b & 0x0F
//! ```
//!
//! Data bytes are 7-bit (below 0x80) so they never collide with markers.

/// Start of a sysex frame
pub const START_SYSEX: u8 = 0xF0;

/// End of a sysex frame
pub const END_SYSEX: u8 = 0xF7;

/// System reset
pub const SYSTEM_RESET: u8 = 0xFF;

/// Capacity of the accumulation buffer in bytes
pub const MAX_DATA_BYTES: usize = 32;

/// Largest value that survives a 7-bit pair (14 bits)
pub const MAX_14BIT_VALUE: u16 = 0x3FFF;

/// Mask for a single 7-bit data byte
pub const DATA_MASK: u8 = 0x7F;

/// First byte value whose command carries no channel nibble
const SYSTEM_COMMAND_BASE: u8 = 0xF0;

/// Command and channel derived from a command-position byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Classified {
    /// Command value (`b & 0xF0` below 0xF0, `b` itself otherwise)
    pub command: u8,
    /// Channel nibble, absent for system commands (0xF0..=0xFF)
    pub channel: Option<u8>,
}

impl Classified {
    /// True for the 0xF0..=0xFF system range
    pub fn is_system(&self) -> bool {
        self.channel.is_none()
    }
}

/// Split a command-position byte into command and channel
pub fn classify(byte: u8) -> Classified {
    if byte < SYSTEM_COMMAND_BASE {
        Classified {
            command: byte & 0xF0,
            channel: Some(byte & 0x0F),
        }
    } else {
        Classified {
            command: byte,
            channel: None,
        }
    }
}

/// True if `byte` fits in 7 bits and can travel as data
pub const fn is_data_byte(byte: u8) -> bool {
    byte & 0x80 == 0
}

/// Split a value into its `(lsb, msb)` 7-bit pair
///
/// Bits above the 14th are masked away; values over [`MAX_14BIT_VALUE`]
/// cannot be reconstructed by the receiver.
pub const fn encode_14bit(value: u16) -> [u8; 2] {
    [(value as u8) & DATA_MASK, ((value >> 7) as u8) & DATA_MASK]
}

/// Rebuild a value from its `(lsb, msb)` 7-bit pair
pub const fn decode_14bit(lsb: u8, msb: u8) -> u16 {
    (((msb & DATA_MASK) as u16) << 7) | (lsb & DATA_MASK) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_channel_command() {
        let c = classify(0x92);
        assert_eq!(c.command, 0x90);
        assert_eq!(c.channel, Some(0x02));
        assert!(!c.is_system());
    }

    #[test]
    fn test_classify_system_commands() {
        for byte in [START_SYSEX, 0xF4, END_SYSEX, SYSTEM_RESET] {
            let c = classify(byte);
            assert_eq!(c.command, byte);
            assert_eq!(c.channel, None);
            assert!(c.is_system());
        }
    }

    #[test]
    fn test_encode_200() {
        assert_eq!(encode_14bit(200), [72, 1]);
        assert_eq!(decode_14bit(72, 1), 200);
    }

    #[test]
    fn test_encode_truncates_above_14_bits() {
        // 0x4000 loses its 15th bit on the wire
        assert_eq!(encode_14bit(0x4000), [0, 0]);
        assert_eq!(encode_14bit(0xFFFF), [0x7F, 0x7F]);
        assert_eq!(decode_14bit(0x7F, 0x7F), MAX_14BIT_VALUE);
    }

    #[test]
    fn test_is_data_byte() {
        assert!(is_data_byte(0x00));
        assert!(is_data_byte(0x7F));
        assert!(!is_data_byte(0x80));
        assert!(!is_data_byte(END_SYSEX));
    }

    proptest! {
        #[test]
        fn prop_classify_below_system_range(c in 0x00u8..=0xEF) {
            let classified = classify(c);
            prop_assert_eq!(classified.command, c & 0xF0);
            prop_assert_eq!(classified.channel, Some(c & 0x0F));
        }

        #[test]
        fn prop_14bit_values_survive(value in 0u16..=MAX_14BIT_VALUE) {
            let [lsb, msb] = encode_14bit(value);
            prop_assert!(is_data_byte(lsb));
            prop_assert!(is_data_byte(msb));
            prop_assert_eq!(decode_14bit(lsb, msb), value);
        }
    }
}
