//! Frame parser
//!
//! A byte-at-a-time state machine. Bytes may arrive one per poll cycle, so
//! all progress lives in [`FrameParser`] between calls. Each byte falls
//! into one of three regimes, checked in this order:
//!
//! 1. Inside a sysex frame: append to the buffer until `END_SYSEX`.
//! 2. Armed for multi-byte data: store 7-bit bytes at decreasing buffer
//!    positions until the armed count is reached.
//! 3. Otherwise: classify as a command. Only `START_SYSEX` and
//!    `SYSTEM_RESET` (plus any configured multi-byte commands) act; other
//!    commands are accepted and dropped.
//!
//! `SYSTEM_RESET` is honoured in every regime, including mid-frame.

use heapless::Vec;

use crate::config::{MultiByteCommand, MAX_MULTI_BYTE_COMMANDS};
use crate::wire::{classify, is_data_byte, Classified, END_SYSEX, MAX_DATA_BYTES, START_SYSEX, SYSTEM_RESET};

/// Errors raised while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// An open sysex frame grew past [`MAX_DATA_BYTES`]; the frame was dropped
    SysexOverflow,
    /// A multi-byte command must arm between 1 and [`MAX_DATA_BYTES`] bytes
    InvalidArmLength(u8),
}

/// Parser regime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Classifying command bytes
    Idle,
    /// Collecting data for an armed multi-byte command
    AwaitingMultiByteData {
        /// Data bytes still expected (always > 0)
        remaining: u8,
    },
    /// Collecting a sysex frame
    InSysex,
}

/// Multi-byte command whose data has fully arrived
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultiByteMessage {
    /// Command that armed the data run (high nibble form)
    pub command: u8,
    /// Channel nibble of the arming byte
    pub channel: u8,
    /// Data in buffer index order: the last byte received is at index 0
    pub data: Vec<u8, MAX_DATA_BYTES>,
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseEvent<'a> {
    /// Byte consumed; nothing complete yet
    Pending,
    /// A sysex frame closed
    Sysex {
        /// First byte of the frame
        sub_command: u8,
        /// Remaining frame bytes, still 7-bit pair encoded
        data: &'a [u8],
    },
    /// `START_SYSEX` immediately followed by `END_SYSEX`
    EmptySysex,
    /// `SYSTEM_RESET` received; parser state is already clean
    SystemReset,
    /// Armed multi-byte data complete
    MultiByte(MultiByteMessage),
    /// Command accepted but not acted on at this layer
    Ignored(Classified),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Armed {
    command: u8,
    channel: u8,
    len: u8,
}

/// Incremental parser state
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: [u8; MAX_DATA_BYTES],
    /// Bytes read into the current sysex frame
    count: usize,
    armed: Option<Armed>,
    /// Channel of the last classified command
    channel: u8,
    multi_byte_commands: Vec<MultiByteCommand, MAX_MULTI_BYTE_COMMANDS>,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a parser that only recognizes sysex and system reset
    pub fn new() -> Self {
        Self::with_multi_byte_commands(Vec::new())
    }

    /// Create a parser that also arms on the given multi-byte commands
    pub fn with_multi_byte_commands(
        commands: Vec<MultiByteCommand, MAX_MULTI_BYTE_COMMANDS>,
    ) -> Self {
        Self {
            state: ParseState::Idle,
            buffer: [0; MAX_DATA_BYTES],
            count: 0,
            armed: None,
            channel: 0,
            multi_byte_commands: commands,
        }
    }

    /// Return to `Idle` with a zeroed buffer and nothing armed
    ///
    /// The multi-byte command table is configuration and survives.
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.buffer = [0; MAX_DATA_BYTES];
        self.count = 0;
        self.armed = None;
        self.channel = 0;
    }

    /// Current regime
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Raw accumulation buffer
    pub fn buffer(&self) -> &[u8; MAX_DATA_BYTES] {
        &self.buffer
    }

    /// Bytes collected so far in the open sysex frame
    pub fn sysex_len(&self) -> usize {
        self.count
    }

    /// Channel nibble of the last classified command
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Expect `len` data bytes for `command` on `channel`
    ///
    /// Replaces any command already armed. An open sysex frame is abandoned.
    pub fn arm(&mut self, command: u8, channel: u8, len: u8) -> Result<(), ParseError> {
        if len == 0 || usize::from(len) > MAX_DATA_BYTES {
            return Err(ParseError::InvalidArmLength(len));
        }
        self.count = 0;
        self.armed = Some(Armed {
            command,
            channel,
            len,
        });
        self.state = ParseState::AwaitingMultiByteData { remaining: len };
        Ok(())
    }

    /// Feed a single byte to the parser
    ///
    /// The caller must only pass bytes the transport actually delivered.
    pub fn feed(&mut self, byte: u8) -> Result<ParseEvent<'_>, ParseError> {
        if byte == SYSTEM_RESET {
            self.reset();
            return Ok(ParseEvent::SystemReset);
        }

        match self.state {
            ParseState::InSysex => self.feed_sysex(byte),
            ParseState::AwaitingMultiByteData { remaining } if is_data_byte(byte) => {
                Ok(self.feed_multi_byte(byte, remaining))
            }
            _ => Ok(self.feed_command(byte)),
        }
    }

    fn feed_sysex(&mut self, byte: u8) -> Result<ParseEvent<'_>, ParseError> {
        if byte == END_SYSEX {
            self.state = ParseState::Idle;
            if self.count == 0 {
                return Ok(ParseEvent::EmptySysex);
            }
            return Ok(ParseEvent::Sysex {
                sub_command: self.buffer[0],
                data: &self.buffer[1..self.count],
            });
        }

        if self.count >= MAX_DATA_BYTES {
            self.reset();
            return Err(ParseError::SysexOverflow);
        }

        self.buffer[self.count] = byte;
        self.count += 1;
        Ok(ParseEvent::Pending)
    }

    fn feed_multi_byte(&mut self, byte: u8, remaining: u8) -> ParseEvent<'static> {
        let remaining = remaining - 1;
        self.buffer[usize::from(remaining)] = byte;

        if remaining > 0 {
            self.state = ParseState::AwaitingMultiByteData { remaining };
            return ParseEvent::Pending;
        }

        self.state = ParseState::Idle;
        match self.armed.take() {
            Some(armed) => {
                let mut data = Vec::new();
                // len <= MAX_DATA_BYTES was checked when arming
                let _ = data.extend_from_slice(&self.buffer[..usize::from(armed.len)]);
                ParseEvent::MultiByte(MultiByteMessage {
                    command: armed.command,
                    channel: armed.channel,
                    data,
                })
            }
            None => ParseEvent::Pending,
        }
    }

    fn feed_command(&mut self, byte: u8) -> ParseEvent<'static> {
        let classified = classify(byte);
        if let Some(channel) = classified.channel {
            self.channel = channel;
        }

        match classified.command {
            START_SYSEX => {
                self.armed = None;
                self.count = 0;
                self.state = ParseState::InSysex;
                ParseEvent::Pending
            }
            command => {
                let entry = self
                    .multi_byte_commands
                    .iter()
                    .find(|entry| entry.command == command && !classified.is_system())
                    .copied();
                match entry {
                    Some(entry) => match self.arm(command, self.channel, entry.data_bytes) {
                        Ok(()) => ParseEvent::Pending,
                        Err(_) => ParseEvent::Ignored(classified),
                    },
                    None => ParseEvent::Ignored(classified),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut FrameParser, bytes: &[u8]) {
        for &b in bytes {
            parser.feed(b).unwrap();
        }
    }

    #[test]
    fn test_starts_idle() {
        let parser = FrameParser::new();
        assert_eq!(parser.state(), ParseState::Idle);
        assert_eq!(parser.buffer(), &[0u8; MAX_DATA_BYTES]);
    }

    #[test]
    fn test_sysex_frame() {
        let mut parser = FrameParser::new();
        feed_all(&mut parser, &[START_SYSEX, 0x05, 0x10, 0x00]);
        assert_eq!(parser.state(), ParseState::InSysex);
        assert_eq!(parser.sysex_len(), 3);

        let event = parser.feed(END_SYSEX).unwrap();
        assert_eq!(
            event,
            ParseEvent::Sysex {
                sub_command: 0x05,
                data: &[0x10, 0x00],
            }
        );
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn test_sysex_with_only_sub_command() {
        let mut parser = FrameParser::new();
        feed_all(&mut parser, &[START_SYSEX, 0x34]);
        let event = parser.feed(END_SYSEX).unwrap();
        assert_eq!(
            event,
            ParseEvent::Sysex {
                sub_command: 0x34,
                data: &[],
            }
        );
    }

    #[test]
    fn test_empty_sysex() {
        let mut parser = FrameParser::new();
        parser.feed(START_SYSEX).unwrap();
        assert_eq!(parser.feed(END_SYSEX).unwrap(), ParseEvent::EmptySysex);
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn test_sysex_keeps_high_bytes_as_data() {
        let mut parser = FrameParser::new();
        feed_all(&mut parser, &[START_SYSEX, 0x01, START_SYSEX, 0x90]);
        let event = parser.feed(END_SYSEX).unwrap();
        assert_eq!(
            event,
            ParseEvent::Sysex {
                sub_command: 0x01,
                data: &[START_SYSEX, 0x90],
            }
        );
    }

    #[test]
    fn test_sysex_overflow_is_caught() {
        let mut parser = FrameParser::new();
        parser.feed(START_SYSEX).unwrap();
        for i in 0..MAX_DATA_BYTES {
            assert_eq!(parser.feed(i as u8).unwrap(), ParseEvent::Pending);
        }
        assert_eq!(parser.sysex_len(), MAX_DATA_BYTES);

        assert_eq!(parser.feed(0x01), Err(ParseError::SysexOverflow));
        assert_eq!(parser.state(), ParseState::Idle);
        assert_eq!(parser.buffer(), &[0u8; MAX_DATA_BYTES]);
    }

    #[test]
    fn test_full_buffer_frame_still_dispatches() {
        let mut parser = FrameParser::new();
        parser.feed(START_SYSEX).unwrap();
        for _ in 0..MAX_DATA_BYTES {
            parser.feed(0x11).unwrap();
        }
        match parser.feed(END_SYSEX).unwrap() {
            ParseEvent::Sysex { sub_command, data } => {
                assert_eq!(sub_command, 0x11);
                assert_eq!(data.len(), MAX_DATA_BYTES - 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_reset_byte_mid_sysex() {
        let mut parser = FrameParser::new();
        feed_all(&mut parser, &[START_SYSEX, 0x05, 0x10]);
        assert_eq!(parser.feed(SYSTEM_RESET).unwrap(), ParseEvent::SystemReset);
        assert_eq!(parser.state(), ParseState::Idle);
        assert_eq!(parser.sysex_len(), 0);
        assert_eq!(parser.buffer(), &[0u8; MAX_DATA_BYTES]);
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut parser = FrameParser::new();
        let event = parser.feed(0x12).unwrap();
        assert_eq!(
            event,
            ParseEvent::Ignored(Classified {
                command: 0x10,
                channel: Some(0x02),
            })
        );
        assert_eq!(parser.state(), ParseState::Idle);
        assert_eq!(parser.channel(), 0x02);
    }

    #[test]
    fn test_end_sysex_outside_frame_ignored() {
        let mut parser = FrameParser::new();
        let event = parser.feed(END_SYSEX).unwrap();
        assert!(matches!(event, ParseEvent::Ignored(c) if c.command == END_SYSEX));
    }

    #[test]
    fn test_multi_byte_stored_reversed() {
        let mut parser = FrameParser::new();
        parser.arm(0x90, 3, 3).unwrap();
        assert_eq!(
            parser.state(),
            ParseState::AwaitingMultiByteData { remaining: 3 }
        );

        assert_eq!(parser.feed(0x0A).unwrap(), ParseEvent::Pending);
        assert_eq!(parser.feed(0x0B).unwrap(), ParseEvent::Pending);
        let event = parser.feed(0x0C).unwrap();

        match event {
            ParseEvent::MultiByte(msg) => {
                assert_eq!(msg.command, 0x90);
                assert_eq!(msg.channel, 3);
                assert_eq!(msg.data.as_slice(), &[0x0C, 0x0B, 0x0A]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn test_configured_command_arms() {
        let mut table = Vec::new();
        table
            .push(MultiByteCommand {
                command: 0xE0,
                data_bytes: 2,
            })
            .unwrap();
        let mut parser = FrameParser::with_multi_byte_commands(table);

        assert_eq!(parser.feed(0xE5).unwrap(), ParseEvent::Pending);
        assert_eq!(
            parser.state(),
            ParseState::AwaitingMultiByteData { remaining: 2 }
        );
        parser.feed(0x48).unwrap();
        let event = parser.feed(0x01).unwrap();
        assert_eq!(
            event,
            ParseEvent::MultiByte(MultiByteMessage {
                command: 0xE0,
                channel: 5,
                data: Vec::from_slice(&[0x01, 0x48]).unwrap(),
            })
        );
    }

    #[test]
    fn test_configured_command_rearms_while_armed() {
        let mut table = Vec::new();
        table.push(MultiByteCommand::new(0x90, 3).unwrap()).unwrap();
        table.push(MultiByteCommand::new(0xC0, 1).unwrap()).unwrap();
        let mut parser = FrameParser::with_multi_byte_commands(table);

        feed_all(&mut parser, &[0x91, 0x10]);
        assert_eq!(
            parser.state(),
            ParseState::AwaitingMultiByteData { remaining: 2 }
        );

        assert_eq!(parser.feed(0xC2).unwrap(), ParseEvent::Pending);
        assert_eq!(
            parser.state(),
            ParseState::AwaitingMultiByteData { remaining: 1 }
        );

        let event = parser.feed(0x05).unwrap();
        assert_eq!(
            event,
            ParseEvent::MultiByte(MultiByteMessage {
                command: 0xC0,
                channel: 2,
                data: Vec::from_slice(&[0x05]).unwrap(),
            })
        );
        assert_eq!(parser.state(), ParseState::Idle);
    }

    #[test]
    fn test_status_byte_while_armed_keeps_waiting() {
        let mut parser = FrameParser::new();
        parser.arm(0x90, 0, 2).unwrap();
        parser.feed(0x01).unwrap();

        let event = parser.feed(0xA1).unwrap();
        assert!(matches!(event, ParseEvent::Ignored(_)));
        assert_eq!(
            parser.state(),
            ParseState::AwaitingMultiByteData { remaining: 1 }
        );
    }

    #[test]
    fn test_start_sysex_abandons_armed_command() {
        let mut parser = FrameParser::new();
        parser.arm(0x90, 0, 2).unwrap();
        parser.feed(START_SYSEX).unwrap();
        assert_eq!(parser.state(), ParseState::InSysex);
        assert_eq!(parser.sysex_len(), 0);
    }

    #[test]
    fn test_reset_byte_mid_multi_byte() {
        let mut parser = FrameParser::new();
        parser.arm(0x90, 7, 4).unwrap();
        parser.feed(0x22).unwrap();
        assert_eq!(parser.feed(SYSTEM_RESET).unwrap(), ParseEvent::SystemReset);
        assert_eq!(parser.state(), ParseState::Idle);
        assert_eq!(parser.channel(), 0);
        assert_eq!(parser.buffer(), &[0u8; MAX_DATA_BYTES]);
    }

    #[test]
    fn test_arm_rejects_bad_length() {
        let mut parser = FrameParser::new();
        assert_eq!(parser.arm(0x90, 0, 0), Err(ParseError::InvalidArmLength(0)));
        assert_eq!(
            parser.arm(0x90, 0, MAX_DATA_BYTES as u8 + 1),
            Err(ParseError::InvalidArmLength(MAX_DATA_BYTES as u8 + 1))
        );
        assert_eq!(parser.state(), ParseState::Idle);
    }
}
