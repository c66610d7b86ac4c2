//! Engine configuration
//!
//! Plain data that shapes how the [`Messenger`](crate::Messenger) recovers
//! from bad input and which plain commands arm multi-byte data. With the
//! `serde` feature the configuration can be stored as postcard binary data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use heapless::Vec;

use crate::wire::MAX_DATA_BYTES;

/// Maximum entries in the multi-byte command table
pub const MAX_MULTI_BYTE_COMMANDS: usize = 8;

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Multi-byte command outside 0x00..=0xE0 or not a bare high nibble
    InvalidCommand(u8),
    /// Multi-byte data length outside 1..=MAX_DATA_BYTES
    InvalidDataLength(u8),
    /// Multi-byte command table is full
    TableFull,
    /// Sysex watchdog limit of zero ticks
    InvalidWatchdog,
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Stored config has a different format version
    VersionMismatch,
}

/// What to do when a sysex frame outgrows the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OverflowPolicy {
    /// Full reset, including the reset callback
    #[default]
    Reset,
    /// Drop the frame and return to idle without notifying anyone
    Discard,
}

/// Plain command that arms a fixed number of data bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MultiByteCommand {
    /// Command in high nibble form (e.g. 0x90)
    pub command: u8,
    /// Data bytes that follow the command
    pub data_bytes: u8,
}

impl MultiByteCommand {
    /// Validate and build a table entry
    pub fn new(command: u8, data_bytes: u8) -> Result<Self, ConfigError> {
        if command >= 0xF0 || command & 0x0F != 0 {
            return Err(ConfigError::InvalidCommand(command));
        }
        if data_bytes == 0 || usize::from(data_bytes) > MAX_DATA_BYTES {
            return Err(ConfigError::InvalidDataLength(data_bytes));
        }
        Ok(Self {
            command,
            data_bytes,
        })
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Config format version
    pub version: u8,
    /// Recovery from an oversized sysex frame
    pub overflow_policy: OverflowPolicy,
    /// Consecutive idle polls tolerated inside an open sysex frame
    ///
    /// `None` keeps the parser in the frame until a reset arrives.
    pub sysex_watchdog_ticks: Option<u16>,
    /// Plain commands that arm multi-byte data
    pub multi_byte_commands: Vec<MultiByteCommand, MAX_MULTI_BYTE_COMMANDS>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Default configuration: reset on overflow, no watchdog, no multi-byte commands
    pub const fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            overflow_policy: OverflowPolicy::Reset,
            sysex_watchdog_ticks: None,
            multi_byte_commands: Vec::new(),
        }
    }

    /// Set the overflow policy
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Enable the sysex watchdog
    ///
    /// `ticks` is the number of consecutive idle polls that trigger a reset
    /// and must be at least 1.
    pub fn with_sysex_watchdog(mut self, ticks: u16) -> Result<Self, ConfigError> {
        if ticks == 0 {
            return Err(ConfigError::InvalidWatchdog);
        }
        self.sysex_watchdog_ticks = Some(ticks);
        Ok(self)
    }

    /// Register a multi-byte command, replacing an existing entry for it
    pub fn with_multi_byte_command(
        mut self,
        command: u8,
        data_bytes: u8,
    ) -> Result<Self, ConfigError> {
        let entry = MultiByteCommand::new(command, data_bytes)?;
        match self
            .multi_byte_commands
            .iter_mut()
            .find(|e| e.command == command)
        {
            Some(existing) => *existing = entry,
            None => self
                .multi_byte_commands
                .push(entry)
                .map_err(|_| ConfigError::TableFull)?,
        }
        Ok(self)
    }

    /// Serialize to `buf` with postcard, returning the used prefix
    #[cfg(feature = "serde")]
    pub fn to_bytes<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize from postcard bytes, rejecting other format versions
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        if config.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        // Entries may have been edited outside this crate
        if config.sysex_watchdog_ticks == Some(0) {
            return Err(ConfigError::InvalidWatchdog);
        }
        for entry in &config.multi_byte_commands {
            MultiByteCommand::new(entry.command, entry.data_bytes)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.overflow_policy, OverflowPolicy::Reset);
        assert_eq!(config.sysex_watchdog_ticks, None);
        assert!(config.multi_byte_commands.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_overflow_policy(OverflowPolicy::Discard)
            .with_sysex_watchdog(10)
            .unwrap()
            .with_multi_byte_command(0x90, 2)
            .unwrap();
        assert_eq!(config.overflow_policy, OverflowPolicy::Discard);
        assert_eq!(config.sysex_watchdog_ticks, Some(10));
        assert_eq!(config.multi_byte_commands.len(), 1);
    }

    #[test]
    fn test_multi_byte_entry_replaced() {
        let config = EngineConfig::new()
            .with_multi_byte_command(0x90, 2)
            .unwrap()
            .with_multi_byte_command(0x90, 3)
            .unwrap();
        assert_eq!(config.multi_byte_commands.len(), 1);
        assert_eq!(config.multi_byte_commands[0].data_bytes, 3);
    }

    #[test]
    fn test_multi_byte_validation() {
        assert_eq!(
            MultiByteCommand::new(0xF0, 1),
            Err(ConfigError::InvalidCommand(0xF0))
        );
        assert_eq!(
            MultiByteCommand::new(0x91, 1),
            Err(ConfigError::InvalidCommand(0x91))
        );
        assert_eq!(
            MultiByteCommand::new(0x90, 0),
            Err(ConfigError::InvalidDataLength(0))
        );
        assert_eq!(
            MultiByteCommand::new(0x90, 33),
            Err(ConfigError::InvalidDataLength(33))
        );
        assert!(MultiByteCommand::new(0x00, 32).is_ok());
    }

    #[test]
    fn test_zero_watchdog_rejected() {
        assert_eq!(
            EngineConfig::new().with_sysex_watchdog(0),
            Err(ConfigError::InvalidWatchdog)
        );
        let config = EngineConfig::new().with_sysex_watchdog(1).unwrap();
        assert_eq!(config.sysex_watchdog_ticks, Some(1));
    }

    #[test]
    fn test_table_full() {
        let mut config = EngineConfig::new();
        for i in 0..MAX_MULTI_BYTE_COMMANDS as u8 {
            config = config.with_multi_byte_command(i << 4, 1).unwrap();
        }
        assert_eq!(
            config.with_multi_byte_command(0xA0, 1),
            Err(ConfigError::TableFull)
        );
    }
}
