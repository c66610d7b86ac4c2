//! Protocol engine
//!
//! [`Messenger`] owns one transport, one [`FrameParser`] and one
//! [`CallbackRegistry`]. An external driver loop calls [`Messenger::poll`]
//! once per scheduling tick; there are no threads, tasks or suspension
//! points inside the engine.
//!
//! Handlers are borrowed as `&mut dyn`, which makes the engine `!Send` and
//! `!Sync`: sharing one instance between an interrupt handler and the main
//! loop does not compile. Hand the engine to exactly one execution context.
//!
//! # Liveness
//!
//! A sysex frame that never sees `END_SYSEX` keeps the parser in
//! [`ParseState::InSysex`] until a `SYSTEM_RESET` byte or a call to
//! [`Messenger::reset`]. Hardware modules rely on that reset path for
//! recovery. [`EngineConfig::sysex_watchdog_ticks`] bounds the stall in
//! poll ticks when enabled; it is off by default.

use bytemessenger_hal::ByteTransport;

use crate::callbacks::{Callback, CallbackCategory, CallbackRegistry, ResetHandler, SysexHandler};
use crate::config::{EngineConfig, OverflowPolicy};
use crate::encoder::{write_sysex, EncodeError, WriteError};
use crate::messages::SysexMessage;
use crate::parser::{FrameParser, MultiByteMessage, ParseError, ParseEvent, ParseState};
use crate::wire::MAX_DATA_BYTES;

/// Errors surfaced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError<E> {
    /// Transport read or write failed
    Transport(E),
    /// Inbound byte stream was malformed
    Parse(ParseError),
    /// Outbound message rejected before sending
    Encode(EncodeError),
    /// Sysex frame stalled past the watchdog limit and was reset
    SysexTimeout,
}

impl<E> From<ParseError> for EngineError<E> {
    fn from(e: ParseError) -> Self {
        EngineError::Parse(e)
    }
}

impl<E> From<EncodeError> for EngineError<E> {
    fn from(e: EncodeError) -> Self {
        EngineError::Encode(e)
    }
}

impl<E> From<WriteError<E>> for EngineError<E> {
    fn from(e: WriteError<E>) -> Self {
        match e {
            WriteError::Encode(e) => EngineError::Encode(e),
            WriteError::Transport(e) => EngineError::Transport(e),
        }
    }
}

/// Running counters, for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    /// Bytes passed to `process_byte`
    pub bytes_processed: u32,
    /// Sysex frames completed (whether or not a handler was attached)
    pub frames_dispatched: u32,
    /// `START_SYSEX` immediately closed by `END_SYSEX`
    pub empty_frames: u32,
    /// Commands accepted and dropped
    pub commands_ignored: u32,
    /// Armed multi-byte runs completed
    pub multi_byte_completed: u32,
    /// Sysex frames dropped for exceeding the buffer
    pub overflows: u32,
    /// Sysex frames dropped by the watchdog
    pub watchdog_resets: u32,
    /// Reset events, each of which fired the reset handler if attached
    pub resets: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

/// Transport-parameterized protocol engine
pub struct Messenger<'a, T: ByteTransport> {
    transport: T,
    parser: FrameParser,
    callbacks: CallbackRegistry<'a>,
    config: EngineConfig,
    multi_byte: Option<MultiByteMessage>,
    /// Consecutive polls without sysex progress
    sysex_idle_ticks: u16,
    sysex_progress: bool,
    stats: EngineStats,
}

impl<'a, T: ByteTransport> Messenger<'a, T> {
    /// Create an engine with the default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::new())
    }

    /// Create an engine with an explicit configuration
    ///
    /// The engine starts reset: idle, zeroed buffer, no handlers.
    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        info!(
            "messenger ready: {} multi-byte commands, watchdog {}",
            config.multi_byte_commands.len(),
            config.sysex_watchdog_ticks.unwrap_or(0)
        );
        Self {
            transport,
            parser: FrameParser::with_multi_byte_commands(config.multi_byte_commands.clone()),
            callbacks: CallbackRegistry::new(),
            config,
            multi_byte: None,
            sysex_idle_ticks: 0,
            sysex_progress: false,
            stats: EngineStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Receive handling

    /// Bytes the transport can deliver without blocking
    pub fn available(&mut self) -> Result<usize, EngineError<T::Error>> {
        self.transport.available().map_err(EngineError::Transport)
    }

    /// Read and process one byte if the transport has one
    ///
    /// Returns whether a byte was processed.
    pub fn process_input(&mut self) -> Result<bool, EngineError<T::Error>> {
        if self.available()? == 0 {
            return Ok(false);
        }
        match self.transport.read().map_err(EngineError::Transport)? {
            Some(byte) => {
                self.process_byte(byte)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drain every available byte, then advance the sysex watchdog
    ///
    /// Call once per scheduling tick. Stops at the first error; bytes still
    /// buffered are picked up on the next call. Returns the number of bytes
    /// processed.
    pub fn poll(&mut self) -> Result<usize, EngineError<T::Error>> {
        let mut processed = 0;
        while self.process_input()? {
            processed += 1;
        }
        self.tick()?;
        Ok(processed)
    }

    /// Consume one byte the transport already delivered
    ///
    /// May dispatch a handler before returning. A sysex overflow is
    /// reported as [`ParseError::SysexOverflow`] after recovery per
    /// [`OverflowPolicy`].
    pub fn process_byte(&mut self, byte: u8) -> Result<(), EngineError<T::Error>> {
        bump(&mut self.stats.bytes_processed);

        // The event borrows the parser buffer; whole-engine work waits
        // until after the match.
        let mut reset = false;
        let mut overflow = false;
        match self.parser.feed(byte) {
            Ok(ParseEvent::Pending) => {}
            Ok(ParseEvent::Sysex { sub_command, data }) => {
                trace!("sysex {:#x}, {} bytes", sub_command, data.len());
                bump(&mut self.stats.frames_dispatched);
                self.callbacks.dispatch_sysex(sub_command, data);
            }
            Ok(ParseEvent::EmptySysex) => {
                trace!("empty sysex frame");
                bump(&mut self.stats.empty_frames);
            }
            Ok(ParseEvent::SystemReset) => reset = true,
            Ok(ParseEvent::MultiByte(message)) => {
                debug!(
                    "multi-byte {:#x} ch {} complete",
                    message.command, message.channel
                );
                bump(&mut self.stats.multi_byte_completed);
                self.multi_byte = Some(message);
            }
            Ok(ParseEvent::Ignored(classified)) => {
                trace!("ignored command {:#x}", classified.command);
                bump(&mut self.stats.commands_ignored);
            }
            Err(ParseError::SysexOverflow) => {
                warn!("sysex frame exceeded {} bytes", MAX_DATA_BYTES);
                bump(&mut self.stats.overflows);
                overflow = true;
            }
            Err(e) => return Err(e.into()),
        }

        if overflow {
            return Err(self.recover_from_overflow());
        }
        if reset {
            self.finish_reset();
        } else if self.parser.state() == ParseState::InSysex {
            self.sysex_progress = true;
        }
        Ok(())
    }

    /// Parser already dropped the frame; apply the overflow policy
    fn recover_from_overflow(&mut self) -> EngineError<T::Error> {
        self.clear_engine_state();
        if self.config.overflow_policy == OverflowPolicy::Reset {
            self.finish_reset();
        }
        EngineError::Parse(ParseError::SysexOverflow)
    }

    /// Advance the sysex watchdog by one poll tick
    ///
    /// [`poll`](Self::poll) calls this; drivers that feed bytes through
    /// [`process_byte`](Self::process_byte) themselves call it once per tick.
    pub fn tick(&mut self) -> Result<(), EngineError<T::Error>> {
        let limit = match self.config.sysex_watchdog_ticks {
            Some(limit) => limit,
            None => return Ok(()),
        };

        if self.parser.state() != ParseState::InSysex {
            self.sysex_idle_ticks = 0;
            self.sysex_progress = false;
            return Ok(());
        }
        if core::mem::take(&mut self.sysex_progress) {
            self.sysex_idle_ticks = 0;
            return Ok(());
        }

        self.sysex_idle_ticks = self.sysex_idle_ticks.saturating_add(1);
        if self.sysex_idle_ticks < limit {
            return Ok(());
        }

        warn!("sysex frame stalled for {} ticks, resetting", self.sysex_idle_ticks);
        bump(&mut self.stats.watchdog_resets);
        self.reset();
        Err(EngineError::SysexTimeout)
    }

    /// Take the last completed multi-byte message
    pub fn take_multi_byte(&mut self) -> Option<MultiByteMessage> {
        self.multi_byte.take()
    }

    /// Arm the parser for `count` data bytes belonging to `command`
    pub fn arm_multi_byte(
        &mut self,
        command: u8,
        channel: u8,
        count: u8,
    ) -> Result<(), EngineError<T::Error>> {
        self.parser.arm(command, channel & 0x0F, count)?;
        self.sysex_progress = false;
        self.sysex_idle_ticks = 0;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reset

    /// Reinitialize all parser state, then fire the reset handler once
    pub fn reset(&mut self) {
        self.parser.reset();
        self.finish_reset();
    }

    fn clear_engine_state(&mut self) {
        self.multi_byte = None;
        self.sysex_idle_ticks = 0;
        self.sysex_progress = false;
    }

    /// Parser state is already clean; notify
    fn finish_reset(&mut self) {
        self.clear_engine_state();
        bump(&mut self.stats.resets);
        debug!("system reset");
        self.callbacks.dispatch_reset();
    }

    // ------------------------------------------------------------------
    // Send handling

    /// Send `command` and its 14-bit values as a sysex frame
    ///
    /// The command must be below 0x80 and every value at most 0x3FFF;
    /// otherwise nothing is written.
    pub fn send_sysex(&mut self, command: u8, values: &[u16]) -> Result<(), EngineError<T::Error>> {
        write_sysex(&mut self.transport, command, values).map_err(|e| {
            if let WriteError::Encode(_) = e {
                warn!("rejected outgoing sysex {:#x}", command);
            }
            EngineError::from(e)
        })
    }

    /// Send a prepared message
    pub fn send_message(&mut self, message: &SysexMessage) -> Result<(), EngineError<T::Error>> {
        self.send_sysex(message.command, &message.values)
    }

    // ------------------------------------------------------------------
    // Callbacks

    /// Install a handler, returning the one it displaced
    pub fn attach(&mut self, callback: Callback<'a>) -> Option<Callback<'a>> {
        self.callbacks.attach(callback)
    }

    /// Clear a handler slot, returning the handler it held
    pub fn detach(&mut self, category: CallbackCategory) -> Option<Callback<'a>> {
        self.callbacks.detach(category)
    }

    /// Install the system reset handler
    pub fn on_system_reset(&mut self, handler: &'a mut dyn ResetHandler) -> Option<Callback<'a>> {
        self.attach(Callback::SystemReset(handler))
    }

    /// Install the sysex handler
    pub fn on_sysex(&mut self, handler: &'a mut dyn SysexHandler) -> Option<Callback<'a>> {
        self.attach(Callback::Sysex(handler))
    }

    // ------------------------------------------------------------------
    // Inspection

    /// Current parser regime
    pub fn state(&self) -> ParseState {
        self.parser.state()
    }

    /// Raw accumulation buffer
    pub fn buffer(&self) -> &[u8; MAX_DATA_BYTES] {
        self.parser.buffer()
    }

    /// Channel nibble of the last classified command
    pub fn channel(&self) -> u8 {
        self.parser.channel()
    }

    /// Counters since construction
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport (e.g. to feed an I2C receive event)
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport
    pub fn into_transport(self) -> T {
        self.transport
    }
}
