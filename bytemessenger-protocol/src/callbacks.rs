//! Callback registry
//!
//! One slot per message category. Handlers are capability traits so they
//! can carry their own state; plain closures implement them through the
//! blanket impls. The registry borrows each handler for `'a`, which keeps
//! the engine free of global state and allocation.

/// Handler for system reset events
pub trait ResetHandler {
    /// Called once per reset, after the engine state is fully clean
    fn on_system_reset(&mut self);
}

impl<F: FnMut()> ResetHandler for F {
    fn on_system_reset(&mut self) {
        self()
    }
}

/// Handler for completed sysex frames
pub trait SysexHandler {
    /// Called with the frame's sub-command and its remaining bytes
    ///
    /// `data` is still 7-bit pair encoded; see
    /// [`decode_values`](crate::messages::decode_values).
    fn on_sysex(&mut self, sub_command: u8, data: &[u8]);
}

impl<F: FnMut(u8, &[u8])> SysexHandler for F {
    fn on_sysex(&mut self, sub_command: u8, data: &[u8]) {
        self(sub_command, data)
    }
}

/// Callback categories with defined dispatch behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallbackCategory {
    /// System reset (0xFF or an explicit reset call)
    SystemReset,
    /// Completed sysex frame
    Sysex,
}

/// A handler tagged with its category
pub enum Callback<'a> {
    /// Reset handler
    SystemReset(&'a mut dyn ResetHandler),
    /// Sysex handler
    Sysex(&'a mut dyn SysexHandler),
}

impl Callback<'_> {
    /// Category this handler occupies
    pub fn category(&self) -> CallbackCategory {
        match self {
            Callback::SystemReset(_) => CallbackCategory::SystemReset,
            Callback::Sysex(_) => CallbackCategory::Sysex,
        }
    }
}

/// Single-slot handler storage
#[derive(Default)]
pub struct CallbackRegistry<'a> {
    reset: Option<&'a mut dyn ResetHandler>,
    sysex: Option<&'a mut dyn SysexHandler>,
}

impl<'a> CallbackRegistry<'a> {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            reset: None,
            sysex: None,
        }
    }

    /// Install a handler, returning the one it displaced
    pub fn attach(&mut self, callback: Callback<'a>) -> Option<Callback<'a>> {
        match callback {
            Callback::SystemReset(handler) => {
                self.reset.replace(handler).map(Callback::SystemReset)
            }
            Callback::Sysex(handler) => self.sysex.replace(handler).map(Callback::Sysex),
        }
    }

    /// Clear a slot, returning the handler it held
    pub fn detach(&mut self, category: CallbackCategory) -> Option<Callback<'a>> {
        match category {
            CallbackCategory::SystemReset => self.reset.take().map(Callback::SystemReset),
            CallbackCategory::Sysex => self.sysex.take().map(Callback::Sysex),
        }
    }

    /// True if the slot for `category` is occupied
    pub fn is_attached(&self, category: CallbackCategory) -> bool {
        match category {
            CallbackCategory::SystemReset => self.reset.is_some(),
            CallbackCategory::Sysex => self.sysex.is_some(),
        }
    }

    /// Invoke the reset handler, if any
    pub fn dispatch_reset(&mut self) -> bool {
        match self.reset.as_mut() {
            Some(handler) => {
                handler.on_system_reset();
                true
            }
            None => false,
        }
    }

    /// Invoke the sysex handler, if any
    pub fn dispatch_sysex(&mut self, sub_command: u8, data: &[u8]) -> bool {
        match self.sysex.as_mut() {
            Some(handler) => {
                handler.on_sysex(sub_command, data);
                true
            }
            None => false,
        }
    }
}
