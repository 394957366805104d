//! Module: status
//!
//! Purpose: the two binary lock outputs (slow and fast feedback loops) and
//! the status message reporting them. The enable/disable endpoints are
//! plain register writes with no state machine; the flags here only exist
//! because reading an OUTPUT-mode pin back is unreliable, so the firmware
//! mirrors what it last wrote.

use core::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

/// Mirror of the lock output pins. Shareable as a `static` between the
/// HTTP handlers and the status endpoint.
pub struct LockOutputs {
    slow: AtomicBool,
    fast: AtomicBool,
}

impl LockOutputs {
    /// Both locks disengaged; the pins must begin low.
    pub const fn new() -> Self {
        Self {
            slow: AtomicBool::new(false),
            fast: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn set_slow(&self, engaged: bool) {
        self.slow.store(engaged, Ordering::Release);
    }

    #[inline]
    pub fn set_fast(&self, engaged: bool) {
        self.fast.store(engaged, Ordering::Release);
    }

    #[inline]
    pub fn slow(&self) -> bool {
        self.slow.load(Ordering::Acquire)
    }

    #[inline]
    pub fn fast(&self) -> bool {
        self.fast.load(Ordering::Acquire)
    }

    /// Status message with the given display name.
    pub fn status<'a>(&self, name: &'a str) -> Status<'a> {
        Status {
            name,
            slow: self.slow(),
            fast: self.fast(),
        }
    }
}

impl Default for LockOutputs {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire message for the status endpoint.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Status<'a> {
    pub name: &'a str,
    pub slow: bool,
    pub fast: bool,
}

impl Status<'_> {
    pub fn to_json(&self) -> Option<heapless::String<192>> {
        serde_json_core::to_string::<_, 192>(self).ok()
    }
}
