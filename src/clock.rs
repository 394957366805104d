//! Module: clock
//!
//! Purpose: readings of the monotonic microsecond counter, and the one rule
//! that keeps rollover harmless: durations come from wrapping subtraction,
//! never from comparing two readings.
//!
//! The counter is 32 bits and wraps roughly every 71.6 minutes. Every span
//! the scope cares about is bounded by the 20 s packet-duration ceiling, so
//! a wrapped delta is always the true delta. 32 bits (not 64) also keeps a
//! reading a single word, which is what lets the trigger latch be one plain
//! atomic on the ESP32.
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// One reading of the monotonic microsecond counter.
///
/// Deliberately does not implement `Ord`: comparing two readings is
/// meaningless across a wrap. Use [`Micros::elapsed_since`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Micros(u32);

impl Micros {
    /// The zero reading. Also the trigger latch's "empty" sentinel.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw counter value.
    pub const fn from_raw(us: u32) -> Self {
        Self(us)
    }

    /// Raw counter value in microseconds.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Microseconds elapsed from `start` to this reading.
    ///
    /// Wrapping subtraction: correct across counter rollover as long as the
    /// real span is under the 32-bit period (~71.6 min).
    pub const fn elapsed_since(self, start: Micros) -> u32 {
        self.0.wrapping_sub(start.0)
    }

    /// This reading as floating-point milliseconds.
    ///
    /// Milliseconds are the external unit everywhere (config, settings
    /// endpoints, packet metadata); microseconds stay internal. Precision
    /// loss here is accepted, the values are for display.
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

/// Source of [`Micros`] readings.
///
/// The device implementation reads the ESP high-resolution timer; tests
/// inject a hand-advanced fake. Takes `&self` so one clock can be shared
/// with anything else in the loop.
pub trait MonotonicClock {
    fn now(&self) -> Micros;
}

/// Microseconds as floating-point milliseconds (for elapsed spans).
pub fn us_to_ms(us: u32) -> f64 {
    us as f64 / 1000.0
}
