//! Module: trigger
//!
//! Purpose: single-slot latch for the hardware trigger timestamp. The
//! rising-edge ISR stores the current clock reading; the sampling loop
//! reads-and-clears it once per packet window.
//!
//! This is the only mutable state shared between the interrupt and the
//! loop. Discipline: interrupt writes, loop reads-and-clears, last writer
//! wins, no queueing. A raw value of 0 means "empty", which is also what
//! packet metadata reports as a trigger time of 0.0 ms.
//!
//! Safety: RT/ISR-safe. One atomic word, no locks, no allocation.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::clock::Micros;

/// Latched timestamp of the most recent trigger edge.
///
/// `const`-constructible so it can live in a `static` shared between the
/// ISR registration and the sampling loop.
pub struct TriggerLatch {
    /// Raw microsecond reading; 0 = no edge since the last window close.
    last_edge_us: AtomicU32,
}

impl TriggerLatch {
    /// Create an empty latch.
    pub const fn new() -> Self {
        Self {
            last_edge_us: AtomicU32::new(0),
        }
    }

    /// Record a trigger edge at `now`. ISR path.
    ///
    /// One atomic store, bounded time, touches nothing else. Overwrites any
    /// previous edge: within a window only the most recent edge survives.
    #[inline]
    pub fn record(&self, now: Micros) {
        self.last_edge_us.store(now.raw(), Ordering::Release);
    }

    /// Read and clear the latch. Called by the window-closing step.
    ///
    /// Returns `None` if no edge was recorded since the previous call.
    #[inline]
    pub fn take(&self) -> Option<Micros> {
        match self.last_edge_us.swap(0, Ordering::AcqRel) {
            0 => None,
            us => Some(Micros::from_raw(us)),
        }
    }

    /// Read without clearing (diagnostics only).
    #[inline]
    pub fn peek(&self) -> Option<Micros> {
        match self.last_edge_us.load(Ordering::Acquire) {
            0 => None,
            us => Some(Micros::from_raw(us)),
        }
    }
}

impl Default for TriggerLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_starts_empty() {
        let latch = TriggerLatch::new();
        assert_eq!(latch.peek(), None);
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn test_take_clears() {
        let latch = TriggerLatch::new();
        latch.record(Micros::from_raw(5_000));

        assert_eq!(latch.take(), Some(Micros::from_raw(5_000)));
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn test_last_writer_wins() {
        let latch = TriggerLatch::new();
        latch.record(Micros::from_raw(1_000));
        latch.record(Micros::from_raw(2_000));
        latch.record(Micros::from_raw(3_000));

        // No queueing: only the most recent edge survives
        assert_eq!(latch.take(), Some(Micros::from_raw(3_000)));
        assert_eq!(latch.take(), None);
    }

    #[test]
    fn test_peek_does_not_clear() {
        let latch = TriggerLatch::new();
        latch.record(Micros::from_raw(7_500));

        assert_eq!(latch.peek(), Some(Micros::from_raw(7_500)));
        assert_eq!(latch.take(), Some(Micros::from_raw(7_500)));
    }
}
