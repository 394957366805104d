//! Module: sampler
//!
//! Purpose: the cooperative sampling scheduler. One `step` per loop pass,
//! no blocking anywhere, preempted only by the trigger ISR.
//!
//! States: `Idle` (no consumer attached) and `Sampling`; packet close is a
//! `Sampling -> Sampling` transition. While idle the window start tracks
//! "now" and the buffer stays empty, so no backlog accumulates while the
//! scope is unobserved and the first packet after a viewer attaches starts
//! from a fresh origin instead of replaying history.
//!
//! The sample schedule is *at-least*, not a fixed-tick timer: a sample is
//! due once `elapsed >= resolution * index`. If the loop is delayed the
//! intervals compress rather than a sample being skipped, so the count per
//! window is timing-accurate while individual intervals jitter upward,
//! never downward.
//!
//! Nothing in here halts the loop: a full buffer closes the window early,
//! a congested transport drops the window, and that is the whole failure
//! model. No retry, no backoff, no cancellation.

use crate::clock::{Micros, MonotonicClock};
use crate::hal::{quantize, AnalogSource};
use crate::packet::{PacketMeta, PacketSink, SampleBuffer, SAMPLE_BUFFER_SIZE};
use crate::settings::SampleSettings;
use crate::trigger::TriggerLatch;

/// What one scheduler pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// No consumer attached; window origin reset to now.
    Idle,
    /// Consumer attached, next sample not yet due.
    Waiting,
    /// Took one sample into the live window.
    Sampled,
    /// Closed the window. `emitted` is false when the transport could not
    /// take writes for every consumer and the window was dropped whole.
    Closed { emitted: bool, len: usize },
}

/// The sampling scheduler and the one live packet window it owns.
///
/// Exclusive owner of the buffer and sample index; the only concurrent
/// touch on its state is the ISR write into the [`TriggerLatch`].
pub struct Sampler<'a, const N: usize = SAMPLE_BUFFER_SIZE> {
    settings: &'a SampleSettings,
    trigger: &'a TriggerLatch,
    window_start: Micros,
    /// Resolution in force for this window; refreshed from the pending
    /// value only at window boundaries.
    active_resolution_us: u32,
    buffer: SampleBuffer<N>,
}

impl<'a, const N: usize> Sampler<'a, N> {
    /// Create a scheduler starting a fresh window at `now`.
    pub fn new(settings: &'a SampleSettings, trigger: &'a TriggerLatch, now: Micros) -> Self {
        Self {
            settings,
            trigger,
            window_start: now,
            active_resolution_us: settings.promote(),
            buffer: SampleBuffer::new(),
        }
    }

    /// One cooperative pass. Must return promptly; never blocks.
    pub fn step<C, A, S>(&mut self, clock: &C, analog: &mut A, sink: &mut S) -> Step
    where
        C: MonotonicClock,
        A: AnalogSource,
        S: PacketSink,
    {
        let now = clock.now();

        if !sink.has_consumers() {
            // Nobody is listening: keep the origin fresh, take nothing.
            self.window_start = now;
            self.buffer.clear();
            return Step::Idle;
        }

        let elapsed = now.elapsed_since(self.window_start);

        // Next sample is due once elapsed >= resolution * index. The u64
        // product cannot overflow; elapsed alone can reach u32::MAX.
        let due = self.active_resolution_us as u64 * self.buffer.len() as u64;
        let mut sampled = false;
        if elapsed as u64 >= due && !self.buffer.is_full() {
            self.buffer.push(quantize(analog.sample_raw()));
            sampled = true;
        }

        if elapsed >= self.settings.duration_us() || self.buffer.is_full() {
            return self.close_window(now, elapsed, sink);
        }

        if sampled {
            Step::Sampled
        } else {
            Step::Waiting
        }
    }

    /// Close the window: emit (or drop) it, then start the next one.
    ///
    /// The trigger latch is cleared and the pending resolution promoted on
    /// every close, emitted or not.
    fn close_window<S: PacketSink>(&mut self, now: Micros, elapsed: u32, sink: &mut S) -> Step {
        let len = self.buffer.len();
        let trigger = self.trigger.take();

        let emitted = if sink.ready_for_all() {
            let meta = PacketMeta::new(self.window_start, elapsed, trigger);
            // Ordering contract: metadata strictly before payload.
            sink.send_meta(&meta);
            sink.send_samples(self.buffer.as_slice());
            true
        } else {
            // A saturated consumer queue drops the whole window. No partial
            // send, no buffering for later, no backpressure on this loop.
            false
        };

        self.buffer.clear();
        self.active_resolution_us = self.settings.promote();
        self.window_start = now;

        Step::Closed { emitted, len }
    }

    /// Origin of the live window.
    #[inline]
    pub fn window_start(&self) -> Micros {
        self.window_start
    }

    /// Resolution in force for the live window.
    #[inline]
    pub fn active_resolution_us(&self) -> u32 {
        self.active_resolution_us
    }

    /// Samples taken into the live window so far.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }
}
