//! Module: settings
//!
//! Purpose: sampling parameters (resolution and packet duration), requested
//! in milliseconds from outside, held in microseconds inside, and shared
//! lock-free between the server handlers and the sampling loop.
//!
//! The deferred-change protocol: a requested resolution becomes *pending*
//! and only takes force at the next packet boundary, so a change never
//! corrupts a packet in progress. Duration applies immediately because it
//! only decides when the current window closes, not how it is filled.
//!
//! Out-of-range requests are clamped, never rejected. The bounds encode
//! hardware responsiveness limits, not taste: below 100 µs resolution or
//! outside 30 ms..20 s duration the board becomes unresponsive.
//!
//! Safety: RT-safe. All shared access via atomics, no locks.

use core::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Hard floor for the sampling interval.
pub const MIN_RESOLUTION_US: u32 = 100;

/// Hard floor for the packet duration.
pub const MIN_DURATION_US: u32 = 30_000;

/// Hard ceiling for the packet duration.
pub const MAX_DURATION_US: u32 = 20_000_000;

/// Power-on resolution, microseconds.
pub const DEFAULT_RESOLUTION_US: u32 = 2_000;

/// Power-on packet duration, microseconds.
pub const DEFAULT_DURATION_US: u32 = 40_000;

/// Default resolution applied when the config document has none, ms.
pub const DEFAULT_RESOLUTION_MS: f64 = 2.0;

/// Default duration applied when the config document has none, ms.
pub const DEFAULT_DURATION_MS: f64 = 60.0;

/// Lock-free sampling settings.
///
/// Lives in a `static`; the HTTP handlers call [`request`](Self::request)
/// and the sampling loop calls [`promote`](Self::promote) at each window
/// boundary. Three atomic words, no coordination needed beyond that.
pub struct SampleSettings {
    /// Resolution requested but not yet in force.
    pending_resolution_us: AtomicU32,
    /// Resolution in force for the current packet window. Written only by
    /// the sampling loop (via `promote`); readable anywhere for status.
    active_resolution_us: AtomicU32,
    /// Packet duration bound. Takes effect immediately on request.
    duration_us: AtomicU32,
}

impl SampleSettings {
    /// Power-on settings.
    pub const fn new() -> Self {
        Self {
            pending_resolution_us: AtomicU32::new(DEFAULT_RESOLUTION_US),
            active_resolution_us: AtomicU32::new(DEFAULT_RESOLUTION_US),
            duration_us: AtomicU32::new(DEFAULT_DURATION_US),
        }
    }

    /// Request new sampling settings, both in milliseconds.
    ///
    /// Clamp formulas, preserved exactly:
    ///
    /// ```text
    /// pending  = max(round(resolution_ms * 1000), 100)
    /// duration = clamp(round(max(duration_ms * 1000, 2 * pending)),
    ///                  30_000, 20_000_000)
    /// ```
    ///
    /// The 2x-pending floor guarantees at least one sample fits even in the
    /// shortest window. Negative or non-finite numbers fall through the
    /// same clamps (an `as u32` cast saturates, NaN becomes 0).
    pub fn request(&self, resolution_ms: f64, duration_ms: f64) {
        let pending = (libm::round(resolution_ms * 1000.0) as u32).max(MIN_RESOLUTION_US);

        let floor = pending as f64 * 2.0;
        // f64::max ignores a NaN argument, so NaN duration resolves to the floor
        let duration = libm::round((duration_ms * 1000.0).max(floor))
            .clamp(MIN_DURATION_US as f64, MAX_DURATION_US as f64) as u32;

        self.pending_resolution_us.store(pending, Ordering::Release);
        self.duration_us.store(duration, Ordering::Release);

        log::info!(
            "sampling settings: resolution {:.1} ms (pending), duration {:.1} ms",
            pending as f64 / 1000.0,
            duration as f64 / 1000.0
        );
    }

    /// Resolution waiting to take force at the next window boundary.
    #[inline]
    pub fn pending_resolution_us(&self) -> u32 {
        self.pending_resolution_us.load(Ordering::Acquire)
    }

    /// Resolution in force for the current window.
    #[inline]
    pub fn active_resolution_us(&self) -> u32 {
        self.active_resolution_us.load(Ordering::Acquire)
    }

    /// Current packet duration bound.
    #[inline]
    pub fn duration_us(&self) -> u32 {
        self.duration_us.load(Ordering::Acquire)
    }

    /// Promote the pending resolution to active and return it.
    ///
    /// Called by the sampling loop only, at a packet boundary.
    #[inline]
    pub fn promote(&self) -> u32 {
        let pending = self.pending_resolution_us.load(Ordering::Acquire);
        self.active_resolution_us.store(pending, Ordering::Release);
        pending
    }

    /// Currently active settings converted back to milliseconds, for the
    /// settings-read endpoint.
    pub fn active_millis(&self) -> (f64, f64) {
        (
            self.active_resolution_us() as f64 / 1000.0,
            self.duration_us() as f64 / 1000.0,
        )
    }

    /// Settings-read message reflecting the active values.
    pub fn read_message(&self) -> SettingsMessage {
        let (resolution, duration) = self.active_millis();
        SettingsMessage {
            resolution,
            duration,
        }
    }
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire message for both the settings request body and the settings read
/// response: two numbers, milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsMessage {
    pub resolution: f64,
    pub duration: f64,
}

impl SettingsMessage {
    /// Parse a request body. Malformed JSON yields `None`; the endpoint
    /// then simply leaves the settings alone.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json_core::from_str::<Self>(raw).ok().map(|(msg, _)| msg)
    }

    /// Serialize for the read endpoint.
    pub fn to_json(&self) -> Option<heapless::String<96>> {
        serde_json_core::to_string::<_, 96>(self).ok()
    }
}
