//! Module: packet
//!
//! Purpose: one packet window's worth of samples and the metadata that
//! precedes it on the wire. A window is emitted as a compact JSON text
//! message (`start`, `elapsed`, `trigTime`, all milliseconds) immediately
//! followed by one binary message of raw sample bytes; the consumer relies
//! on that ordering to pair payload with metadata.
//!
//! Safety: Safe. No unsafe blocks. The buffer is owned exclusively by the
//! sampling scheduler; nothing here is shared.

use serde::Serialize;

use crate::clock::{us_to_ms, Micros};

/// Samples per packet window, upper bound. Filling the buffer closes the
/// window early; it is not an error.
pub const SAMPLE_BUFFER_SIZE: usize = 4096;

/// Fixed-capacity sample store for the live packet window.
///
/// Capacity is fixed at build time; "clearing" just resets the fill index,
/// the bytes are overwritten by the next window.
pub struct SampleBuffer<const N: usize = SAMPLE_BUFFER_SIZE> {
    samples: [u8; N],
    len: usize,
}

impl<const N: usize> SampleBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            samples: [0; N],
            len: 0,
        }
    }

    /// Append one sample. Returns `false` (and stores nothing) when full.
    #[inline]
    pub fn push(&mut self, sample: u8) -> bool {
        if self.len >= N {
            return false;
        }
        self.samples[self.len] = sample;
        self.len += 1;
        true
    }

    /// Current fill count; doubles as the live sample index.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// The filled portion, i.e. the binary payload for this window.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.samples[..self.len]
    }

    /// Reset the fill index for the next window.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata heralding one packet window.
///
/// Field names are the wire contract with the viewer page; `trigTime` is
/// 0.0 when no trigger edge occurred during the window.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PacketMeta {
    /// Window start, ms since counter start (wraps with the counter).
    pub start: f64,
    /// Window span, ms.
    pub elapsed: f64,
    /// Most recent trigger edge, ms; 0.0 = no trigger this window.
    #[serde(rename = "trigTime")]
    pub trig_time: f64,
}

impl PacketMeta {
    /// Build metadata from the window's integer-microsecond readings.
    pub fn new(start: Micros, elapsed_us: u32, trigger: Option<Micros>) -> Self {
        Self {
            start: start.as_millis_f64(),
            elapsed: us_to_ms(elapsed_us),
            trig_time: trigger.map_or(0.0, Micros::as_millis_f64),
        }
    }

    /// Serialize to the text message that precedes the payload.
    pub fn to_json(&self) -> Option<heapless::String<128>> {
        serde_json_core::to_string::<_, 128>(self).ok()
    }
}

/// Outbound side of the stream transport (an opaque ordered broadcast).
///
/// The scheduler drives this once per window close:
/// 1. `has_consumers()` gates the whole Idle/Sampling state,
/// 2. `ready_for_all()` gates emission; when any consumer's outbound
///    queue is saturated the window is skipped whole, no partial send,
///    no buffering for later,
/// 3. `send_meta` is called strictly before `send_samples`.
pub trait PacketSink {
    /// Is any consumer currently attached? Polled every pass.
    fn has_consumers(&self) -> bool;

    /// Can every attached consumer accept a write right now?
    fn ready_for_all(&self) -> bool;

    /// Broadcast the metadata text message.
    fn send_meta(&mut self, meta: &PacketMeta);

    /// Broadcast the binary payload. Always immediately after `send_meta`.
    fn send_samples(&mut self, samples: &[u8]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_push_and_slice() {
        let mut buf: SampleBuffer<4> = SampleBuffer::new();
        assert!(buf.is_empty());

        assert!(buf.push(10));
        assert!(buf.push(20));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.as_slice(), &[10, 20]);
    }

    #[test]
    fn test_buffer_refuses_when_full() {
        let mut buf: SampleBuffer<2> = SampleBuffer::new();
        assert!(buf.push(1));
        assert!(buf.push(2));
        assert!(buf.is_full());

        assert!(!buf.push(3));
        assert_eq!(buf.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_buffer_clear_resets_index() {
        let mut buf: SampleBuffer<4> = SampleBuffer::new();
        buf.push(1);
        buf.push(2);
        buf.clear();

        assert!(buf.is_empty());
        assert_eq!(buf.as_slice(), &[] as &[u8]);

        buf.push(9);
        assert_eq!(buf.as_slice(), &[9]);
    }

    #[test]
    fn test_meta_from_readings() {
        let meta = PacketMeta::new(
            Micros::from_raw(100_000),
            40_000,
            Some(Micros::from_raw(120_000)),
        );
        assert_eq!(meta.start, 100.0);
        assert_eq!(meta.elapsed, 40.0);
        assert_eq!(meta.trig_time, 120.0);
    }

    #[test]
    fn test_meta_no_trigger_is_zero() {
        let meta = PacketMeta::new(Micros::from_raw(5_000), 30_000, None);
        assert_eq!(meta.trig_time, 0.0);
    }

    #[test]
    fn test_meta_json_field_names() {
        let meta = PacketMeta::new(Micros::from_raw(1_000), 2_000, None);
        let json = meta.to_json().unwrap();
        assert!(json.contains("\"start\""));
        assert!(json.contains("\"elapsed\""));
        assert!(json.contains("\"trigTime\""));
    }
}
