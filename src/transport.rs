//! Module: transport
//!
//! Purpose: core-side contracts of the stream transport. The outbound half
//! ([`PacketSink`](crate::packet::PacketSink)) lives with the packet types;
//! this module holds the inbound half: the one-byte remote control channel
//! that drives the piezo feedback output.
//!
//! The transport itself (WebSocket sessions, queues) is an external
//! collaborator. The core never registers callbacks with it; it polls a
//! [`ControlSource`] once per loop pass, which keeps the scheduler free of
//! any particular event-loop mechanism.

use crate::hal::FeedbackDac;

/// Inbound control channel: at most one pending byte, polled per pass.
pub trait ControlSource {
    fn try_recv(&mut self) -> Option<u8>;
}

/// Extract the control byte from an inbound binary frame.
///
/// The wire contract is a single unsigned byte per message; anything else
/// (empty, longer, fragmented upstream) is discarded silently.
#[inline]
pub fn decode_control_frame(data: &[u8]) -> Option<u8> {
    if data.len() == 1 {
        Some(data[0])
    } else {
        None
    }
}

/// Poll the control channel once and write any byte straight through to
/// the feedback DAC. Returns the byte applied, if any.
pub fn service_control<C, D>(ctrl: &mut C, dac: &mut D) -> Option<u8>
where
    C: ControlSource,
    D: FeedbackDac,
{
    let level = ctrl.try_recv()?;
    dac.set_level(level);
    Some(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_byte() {
        assert_eq!(decode_control_frame(&[128]), Some(128));
    }

    #[test]
    fn test_decode_discards_wrong_length() {
        assert_eq!(decode_control_frame(&[]), None);
        assert_eq!(decode_control_frame(&[1, 2]), None);
        assert_eq!(decode_control_frame(&[0; 16]), None);
    }

    struct OneShot(Option<u8>);
    impl ControlSource for OneShot {
        fn try_recv(&mut self) -> Option<u8> {
            self.0.take()
        }
    }

    struct RecordingDac(Option<u8>);
    impl FeedbackDac for RecordingDac {
        fn set_level(&mut self, level: u8) {
            self.0 = Some(level);
        }
    }

    #[test]
    fn test_service_control_writes_through() {
        let mut ctrl = OneShot(Some(200));
        let mut dac = RecordingDac(None);

        assert_eq!(service_control(&mut ctrl, &mut dac), Some(200));
        assert_eq!(dac.0, Some(200));

        // Channel drained: nothing further happens
        assert_eq!(service_control(&mut ctrl, &mut dac), None);
        assert_eq!(dac.0, Some(200));
    }
}
