//! # RemoteLaserScope
//!
//! ESP32 firmware core for a networked laser oscilloscope and lock
//! monitor: digitizes one analog input, packages the samples into
//! time-windowed packets, and streams them to a remote viewer, alongside
//! two binary lock outputs and one analog feedback output.
//!
//! ## Architecture
//!
//! One cooperative loop ([`Sampler::step`](sampler::Sampler::step)) owns
//! all sampling state and is preempted only by the trigger-edge ISR, whose
//! single word of shared state is the [`TriggerLatch`]. Settings changes
//! are deferred to packet boundaries so a window in flight is never
//! corrupted.
//!
//! Everything in this crate is hardware-free and host-testable; the I/O
//! seams are the traits in [`hal`], [`packet`] and [`transport`], and the
//! ESP-IDF side of each lives behind `target_os = "espidf"`.

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod config;
pub mod hal;
pub mod packet;
pub mod sampler;
pub mod settings;
pub mod status;
pub mod transport;
pub mod trigger;

pub use clock::{Micros, MonotonicClock};
pub use config::DeviceConfig;
pub use packet::{PacketMeta, PacketSink, SampleBuffer, SAMPLE_BUFFER_SIZE};
pub use sampler::{Sampler, Step};
pub use settings::{SampleSettings, SettingsMessage};
pub use status::LockOutputs;
pub use transport::ControlSource;
pub use trigger::TriggerLatch;
