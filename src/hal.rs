//! Module: hal
//!
//! Purpose: the scope's I/O seams. Business logic stays in the core
//! modules; HAL is just I/O. The traits are what the scheduler sees, the
//! ESP-IDF implementations live behind `target_os = "espidf"` so the core
//! builds and tests on the host.

/// The analog input the scope digitizes.
///
/// Readings are the converter's native 12-bit range (0..=4095).
pub trait AnalogSource {
    fn sample_raw(&mut self) -> u16;
}

/// The analog feedback output (piezo offset), driven one byte at a time by
/// the remote control channel.
pub trait FeedbackDac {
    fn set_level(&mut self, level: u8);
}

/// Scale a native 12-bit reading down to one sample byte.
///
/// Divide by 16, not a shift-by-config: the 12-bit depth is a property of
/// this converter and the wire format is one byte per sample.
#[inline]
pub fn quantize(raw: u16) -> u8 {
    (raw / 16).min(255) as u8
}

#[cfg(target_os = "espidf")]
pub mod esp {
    //! Device-side implementations of the I/O traits.

    use esp_idf_svc::hal::adc::attenuation::DB_11;
    use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
    use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
    use esp_idf_svc::hal::adc::ADC1;
    use esp_idf_svc::hal::gpio::Gpio26;
    use esp_idf_svc::hal::gpio::Gpio34;
    use esp_idf_svc::sys;

    use super::{AnalogSource, FeedbackDac};
    use crate::clock::{Micros, MonotonicClock};

    /// The ESP high-resolution timer, truncated to the 32-bit wrapping
    /// reading the core works in.
    pub struct EspClock;

    impl MonotonicClock for EspClock {
        #[inline]
        fn now(&self) -> Micros {
            // SAFETY: esp_timer_get_time is always safe to call
            Micros::from_raw(unsafe { sys::esp_timer_get_time() } as u32)
        }
    }

    /// Scope input on an ADC1 channel (ADC2 conflicts with Wi-Fi).
    pub struct ScopeInput<'d> {
        // The channel driver owns the ADC driver; there is only one scope
        // input, so nothing else needs the unit.
        channel: AdcChannelDriver<'d, Gpio34, AdcDriver<'d, ADC1>>,
    }

    impl<'d> ScopeInput<'d> {
        pub fn new(adc1: ADC1, pin: Gpio34) -> Result<Self, sys::EspError> {
            let adc = AdcDriver::new(adc1)?;
            let config = AdcChannelConfig {
                attenuation: DB_11,
                ..Default::default()
            };
            let channel = AdcChannelDriver::new(adc, pin, &config)?;
            Ok(Self { channel })
        }
    }

    impl AnalogSource for ScopeInput<'_> {
        #[inline]
        fn sample_raw(&mut self) -> u16 {
            // A failed conversion reads as 0 rather than stalling the loop.
            self.channel.read_raw().unwrap_or(0)
        }
    }

    /// Piezo feedback output on the 8-bit DAC.
    pub struct PiezoOutput {
        channel: sys::dac_channel_t,
    }

    impl PiezoOutput {
        /// DAC channel 2 is GPIO26 on this board.
        pub fn new(_pin: Gpio26) -> Result<Self, sys::EspError> {
            let channel = sys::dac_channel_t_DAC_CHANNEL_2;
            sys::esp!(unsafe { sys::dac_output_enable(channel) })?;
            Ok(Self { channel })
        }
    }

    impl FeedbackDac for PiezoOutput {
        #[inline]
        fn set_level(&mut self, level: u8) {
            // SAFETY: writing a DAC level register, no shared state
            unsafe {
                sys::dac_output_voltage(self.channel, level);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_full_scale() {
        assert_eq!(quantize(0), 0);
        assert_eq!(quantize(4095), 255);
        assert_eq!(quantize(2048), 128);
    }

    #[test]
    fn test_quantize_saturates_out_of_range() {
        // Readings above 12 bits should not wrap the byte
        assert_eq!(quantize(u16::MAX), 255);
    }
}
