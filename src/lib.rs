//! Driver for the HX711 24-bit load cell ADC.
//!
//! The HX711 talks over two lines: PD_SCK (clock, driven by us) and DOUT
//! (data, doubles as the ready signal). Each conversion is shifted out as 24
//! bits MSB first, followed by 1 to 3 extra clock pulses that pick the input
//! channel and gain of the *next* conversion. Holding PD_SCK high for more
//! than 60µs puts the chip to sleep.
//!
//! Datasheet: https://cdn.sparkfun.com/datasheets/Sensors/ForceFlex/hx711_english.pdf
//!
//! On top of the wire protocol the driver keeps a per-channel calibration
//! (offset and reference unit) so that raw samples can be turned into
//! weights:
//!
//! ```text
//! value  = median(times) - offset
//! weight = value / reference_unit
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod aggregate;
mod calibration;
mod error;
mod gain;
mod power;
mod protocol;

#[cfg(feature = "embedded-hal-async")]
mod asynch;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

pub use aggregate::MAX_SAMPLES;
pub use calibration::{Calibration, DEFAULT_OFFSET, DEFAULT_REFERENCE_UNIT};
pub use error::{Error, Result};
pub use gain::{Channel, Gain};
pub use power::POWER_DOWN_THRESHOLD_US;
pub use protocol::{MAX_VALUE, MIN_VALUE};

/// Number of samples used by [`Hx711::value_a_blocking`] and
/// [`Hx711::weight_a_blocking`].
pub const DEFAULT_TIMES: usize = 3;

/// Number of samples used by [`Hx711::tare_a_blocking`].
pub const DEFAULT_TARE_TIMES: usize = 15;

/// Timing knobs for the driver.
///
/// The defaults follow the datasheet: PD_SCK high and low phases of 0.5µs
/// (0.2µs minimum, 50µs maximum) and 400ms of output settling after a gain
/// change or power up at the 10Hz data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// How long to wait for DOUT to go low before giving up with
    /// [`Error::Timeout`]. `None` waits forever, which will hang if no chip
    /// is attached.
    pub ready_timeout_us: Option<u32>,

    /// Interval between polls of DOUT while waiting for a conversion.
    pub ready_poll_us: u32,

    /// Length of each PD_SCK high phase.
    pub clock_high_ns: u32,

    /// Length of each PD_SCK low phase.
    pub clock_low_ns: u32,

    /// Wait after a gain change or power up before samples are trusted.
    pub settle_ms: u32,

    /// How long PD_SCK is held high to power the chip down. Values below
    /// [`POWER_DOWN_THRESHOLD_US`] are raised to it.
    pub power_down_hold_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // At 10Hz a conversion takes 100ms, so a full second is generous
            ready_timeout_us: Some(1_000_000),
            ready_poll_us: 100,
            clock_high_ns: 500,
            clock_low_ns: 500,
            settle_ms: 400,
            power_down_hold_us: 100,
        }
    }
}

pub struct Hx711<DOUT, SCK>
where
    DOUT: InputPin,
    SCK: OutputPin,
{
    dout: DOUT,
    sck: SCK,
    config: Config,
    gain: Gain,
    calibration_a: Calibration,
    calibration_b: Calibration,
    last_raw: i32,
}

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
{
    /// Creates a driver with the default [`Config`].
    ///
    /// No pins are touched here. The chip powers up armed for channel A at
    /// gain 128, which is also what the driver assumes.
    pub fn new(dout: DOUT, sck: SCK) -> Self {
        Self::with_config(dout, sck, Config::default())
    }

    /// Creates a driver with custom timing
    pub fn with_config(dout: DOUT, sck: SCK, config: Config) -> Self {
        Self {
            dout,
            sck,
            config,
            gain: Gain::default(),
            calibration_a: Calibration::default(),
            calibration_b: Calibration::default(),
            last_raw: 0,
        }
    }

    /// Gives the pins back, consuming the driver
    pub fn release(self) -> (DOUT, SCK) {
        (self.dout, self.sck)
    }

    /// The timing the driver was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The most recent raw sample, including throwaway reads done by gain
    /// changes. Zero until the first read.
    pub fn last_raw(&self) -> i32 {
        self.last_raw
    }

    /// Returns the median of [`DEFAULT_TIMES`] samples from channel A minus
    /// its offset
    pub fn value_a_blocking(&mut self, delay: &mut impl DelayNs) -> Result<f64, E> {
        self.value_blocking(delay, Channel::A, DEFAULT_TIMES)
    }

    /// Returns the weight on channel A using [`DEFAULT_TIMES`] samples
    pub fn weight_a_blocking(&mut self, delay: &mut impl DelayNs) -> Result<f64, E> {
        self.weight_blocking(delay, Channel::A, DEFAULT_TIMES)
    }

    /// Tares channel A using [`DEFAULT_TARE_TIMES`] samples
    pub fn tare_a_blocking(&mut self, delay: &mut impl DelayNs) -> Result<f64, E> {
        self.tare_blocking(delay, Channel::A, DEFAULT_TARE_TIMES)
    }
}
