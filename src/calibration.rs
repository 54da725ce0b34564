use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::{aggregate::check_times, Channel, Error, Hx711, Result};

/// Offset of an untared channel. Kept at 1 rather than 0 so that readings
/// taken before a tare match what existing setups expect.
pub const DEFAULT_OFFSET: f64 = 1.0;

/// Reference unit of an uncalibrated channel
pub const DEFAULT_REFERENCE_UNIT: f64 = 1.0;

/// Turns raw medians from one channel into values and weights.
///
/// `offset` is in raw ADC units. `reference_unit` is the raw value that
/// corresponds to one unit of weight, so it may be fractional and negative
/// (load cell wired backwards), but never zero when weighing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub offset: f64,
    pub reference_unit: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            reference_unit: DEFAULT_REFERENCE_UNIT,
        }
    }
}

impl Calibration {
    pub fn value(&self, median: f64) -> f64 {
        median - self.offset
    }

    /// Returns `None` if the reference unit is zero
    pub fn weight(&self, median: f64) -> Option<f64> {
        if self.reference_unit == 0.0 {
            return None;
        }
        Some(self.value(median) / self.reference_unit)
    }
}

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
{
    pub fn calibration(&self, channel: Channel) -> Calibration {
        match channel {
            Channel::A => self.calibration_a,
            Channel::B => self.calibration_b,
        }
    }

    fn calibration_mut(&mut self, channel: Channel) -> &mut Calibration {
        match channel {
            Channel::A => &mut self.calibration_a,
            Channel::B => &mut self.calibration_b,
        }
    }

    pub fn offset(&self, channel: Channel) -> f64 {
        self.calibration(channel).offset
    }

    pub fn set_offset(&mut self, channel: Channel, offset: f64) {
        self.calibration_mut(channel).offset = offset;
    }

    pub fn reference_unit(&self, channel: Channel) -> f64 {
        self.calibration(channel).reference_unit
    }

    pub fn set_reference_unit(&mut self, channel: Channel, reference_unit: f64) {
        self.calibration_mut(channel).reference_unit = reference_unit;
    }

    /// Median of `times` samples from `channel` minus the channel's offset.
    ///
    /// `times` must be between 1 and [`MAX_SAMPLES`](crate::MAX_SAMPLES),
    /// otherwise this fails with [`Error::InvalidSampleCount`] before any pin
    /// is touched.
    pub fn value_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E> {
        let median = self.channel_median_blocking(delay, channel, times)?;
        Ok(self.calibration(channel).value(median))
    }

    /// [`Hx711::value_blocking`] divided by the channel's reference unit.
    ///
    /// A zero reference unit fails with [`Error::DivideByZero`] before any
    /// sample is taken. `times` is capped at
    /// [`MAX_SAMPLES`](crate::MAX_SAMPLES).
    pub fn weight_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E> {
        if self.reference_unit(channel) == 0.0 {
            return Err(Error::DivideByZero);
        }

        let median = self.channel_median_blocking(delay, channel, times)?;
        self.calibration(channel)
            .weight(median)
            .ok_or(Error::DivideByZero)
    }

    /// Takes the median of `times` raw samples from `channel` as its new
    /// offset and returns it. The reference unit is left alone since the
    /// offset is always in raw units.
    ///
    /// The median is taken in a fixed buffer, so `times` above
    /// [`MAX_SAMPLES`](crate::MAX_SAMPLES) fails with
    /// [`Error::InvalidSampleCount`].
    pub fn tare_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E> {
        let offset = self.channel_median_blocking(delay, channel, times)?;
        self.set_offset(channel, offset);
        debug!("tared channel {}: offset {}", channel, offset);

        Ok(offset)
    }

    /// Median of `times` samples from `channel`.
    ///
    /// If the armed gain belongs to the other channel, the channel's default
    /// gain is selected for the duration and the previous selection restored
    /// afterwards, also when sampling fails.
    fn channel_median_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E> {
        check_times(times)?;

        let old_gain = self.gain;
        if old_gain.channel() == channel {
            return self.read_median_blocking(delay, times);
        }

        self.select_blocking(delay, channel.default_gain())?;
        let median = self.read_median_blocking(delay, times);
        let restored = self.select_blocking(delay, old_gain);
        // A failed restore still leaves the old selection armed, the next
        // read sends it
        self.gain = old_gain;

        let median = median?;
        restored?;
        Ok(median)
    }
}
