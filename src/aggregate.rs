use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::{Error, Hx711, Result};

/// Most samples a single median can take. They are buffered on the stack.
pub const MAX_SAMPLES: usize = 64;

pub(crate) type SampleSet = heapless::Vec<i32, MAX_SAMPLES>;

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
{
    /// Reads `times` samples and returns their mean, rounded towards
    /// negative infinity.
    pub fn read_average_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        times: usize,
    ) -> Result<i32, E> {
        if times == 0 {
            return Err(Error::InvalidSampleCount(times));
        }

        let mut sum = 0i64;
        for _ in 0..times {
            sum += i64::from(self.read_blocking(delay)?);
        }

        Ok(floor_mean(sum, times))
    }

    /// Reads `times` samples and returns their median. For an even count this
    /// is the mean of the two middle samples, so it may end in .5
    pub fn read_median_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        times: usize,
    ) -> Result<f64, E> {
        let mut samples = self.collect_blocking(delay, times)?;
        Ok(median(&mut samples))
    }

    fn collect_blocking(
        &mut self,
        delay: &mut impl DelayNs,
        times: usize,
    ) -> Result<SampleSet, E> {
        check_times(times)?;

        let mut samples = SampleSet::new();
        for _ in 0..times {
            let value = self.read_blocking(delay)?;
            samples
                .push(value)
                .map_err(|_| Error::InvalidSampleCount(times))?;
        }

        Ok(samples)
    }
}

pub(crate) fn check_times<E>(times: usize) -> Result<(), E> {
    if times == 0 || times > MAX_SAMPLES {
        return Err(Error::InvalidSampleCount(times));
    }
    Ok(())
}

pub(crate) fn floor_mean(sum: i64, times: usize) -> i32 {
    // The mean of 24-bit samples always fits in an i32
    sum.div_euclid(times as i64) as i32
}

/// Sorts `samples` in place and returns the middle element, or the mean of
/// the two middle elements. `samples` must not be empty.
pub(crate) fn median(samples: &mut [i32]) -> f64 {
    samples.sort_unstable();

    let mid = samples.len() / 2;
    if samples.len() % 2 == 1 {
        f64::from(samples[mid])
    } else {
        (f64::from(samples[mid - 1]) + f64::from(samples[mid])) / 2.0
    }
}
