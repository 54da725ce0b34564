//! Async versions of the driver operations.
//!
//! Waiting (for a conversion, for the output to settle) is done with the
//! async delay, so other tasks run in the meantime. The 24-bit shift itself
//! still runs in a critical section with the blocking delay, which is why
//! the delay has to implement both traits. Most HAL delays do.

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use embedded_hal_async::{delay::DelayNs as AsyncDelayNs, digital::Wait};

use crate::{
    aggregate::{check_times, floor_mean, median, SampleSet},
    Channel, Error, Gain, Hx711, Result,
};

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E> + Wait<Error = E>,
    SCK: OutputPin<Error = E>,
{
    /// Sets PD_SCK low, waits for DOUT to go low, then clocks out one
    /// conversion and decodes it.
    ///
    /// Without a [`Config::ready_timeout_us`](crate::Config::ready_timeout_us)
    /// this waits on the pin's edge instead of polling.
    pub async fn read<D>(&mut self, delay: &mut D) -> Result<i32, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        self.sck.set_low().map_err(Error::Gpio)?;

        self.wait_ready(delay).await?;

        let data = self.shift_blocking(delay).map_err(Error::Gpio)?;
        Ok(self.record(data))
    }

    async fn wait_ready(&mut self, delay: &mut impl AsyncDelayNs) -> Result<(), E> {
        let Some(limit) = self.config.ready_timeout_us else {
            return self.dout.wait_for_low().await.map_err(Error::Gpio);
        };

        let poll_us = self.config.ready_poll_us.max(1);
        let mut waited_us = 0u32;

        while self.dout.is_high().map_err(Error::Gpio)? {
            if waited_us >= limit {
                warn!("no conversion after {}us", waited_us);
                return Err(Error::Timeout);
            }

            AsyncDelayNs::delay_us(delay, poll_us).await;
            waited_us = waited_us.saturating_add(poll_us);
        }

        Ok(())
    }

    pub async fn read_average<D>(&mut self, delay: &mut D, times: usize) -> Result<i32, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        if times == 0 {
            return Err(Error::InvalidSampleCount(times));
        }

        let mut sum = 0i64;
        for _ in 0..times {
            sum += i64::from(self.read(delay).await?);
        }

        Ok(floor_mean(sum, times))
    }

    pub async fn read_median<D>(&mut self, delay: &mut D, times: usize) -> Result<f64, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        check_times(times)?;

        let mut samples = SampleSet::new();
        for _ in 0..times {
            let value = self.read(delay).await?;
            samples
                .push(value)
                .map_err(|_| Error::InvalidSampleCount(times))?;
        }

        Ok(median(&mut samples))
    }

    pub async fn set_gain<D>(&mut self, delay: &mut D, gain: u32) -> Result<(), E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        let gain = Gain::try_from(gain).map_err(Error::InvalidGain)?;
        self.select(delay, gain).await
    }

    pub async fn select<D>(&mut self, delay: &mut D, gain: Gain) -> Result<(), E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        self.sck.set_low().map_err(Error::Gpio)?;

        let old_gain = self.arm(gain);
        if let Err(err) = self.read(delay).await {
            let _ = self.arm(old_gain);
            return Err(err);
        }

        debug!("gain {} -> {}", old_gain, gain);
        AsyncDelayNs::delay_ms(delay, self.config.settle_ms).await;

        Ok(())
    }

    /// Puts the chip to sleep and arms channel A, gain 128, which it wakes
    /// up on.
    pub async fn power_down(&mut self, delay: &mut impl AsyncDelayNs) -> Result<(), E> {
        self.sck.set_low().map_err(Error::Gpio)?;
        self.sck.set_high().map_err(Error::Gpio)?;

        delay.delay_us(self.power_down_hold_us()).await;
        self.gain = Gain::A128;
        debug!("powered down");

        Ok(())
    }

    pub async fn power_up(&mut self, delay: &mut impl AsyncDelayNs) -> Result<(), E> {
        self.sck.set_low().map_err(Error::Gpio)?;

        delay.delay_ms(self.config.settle_ms).await;
        debug!("powered up");

        Ok(())
    }

    pub async fn reset(&mut self, delay: &mut impl AsyncDelayNs) -> Result<(), E> {
        self.power_down(delay).await?;
        self.power_up(delay).await
    }

    pub async fn value<D>(
        &mut self,
        delay: &mut D,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        let median = self.channel_median(delay, channel, times).await?;
        Ok(self.calibration(channel).value(median))
    }

    pub async fn weight<D>(
        &mut self,
        delay: &mut D,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        if self.reference_unit(channel) == 0.0 {
            return Err(Error::DivideByZero);
        }

        let median = self.channel_median(delay, channel, times).await?;
        self.calibration(channel)
            .weight(median)
            .ok_or(Error::DivideByZero)
    }

    /// Async [`Hx711::tare_blocking`]. `times` is capped at
    /// [`MAX_SAMPLES`](crate::MAX_SAMPLES).
    pub async fn tare<D>(
        &mut self,
        delay: &mut D,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        let offset = self.channel_median(delay, channel, times).await?;
        self.set_offset(channel, offset);
        debug!("tared channel {}: offset {}", channel, offset);

        Ok(offset)
    }

    async fn channel_median<D>(
        &mut self,
        delay: &mut D,
        channel: Channel,
        times: usize,
    ) -> Result<f64, E>
    where
        D: DelayNs + AsyncDelayNs,
    {
        check_times(times)?;

        let old_gain = self.gain;
        if old_gain.channel() == channel {
            return self.read_median(delay, times).await;
        }

        self.select(delay, channel.default_gain()).await?;
        let median = self.read_median(delay, times).await;
        let restored = self.select(delay, old_gain).await;
        self.gain = old_gain;

        let median = median?;
        restored?;
        Ok(median)
    }
}
