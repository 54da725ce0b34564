use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::{Error, Hx711, Result};

/// Largest value the ADC can report
pub const MAX_VALUE: i32 = (1 << 23) - 1;

/// Smallest value the ADC can report
pub const MIN_VALUE: i32 = -(1 << 23);

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
{
    /// Returns true if a conversion is waiting to be read (DOUT is low)
    pub fn is_ready(&mut self) -> Result<bool, E> {
        self.dout.is_low().map_err(Error::Gpio)
    }

    /// Sets PD_SCK low, waits for DOUT to go low, then clocks out one
    /// conversion and decodes it.
    ///
    /// The trailing pulses arm [`Hx711::gain`] for the following conversion.
    /// Fails with [`Error::Timeout`] if no conversion shows up within
    /// [`Config::ready_timeout_us`](crate::Config::ready_timeout_us).
    pub fn read_blocking(&mut self, delay: &mut impl DelayNs) -> Result<i32, E> {
        self.sck.set_low().map_err(Error::Gpio)?;

        self.wait_ready_blocking(delay)?;

        let data = self.shift_blocking(delay).map_err(Error::Gpio)?;
        Ok(self.record(data))
    }

    pub(crate) fn record(&mut self, data: u32) -> i32 {
        let value = i24_to_i32(data);
        trace!("raw = {}, armed {}", value, self.gain);

        self.last_raw = value;
        value
    }

    fn wait_ready_blocking(&mut self, delay: &mut impl DelayNs) -> Result<(), E> {
        let poll_us = self.config.ready_poll_us.max(1);
        let mut waited_us = 0u32;

        while self.dout.is_high().map_err(Error::Gpio)? {
            if let Some(limit) = self.config.ready_timeout_us {
                if waited_us >= limit {
                    warn!("no conversion after {}us", waited_us);
                    return Err(Error::Timeout);
                }
            }

            delay.delay_us(poll_us);
            waited_us = waited_us.saturating_add(poll_us);
        }

        Ok(())
    }

    /// Pulses PD_SCK 24 times to extract the data from DOUT, then once per
    /// [`Gain::pulses`](crate::Gain::pulses) to arm the next conversion.
    ///
    /// This runs in a critical section. If an interrupt stretched a high
    /// phase past 60µs the chip would power down mid-read and every
    /// remaining bit would read back as 1.
    pub(crate) fn shift_blocking(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> core::result::Result<u32, E> {
        let high_ns = self.config.clock_high_ns;
        let low_ns = self.config.clock_low_ns;
        let pulses = self.gain.pulses();
        let dout = &mut self.dout;
        let sck = &mut self.sck;

        critical_section::with(|_| {
            let mut data = 0u32;

            for _ in 0..24 {
                sck.set_high()?;
                delay.delay_ns(high_ns);

                data = (data << 1) | u32::from(dout.is_high()?);

                sck.set_low()?;
                delay.delay_ns(low_ns);
            }

            for _ in 0..pulses {
                sck.set_high()?;
                delay.delay_ns(high_ns);
                sck.set_low()?;
                delay.delay_ns(low_ns);
            }

            Ok(data)
        })
    }
}

pub(crate) fn i24_to_i32(value: u32) -> i32 {
    let masked_value = value & 0xFF_FFFF;

    // Sign bit set means negative, so subtract 2^24
    if masked_value & 0x80_0000 != 0 {
        masked_value as i32 - (1 << 24)
    } else {
        masked_value as i32
    }
}
