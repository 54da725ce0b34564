use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::{Error, Gain, Hx711, Result};

/// PD_SCK held high for longer than this puts the chip into power down
pub const POWER_DOWN_THRESHOLD_US: u32 = 60;

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
{
    /// Sets PD_SCK low then high and holds it for
    /// [`Config::power_down_hold_us`](crate::Config::power_down_hold_us).
    /// PD_SCK is left high so the chip stays asleep.
    ///
    /// The chip always wakes up on channel A, gain 128, so that becomes the
    /// armed selection. Call [`Hx711::select_blocking`] after waking to
    /// use another one.
    pub fn power_down_blocking(&mut self, delay: &mut impl DelayNs) -> Result<(), E> {
        self.sck.set_low().map_err(Error::Gpio)?;
        self.sck.set_high().map_err(Error::Gpio)?;

        delay.delay_us(self.power_down_hold_us());
        self.gain = Gain::A128;
        debug!("powered down");

        Ok(())
    }

    /// Sets PD_SCK low and waits for the output to settle.
    pub fn power_up_blocking(&mut self, delay: &mut impl DelayNs) -> Result<(), E> {
        self.sck.set_low().map_err(Error::Gpio)?;

        delay.delay_ms(self.config.settle_ms);
        debug!("powered up");

        Ok(())
    }

    /// Power cycles the chip. Worth doing after it sat idle for more than a
    /// few seconds, or after a read timed out.
    pub fn reset_blocking(&mut self, delay: &mut impl DelayNs) -> Result<(), E> {
        self.power_down_blocking(delay)?;
        self.power_up_blocking(delay)
    }

    pub(crate) fn power_down_hold_us(&self) -> u32 {
        self.config.power_down_hold_us.max(POWER_DOWN_THRESHOLD_US)
    }
}
