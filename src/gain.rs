use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::{Error, Hx711, Result};

/// One of the two analog inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
}

impl Channel {
    /// The gain used when a channel is sampled without the caller picking
    /// one. Channel B only supports gain 32.
    pub const fn default_gain(self) -> Gain {
        match self {
            Channel::A => Gain::A128,
            Channel::B => Gain::B32,
        }
    }
}

/// Input channel and gain for the next conversion.
///
/// The HX711 encodes the selection as the number of clock pulses sent after
/// the 24 data bits, so the choice only takes effect one conversion later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// Channel A, gain 128. Selected by the chip after power up.
    #[default]
    A128,
    /// Channel A, gain 64
    A64,
    /// Channel B, gain 32
    B32,
}

impl Gain {
    /// Number of trailing PD_SCK pulses that arm this selection
    pub const fn pulses(self) -> u8 {
        match self {
            Gain::A128 => 1,
            Gain::B32 => 2,
            Gain::A64 => 3,
        }
    }

    /// Amplification factor: 128, 64 or 32
    pub const fn factor(self) -> u32 {
        match self {
            Gain::A128 => 128,
            Gain::A64 => 64,
            Gain::B32 => 32,
        }
    }

    /// The input this selection converts
    pub const fn channel(self) -> Channel {
        match self {
            Gain::A128 | Gain::A64 => Channel::A,
            Gain::B32 => Channel::B,
        }
    }

    /// Looks up the selection for an amplification factor. Channel B is
    /// only reachable through 32.
    pub const fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            128 => Some(Gain::A128),
            64 => Some(Gain::A64),
            32 => Some(Gain::B32),
            _ => None,
        }
    }
}

impl TryFrom<u32> for Gain {
    type Error = u32;

    fn try_from(factor: u32) -> core::result::Result<Self, Self::Error> {
        Gain::from_factor(factor).ok_or(factor)
    }
}

impl<DOUT, SCK, E> Hx711<DOUT, SCK>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
{
    /// The selection that the trailing pulses of every read currently arm
    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Arms `gain` and returns the previous selection. Nothing is sent to the
    /// chip until the next read.
    #[must_use]
    pub(crate) fn arm(&mut self, gain: Gain) -> Gain {
        core::mem::replace(&mut self.gain, gain)
    }

    /// Sets the gain by its factor (128, 64 or 32).
    ///
    /// Anything else fails with [`Error::InvalidGain`] before any pin is
    /// touched and the current selection is kept.
    pub fn set_gain_blocking(&mut self, delay: &mut impl DelayNs, gain: u32) -> Result<(), E> {
        let gain = Gain::try_from(gain).map_err(Error::InvalidGain)?;
        self.select_blocking(delay, gain)
    }

    /// Selects the channel and gain for all following conversions.
    ///
    /// One conversion is read and thrown away so that the new pulse count
    /// reaches the chip, then this blocks for [`Config::settle_ms`] while the
    /// output settles.
    ///
    /// [`Config::settle_ms`]: crate::Config::settle_ms
    pub fn select_blocking(&mut self, delay: &mut impl DelayNs, gain: Gain) -> Result<(), E> {
        self.sck.set_low().map_err(Error::Gpio)?;

        let old_gain = self.arm(gain);
        if let Err(err) = self.read_blocking(delay) {
            // The chip never saw the new pulse count
            let _ = self.arm(old_gain);
            return Err(err);
        }

        debug!("gain {} -> {}", old_gain, gain);
        delay.delay_ms(self.config.settle_ms);

        Ok(())
    }
}
