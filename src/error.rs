use core::fmt;

/// Errors returned by the driver. `E` is the error type of the pins.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// DOUT never went low within [`Config::ready_timeout_us`](crate::Config)
    Timeout,
    /// The gain is not one of 128, 64 or 32
    InvalidGain(u32),
    /// Weight was requested while the reference unit is zero
    DivideByZero,
    /// Aggregation needs between 1 and [`MAX_SAMPLES`](crate::MAX_SAMPLES)
    /// samples
    InvalidSampleCount(usize),
    /// A pin operation failed
    Gpio(E),
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Timeout => write!(f, "timed out waiting for HX711 data ready"),
            Error::InvalidGain(gain) => {
                write!(f, "unsupported gain {gain}, expected 128, 64 or 32")
            }
            Error::DivideByZero => write!(f, "reference unit is zero"),
            Error::InvalidSampleCount(times) => write!(f, "invalid sample count {times}"),
            Error::Gpio(err) => write!(f, "gpio error: {err:?}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
