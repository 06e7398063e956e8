//! Clock divider arithmetic
//!
//! Execution engines run from the system clock through a 16.8 fixed-point
//! divider. The engine frequency is `reference / (int + frac / 256)`.
//!
//! The same output frequency feeds both this divider and the software
//! unit converter, so one tick is exactly `1 / frequency` seconds.

/// Smallest legal divider (engine runs at the reference clock)
pub const MIN_DIVIDER: u32 = 1;

/// Largest legal divider
pub const MAX_DIVIDER: u32 = 65536;

/// Clock divider errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Target frequency of zero
    ZeroFrequency,
    /// Target is faster than the reference clock (divider < 1)
    TooFast,
    /// Target is too slow for a 16-bit integer divider (divider > 65536)
    TooSlow,
}

/// A 16.8 fixed-point clock divider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockDivider {
    /// Integer part (1..=65536)
    pub int_part: u32,
    /// Fractional part in 1/256 units
    pub frac_part: u8,
}

impl ClockDivider {
    /// Compute the divider that runs an engine at `target_hz` from `reference_hz`
    ///
    /// The fractional part is truncated, never rounded, so the programmed
    /// frequency is never above the target.
    pub fn new(target_hz: u32, reference_hz: u32) -> Result<Self, ClockError> {
        if target_hz == 0 {
            return Err(ClockError::ZeroFrequency);
        }

        // divider * 256 = (reference * 256) / target
        let divider_x256 = (reference_hz as u64 * 256) / target_hz as u64;

        if divider_x256 < (MIN_DIVIDER as u64) * 256 {
            return Err(ClockError::TooFast);
        }
        if divider_x256 > (MAX_DIVIDER as u64) * 256 {
            return Err(ClockError::TooSlow);
        }

        Ok(Self {
            int_part: (divider_x256 / 256) as u32,
            frac_part: (divider_x256 % 256) as u8,
        })
    }

    /// Raw 16.8 bits (integer in the upper bits, fraction in the low byte)
    pub const fn to_bits(self) -> u32 {
        (self.int_part << 8) | self.frac_part as u32
    }

    /// Frequency actually produced from `reference_hz`, truncated to whole Hz
    pub fn actual_hz(self, reference_hz: u32) -> u32 {
        ((reference_hz as u64 * 256) / self.to_bits() as u64) as u32
    }
}
