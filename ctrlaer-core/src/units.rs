//! Duration unit conversion
//!
//! The engine counts ticks of its own clock; one tick is `1 / frequency`
//! seconds. Programs written in milliseconds are scaled here, programs
//! written in ticks pass through unchanged.

use crate::config::DurationUnit;

/// Convert milliseconds to ticks at `frequency_hz`
///
/// `ms * frequency / 1000`, truncating. Saturates at `u32::MAX` ticks.
pub fn ms_to_ticks(ms: u32, frequency_hz: u32) -> u32 {
    let ticks = (ms as u64 * frequency_hz as u64) / 1000;
    ticks.min(u32::MAX as u64) as u32
}

/// Duration converter for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnitConverter {
    unit: DurationUnit,
    frequency_hz: u32,
}

impl UnitConverter {
    /// Create a converter for `unit` at `frequency_hz`
    pub const fn new(unit: DurationUnit, frequency_hz: u32) -> Self {
        Self { unit, frequency_hz }
    }

    /// Duration unit of program output
    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Change the duration unit
    pub fn set_unit(&mut self, unit: DurationUnit) {
        self.unit = unit;
    }

    /// Output frequency in Hz
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Follow an engine frequency change
    pub fn set_frequency(&mut self, frequency_hz: u32) {
        self.frequency_hz = frequency_hz;
    }

    /// Engine ticks for `duration`
    pub fn ticks(&self, duration: u32) -> u32 {
        match self.unit {
            DurationUnit::Milliseconds => ms_to_ticks(duration, self.frequency_hz),
            DurationUnit::Ticks => duration,
        }
    }
}
