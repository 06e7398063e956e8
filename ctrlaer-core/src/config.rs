//! Run and engine configuration
//!
//! Every configuration problem is detected here, before an engine is
//! started or a single word is queued.

use ctrlaer_hal::ClockError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::command::Encoding;

/// Default engine output frequency in Hz
pub const DEFAULT_FREQUENCY_HZ: u32 = 108_050;

/// Interval an exhausted channel is padded with, in the run's unit
pub const DEFAULT_DURATION: u32 = 1000;

/// Number of engines available (2 PIO blocks x 4 state machines)
pub const MAX_STATE_MACHINES: u8 = 8;

/// Highest user GPIO number on the RP2040
pub const MAX_GPIO: u8 = 29;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Output frequency cannot be reached with the clock divider
    Clock(ClockError),
    /// More channels than the encoding fits in the output register
    TooManyChannels {
        /// Requested channel count
        channels: usize,
        /// Capacity of the encoding
        max: usize,
    },
    /// State machine index out of range
    InvalidStateMachine(u8),
    /// Output pins run past the last GPIO, or no pins requested
    InvalidPinRange,
    /// Output GPIO is reserved or already driven by another engine
    PinUnavailable(u8),
    /// Engine program does not fit the remaining instruction memory
    NoProgramSpace,
    /// Output frequency of zero
    ZeroFrequency,
    /// Multiplexer channel count differs from the engine's pin count
    ChannelMismatch {
        /// Engine output channels
        engine: usize,
        /// Multiplexer channels
        multiplexer: usize,
    },
    /// Multiplexer encoding differs from the run's encoding
    EncodingMismatch,
}

impl From<ClockError> for ConfigError {
    fn from(e: ClockError) -> Self {
        ConfigError::Clock(e)
    }
}

/// Unit of the durations produced by channel programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DurationUnit {
    /// Milliseconds, scaled by the output frequency
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "ms"))]
    Milliseconds,
    /// Raw engine ticks, passed through unchanged
    Ticks,
}

/// Per-run streaming configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunConfig {
    /// Command packing
    pub encoding: Encoding,
    /// Unit of program durations
    pub duration_unit: DurationUnit,
    /// Wait for FIFO space (true) or stop the run when it is full (false)
    pub blocking: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::TwoBit,
            duration_unit: DurationUnit::Milliseconds,
            blocking: true,
        }
    }
}

/// Execution engine placement and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Global state machine index (0-7, PIO block = index / 4)
    pub state_machine: u8,
    /// First output GPIO
    pub base_pin: u8,
    /// Number of consecutive output GPIOs, one per channel
    pub pin_count: u8,
    /// Output frequency in Hz (one tick = 1 / frequency)
    pub frequency_hz: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_machine: 0,
            base_pin: 0,
            pin_count: 1,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
        }
    }
}

impl EngineConfig {
    /// PIO block index (0 or 1)
    pub const fn pio_block(&self) -> u8 {
        self.state_machine / 4
    }

    /// State machine index within its PIO block (0-3)
    pub const fn sm_index(&self) -> u8 {
        self.state_machine % 4
    }

    /// Check this configuration against the hardware and the encoding
    ///
    /// Clock divider limits depend on the engine program and are checked
    /// by the chip HAL.
    pub fn validate(&self, encoding: Encoding) -> Result<(), ConfigError> {
        if self.state_machine >= MAX_STATE_MACHINES {
            return Err(ConfigError::InvalidStateMachine(self.state_machine));
        }
        if self.pin_count == 0 {
            return Err(ConfigError::InvalidPinRange);
        }
        let last_pin = self.base_pin as u16 + self.pin_count as u16 - 1;
        if last_pin > MAX_GPIO as u16 {
            return Err(ConfigError::InvalidPinRange);
        }
        if self.frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        encoding.check_channels(self.pin_count as usize)
    }
}
