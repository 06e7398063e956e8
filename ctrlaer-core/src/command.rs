//! Channel commands and bit encodings
//!
//! A command is a small integer describing what one channel does during
//! one engine tick. The engine outputs each tick in two halves: first the
//! low bit-plane of the packed value, then the high bit-plane. Bit 0 of a
//! command lands in the low plane, bit 1 in the high plane.
//!
//! ```text
//! packed value, N channels, two-bit encoding:
//!
//!  31          2N    2N-1        N    N-1          0
//! ┌─────────────┬─────────────────┬─────────────────┐
//! │   unused    │ high plane (b1) │ low plane (b0)  │
//! └─────────────┴─────────────────┴─────────────────┘
//! ```
//!
//! The one-bit encoding is the same layout with an empty high plane.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Width of the engine's output shift register
pub const REGISTER_BITS: usize = 32;

/// Encoded directive for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Command(pub u8);

impl Command {
    /// Output low for the whole tick (same value in every encoding)
    pub const OFF: Self = Self(0);

    /// Raw command value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Bit for the first half of each tick
    pub const fn low_bit(self) -> u32 {
        (self.0 & 1) as u32
    }

    /// Bit for the second half of each tick
    pub const fn high_bit(self) -> u32 {
        ((self.0 >> 1) & 1) as u32
    }
}

impl From<u8> for Command {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

/// Commands for the one-bit encoding
pub mod one_bit {
    use super::Command;

    /// Output low
    pub const OFF: Command = Command(0);
    /// Square wave at the engine frequency (high, then low)
    pub const ON: Command = Command(1);
}

/// Commands for the two-bit encoding
///
/// Names read as `PULSE<first half><second half>`.
pub mod two_bit {
    use super::Command;

    /// Low for the whole tick
    pub const PULSE00: Command = Command(0b00);
    /// High, then low
    pub const PULSE01: Command = Command(0b01);
    /// Low, then high
    pub const PULSE10: Command = Command(0b10);
    /// High for the whole tick
    pub const PULSE11: Command = Command(0b11);

    /// Output low
    pub const OFF: Command = PULSE00;
    /// Square wave at the engine frequency
    pub const ON: Command = PULSE10;
    /// Constant high level
    pub const HIGH: Command = PULSE11;
    /// Constant low level
    pub const LOW: Command = PULSE00;
}

/// How channel commands are packed into one engine word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Encoding {
    /// One bit per channel, OFF or ON
    OneBit,
    /// Two bits per channel, split across the low and high planes
    #[default]
    TwoBit,
}

impl Encoding {
    /// Bits consumed per channel
    pub const fn bits_per_channel(self) -> usize {
        match self {
            Encoding::OneBit => 1,
            Encoding::TwoBit => 2,
        }
    }

    /// Largest channel count that fits the output register
    pub const fn max_channels(self) -> usize {
        REGISTER_BITS / self.bits_per_channel()
    }

    /// Mask applied to every command before packing
    pub const fn command_mask(self) -> u8 {
        match self {
            Encoding::OneBit => 0b1,
            Encoding::TwoBit => 0b11,
        }
    }

    /// Fail if `channels` do not fit this encoding
    pub fn check_channels(self, channels: usize) -> Result<(), ConfigError> {
        if channels > self.max_channels() {
            return Err(ConfigError::TooManyChannels {
                channels,
                max: self.max_channels(),
            });
        }
        Ok(())
    }

    /// Pack one command per channel into an engine word
    ///
    /// Channel `i` occupies bit `i` of the low plane and, for the two-bit
    /// encoding, bit `N + i` of the high plane. Commands are masked to the
    /// encoding width so a channel never touches its neighbours' bits.
    /// `commands.len()` must already have passed [`check_channels`](Self::check_channels).
    pub fn pack(self, commands: &[Command]) -> u32 {
        let n = commands.len();
        let mask = self.command_mask();

        commands
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &command)| {
                let command = Command(command.raw() & mask);
                let low = command.low_bit() << i;
                let high = match self {
                    Encoding::OneBit => 0,
                    Encoding::TwoBit => command.high_bit() << (n + i),
                };
                acc | low | high
            })
    }

    /// Recover channel `index` of `channels` from a packed word
    pub fn unpack(self, value: u32, channels: usize, index: usize) -> Command {
        let low = (value >> index) & 1;
        let high = match self {
            Encoding::OneBit => 0,
            Encoding::TwoBit => (value >> (channels + index)) & 1,
        };
        Command((low | (high << 1)) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_bit_split_planes() {
        let value = Encoding::TwoBit.pack(&[two_bit::ON, two_bit::PULSE01, two_bit::OFF]);

        // Low plane carries bit 0 of each command
        assert_eq!(value & 0b111, 0b010);
        // High plane carries bit 1
        assert_eq!((value >> 3) & 0b111, 0b001);
        assert_eq!(value, 0b001_010);
    }

    #[test]
    fn test_one_bit_packing() {
        let value = Encoding::OneBit.pack(&[one_bit::ON, one_bit::OFF, one_bit::ON]);
        assert_eq!(value, 0b101);
    }

    #[test]
    fn test_single_channel_equals_raw() {
        for raw in 0..4u8 {
            assert_eq!(Encoding::TwoBit.pack(&[Command(raw)]), raw as u32);
        }
        assert_eq!(Encoding::OneBit.pack(&[one_bit::ON]), 1);
    }

    #[test]
    fn test_wide_commands_are_masked() {
        // 0b111 must not leak into channel 1's low bit
        let value = Encoding::TwoBit.pack(&[Command(0b111), two_bit::OFF]);
        assert_eq!(value, 0b01_01);

        let value = Encoding::OneBit.pack(&[Command(0b10), one_bit::OFF]);
        assert_eq!(value, 0);
    }

    #[test]
    fn test_full_register() {
        let commands = [two_bit::HIGH; 16];
        assert_eq!(Encoding::TwoBit.pack(&commands), u32::MAX);

        let commands = [one_bit::ON; 32];
        assert_eq!(Encoding::OneBit.pack(&commands), u32::MAX);
    }

    #[test]
    fn test_channel_capacity() {
        assert_eq!(Encoding::TwoBit.max_channels(), 16);
        assert_eq!(Encoding::OneBit.max_channels(), 32);
        assert!(Encoding::TwoBit.check_channels(16).is_ok());
        assert_eq!(
            Encoding::TwoBit.check_channels(17),
            Err(ConfigError::TooManyChannels {
                channels: 17,
                max: 16
            })
        );
    }

    #[test]
    fn test_unpack() {
        let commands = [two_bit::PULSE11, two_bit::ON, two_bit::PULSE01, two_bit::OFF];
        let value = Encoding::TwoBit.pack(&commands);
        for (i, &command) in commands.iter().enumerate() {
            assert_eq!(Encoding::TwoBit.unpack(value, commands.len(), i), command);
        }
    }
}
