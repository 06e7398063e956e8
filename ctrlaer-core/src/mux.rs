//! Channel multiplexer
//!
//! Merges `N` independent channel programs into one stream of packed
//! events that a single engine can play back. All channels share a virtual
//! clock: each event lasts until the earliest channel needs its next step.
//!
//! ```text
//! A: ON──────────100──────────┐OFF─────────100──────────┐
//! B: ON────50────┐OFF (exhausted, padded)
//!    ├─── 50 ────┼──── 50 ────┼─────────── 100 ─────────┤ end
//!      A=ON B=ON   A=ON B=OFF        A=OFF B=OFF
//! ```
//!
//! Merge step:
//! 1. Every channel whose interval has elapsed pulls its next step. An
//!    exhausted program is padded with OFF for [`DEFAULT_DURATION`] and
//!    never polled again.
//! 2. If no channel is still running its own program, the stream ends.
//! 3. The event lasts `min(remaining)`; a minimum of zero means some
//!    program emitted a zero-length step, so step 1 runs again without
//!    emitting anything.
//! 4. The packed value is folded from every channel's current command.

use core::iter::FusedIterator;

use crate::command::{Command, Encoding};
use crate::config::{ConfigError, DEFAULT_DURATION};
use crate::program::ChannelProgram;

/// Merged multi-channel command with a shared duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PackedEvent {
    /// Packed channel commands
    pub value: u32,
    /// Duration in the run's unit
    pub duration: u32,
}

impl PackedEvent {
    /// Create a new event
    pub const fn new(value: u32, duration: u32) -> Self {
        Self { value, duration }
    }

    /// Event that parks every channel at OFF without holding
    pub const fn idle() -> Self {
        Self::new(0, 0)
    }
}

/// Per-channel merge state
#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Time left in the current step
    remaining: u32,
    /// Command of the current step
    command: Command,
    /// Program has returned `None`
    exhausted: bool,
}

impl Slot {
    const fn new() -> Self {
        Self {
            remaining: 0,
            command: Command::OFF,
            exhausted: false,
        }
    }
}

/// Multiplexer over borrowed trait objects, for channels of mixed program types
pub type DynMultiplexer<'a, const N: usize> = Multiplexer<&'a mut dyn ChannelProgram, N>;

/// Merges `N` channel programs into one [`PackedEvent`] stream
///
/// The multiplexer owns its programs (or exclusive borrows of them) for
/// its whole lifetime. It is an [`Iterator`]: finite when every program
/// is finite, infinite as soon as one is not.
#[derive(Debug)]
pub struct Multiplexer<P, const N: usize> {
    programs: [P; N],
    slots: [Slot; N],
    encoding: Encoding,
    default_duration: u32,
    finished: bool,
}

impl<P: ChannelProgram, const N: usize> Multiplexer<P, N> {
    /// Create a multiplexer for `programs`
    ///
    /// Channel `i` is driven by `programs[i]`. Fails if `N` channels do not
    /// fit the output register under `encoding`.
    pub fn new(programs: [P; N], encoding: Encoding) -> Result<Self, ConfigError> {
        encoding.check_channels(N)?;

        Ok(Self {
            programs,
            slots: [Slot::new(); N],
            encoding,
            default_duration: DEFAULT_DURATION,
            finished: false,
        })
    }

    /// Override the padding interval of exhausted channels (minimum 1)
    pub fn with_default_duration(mut self, duration: u32) -> Self {
        self.default_duration = duration.max(1);
        self
    }

    /// Command encoding
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of channels
    pub const fn channel_count(&self) -> usize {
        N
    }

    /// Check if the stream has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current command of every channel
    pub fn commands(&self) -> [Command; N] {
        self.slots.map(|slot| slot.command)
    }

    /// Pull new steps for every elapsed channel
    ///
    /// Returns the number of channels still running their own program.
    fn refill(&mut self) -> usize {
        let mut alive = 0;

        for (slot, program) in self.slots.iter_mut().zip(self.programs.iter_mut()) {
            if slot.remaining == 0 {
                let next = if slot.exhausted {
                    None
                } else {
                    program.next_step()
                };

                match next {
                    Some(step) => {
                        slot.command = step.command;
                        slot.remaining = step.duration;
                    }
                    None => {
                        slot.command = Command::OFF;
                        slot.remaining = self.default_duration;
                        slot.exhausted = true;
                    }
                }
            }

            if !slot.exhausted {
                alive += 1;
            }
        }

        alive
    }
}

impl<P: ChannelProgram, const N: usize> Iterator for Multiplexer<P, N> {
    type Item = PackedEvent;

    fn next(&mut self) -> Option<PackedEvent> {
        if self.finished {
            return None;
        }

        loop {
            if self.refill() == 0 {
                self.finished = true;
                return None;
            }

            let step = self
                .slots
                .iter()
                .map(|slot| slot.remaining)
                .min()
                .unwrap_or(0);
            if step == 0 {
                // Zero-length step: collapse it into the next one
                continue;
            }

            let value = self.encoding.pack(&self.commands());
            for slot in self.slots.iter_mut() {
                slot.remaining -= step;
            }

            return Some(PackedEvent::new(value, step));
        }
    }
}

impl<P: ChannelProgram, const N: usize> FusedIterator for Multiplexer<P, N> {}
