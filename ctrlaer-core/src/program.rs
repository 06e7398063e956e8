//! Channel programs
//!
//! A channel program describes one output channel as a lazy sequence of
//! `(command, duration)` steps. Programs may be finite or infinite and are
//! consumed exactly once: there is no rewind.
//!
//! Any iterator of `(Command, u32)` pairs becomes a program through
//! [`steps`]. The structs below cover the recurring shapes (constant
//! levels, square waves, duty-cycle ramps, phase patterns) and keep their
//! state in plain fields, so every call to a factory returns a fresh
//! program.

use crate::command::Command;
use crate::config::DEFAULT_DURATION;

/// One timed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    /// Channel command
    pub command: Command,
    /// Duration in the run's unit
    pub duration: u32,
}

impl Step {
    /// Create a new step
    pub const fn new(command: Command, duration: u32) -> Self {
        Self { command, duration }
    }
}

impl From<(Command, u32)> for Step {
    fn from((command, duration): (Command, u32)) -> Self {
        Self { command, duration }
    }
}

/// Producer of timed commands for one channel
pub trait ChannelProgram {
    /// Pull the next step, or `None` once the program is exhausted
    ///
    /// After returning `None` a program is never polled again by the
    /// multiplexer.
    fn next_step(&mut self) -> Option<Step>;
}

impl<P: ChannelProgram + ?Sized> ChannelProgram for &mut P {
    fn next_step(&mut self) -> Option<Step> {
        (**self).next_step()
    }
}

/// Program backed by an iterator
#[derive(Debug, Clone)]
pub struct Steps<I>(I);

/// Turn any iterator of steps (or `(Command, u32)` pairs) into a program
pub fn steps<I>(iter: I) -> Steps<I::IntoIter>
where
    I: IntoIterator,
    I::Item: Into<Step>,
{
    Steps(iter.into_iter())
}

impl<I> ChannelProgram for Steps<I>
where
    I: Iterator,
    I::Item: Into<Step>,
{
    fn next_step(&mut self) -> Option<Step> {
        self.0.next().map(Into::into)
    }
}

/// Infinite repetition of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hold {
    step: Step,
}

/// Hold `command` forever, reported in chunks of `duration`
pub fn hold(command: Command, duration: u32) -> Hold {
    Hold {
        step: Step::new(command, duration),
    }
}

/// Keep a channel on forever
pub fn always_on(on: Command) -> Hold {
    hold(on, DEFAULT_DURATION)
}

impl ChannelProgram for Hold {
    fn next_step(&mut self) -> Option<Step> {
        Some(self.step)
    }
}

/// A single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Once {
    step: Option<Step>,
}

/// Emit one step, then finish
pub fn once(command: Command, duration: u32) -> Once {
    Once {
        step: Some(Step::new(command, duration)),
    }
}

/// A channel that stays off for one default interval, then finishes
///
/// Use it to fill unused channel slots: it never keeps a run alive longer
/// than [`DEFAULT_DURATION`].
pub fn inactive() -> Once {
    once(Command::OFF, DEFAULT_DURATION)
}

impl ChannelProgram for Once {
    fn next_step(&mut self) -> Option<Step> {
        self.step.take()
    }
}

/// Two steps alternating, a fixed number of times or forever
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alternate {
    first: Step,
    second: Step,
    /// Remaining cycles, `None` for infinite
    cycles: Option<u32>,
    second_next: bool,
}

/// Alternate `first` and `second` for `cycles` full cycles (`None` = forever)
///
/// Two channels driven with swapped steps form a two-phase pattern, e.g.
/// stepper coils or push-pull transducers.
pub fn alternate(first: Step, second: Step, cycles: Option<u32>) -> Alternate {
    Alternate {
        first,
        second,
        cycles,
        second_next: false,
    }
}

/// Square wave envelope: `on` for `on_duration`, OFF for `off_duration`
pub fn square_wave(on: Command, on_duration: u32, off_duration: u32, cycles: Option<u32>) -> Alternate {
    alternate(
        Step::new(on, on_duration),
        Step::new(Command::OFF, off_duration),
        cycles,
    )
}

/// Phase pattern: `a` then `b`, each for `duration`, for `cycles` cycles
///
/// Swap `a` and `b` on a second channel to drive it in antiphase.
pub fn phase(a: Command, b: Command, duration: u32, cycles: Option<u32>) -> Alternate {
    alternate(Step::new(a, duration), Step::new(b, duration), cycles)
}

impl ChannelProgram for Alternate {
    fn next_step(&mut self) -> Option<Step> {
        if self.second_next {
            self.second_next = false;
            return Some(self.second);
        }

        if let Some(cycles) = self.cycles.as_mut() {
            if *cycles == 0 {
                return None;
            }
            *cycles -= 1;
        }
        self.second_next = true;
        Some(self.first)
    }
}

/// Duty-cycle ramp
///
/// Each of `count` periods is `window + off` long: the channel is OFF for
/// `window - t`, `on` for `t`, then OFF for `off`, where `t` grows
/// linearly from 0 to `window`. [`DutyRamp::descending`] runs it from
/// `window` down to 0 instead, which paired with an ascending ramp keeps
/// the total on-time of two channels constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyRamp {
    on: Command,
    window: u32,
    off: u32,
    count: u32,
    index: u32,
    phase: u8,
    descending: bool,
}

/// Ramp the duty cycle of `on` from 0 to 100% of `window` over `count` periods
pub fn duty_ramp(on: Command, window: u32, off: u32, count: u32) -> DutyRamp {
    DutyRamp {
        on,
        window,
        off,
        count,
        index: 0,
        phase: 0,
        descending: false,
    }
}

impl DutyRamp {
    /// Run the ramp from 100% down to 0%
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// On-time of period `index`
    ///
    /// Indices past the last period give the last period's on-time.
    pub fn on_time(&self, index: u32) -> u32 {
        if self.count <= 1 {
            return if self.descending { 0 } else { self.window };
        }
        let index = index.min(self.count - 1);
        let step = if self.descending {
            self.count - 1 - index
        } else {
            index
        };
        ((self.window as u64 * step as u64) / (self.count - 1) as u64) as u32
    }
}

impl ChannelProgram for DutyRamp {
    fn next_step(&mut self) -> Option<Step> {
        if self.index >= self.count {
            return None;
        }

        let on_time = self.on_time(self.index);
        let step = match self.phase {
            0 => Step::new(Command::OFF, self.window - on_time),
            1 => Step::new(self.on, on_time),
            _ => Step::new(Command::OFF, self.off),
        };

        self.phase += 1;
        if self.phase == 3 {
            self.phase = 0;
            self.index += 1;
        }
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::two_bit::{HIGH, LOW, OFF, ON};

    fn collect<P: ChannelProgram>(mut program: P, limit: usize) -> std::vec::Vec<(Command, u32)> {
        let mut out = std::vec::Vec::new();
        while out.len() < limit {
            match program.next_step() {
                Some(step) => out.push((step.command, step.duration)),
                None => break,
            }
        }
        out
    }

    #[test]
    fn test_steps_from_pairs() {
        let program = steps([(ON, 100), (OFF, 50)]);
        assert_eq!(collect(program, 10), [(ON, 100), (OFF, 50)]);
    }

    #[test]
    fn test_hold_is_infinite() {
        assert_eq!(collect(always_on(ON), 5).len(), 5);
        assert_eq!(collect(hold(HIGH, 7), 2), [(HIGH, 7), (HIGH, 7)]);
    }

    #[test]
    fn test_inactive_is_fresh_per_call() {
        let mut first = inactive();
        assert_eq!(first.next_step(), Some(Step::new(OFF, DEFAULT_DURATION)));
        assert_eq!(first.next_step(), None);

        // A new instance is unaffected by the exhausted one
        let mut second = inactive();
        assert_eq!(second.next_step(), Some(Step::new(OFF, DEFAULT_DURATION)));
    }

    #[test]
    fn test_square_wave_cycles() {
        let program = square_wave(ON, 50, 70, Some(2));
        assert_eq!(collect(program, 10), [(ON, 50), (OFF, 70), (ON, 50), (OFF, 70)]);

        let program = square_wave(ON, 50, 70, Some(0));
        assert!(collect(program, 10).is_empty());

        let program = square_wave(ON, 50, 70, None);
        assert_eq!(collect(program, 100).len(), 100);
    }

    #[test]
    fn test_two_phase_pattern() {
        let phase1 = phase(HIGH, LOW, 50, Some(2));
        let phase2 = phase(LOW, HIGH, 50, Some(2));

        let a = collect(phase1, 10);
        let b = collect(phase2, 10);
        assert_eq!(a.len(), 4);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_ne!(x.0, y.0);
            assert_eq!(x.1, y.1);
        }
    }

    #[test]
    fn test_duty_ramp_ascending() {
        let program = duty_ramp(ON, 100, 250, 3);
        assert_eq!(
            collect(program, 20),
            [
                (OFF, 100),
                (ON, 0),
                (OFF, 250),
                (OFF, 50),
                (ON, 50),
                (OFF, 250),
                (OFF, 0),
                (ON, 100),
                (OFF, 250),
            ]
        );
    }

    #[test]
    fn test_duty_ramp_descending_mirrors() {
        let up = duty_ramp(ON, 100, 250, 5);
        let down = duty_ramp(ON, 100, 250, 5).descending();
        for i in 0..5 {
            assert_eq!(up.on_time(i) + down.on_time(i), 100);
        }
        // Every period has the same length
        let total: u32 = collect(down, 100).iter().map(|s| s.1).sum();
        assert_eq!(total, 5 * 350);
    }

    #[test]
    fn test_duty_ramp_on_time_past_end() {
        let down = duty_ramp(ON, 100, 250, 3).descending();
        assert_eq!(down.on_time(2), 0);
        assert_eq!(down.on_time(3), 0);
        assert_eq!(down.on_time(u32::MAX), 0);

        let up = duty_ramp(ON, 100, 250, 3);
        assert_eq!(up.on_time(7), 100);
    }

    #[test]
    fn test_duty_ramp_single_period() {
        let program = duty_ramp(ON, 100, 10, 1);
        assert_eq!(collect(program, 10), [(OFF, 0), (ON, 100), (OFF, 10)]);
    }

    #[test]
    fn test_mut_ref_program() {
        let mut program = steps([(ON, 1), (OFF, 2), (ON, 3)]);
        assert_eq!(collect(&mut program, 1), [(ON, 1)]);
        // Borrowing does not rewind the underlying program
        assert_eq!(collect(&mut program, 10), [(OFF, 2), (ON, 3)]);
    }
}
