//! Output driver
//!
//! Streams packed events into the engine's input FIFO. Every event becomes
//! two words, the packed value followed by the duration in engine ticks:
//!
//! ```text
//! PackedEvent { value, duration } ──▶ [ value ][ units.ticks(duration) ] ──▶ TxFifo
//! ```
//!
//! The FIFO is the only synchronization point with the engine. When it is
//! full the driver either waits, polling every [`POLL_INTERVAL_MS`], or
//! gives up and reports how far the run got, depending on
//! [`RunConfig::blocking`]. The driver never pushes into a full FIFO.
//!
//! Packed values only make sense for the engine's pin count: the high
//! plane of an `N`-channel word starts at bit `N`. The driver is built for
//! one [`EngineConfig`] and checks multiplexers against its pin count.

use ctrlaer_hal::TxFifo;
use embedded_hal_async::delay::DelayNs;

use crate::command::{Command, Encoding, REGISTER_BITS};
use crate::config::{ConfigError, DurationUnit, EngineConfig, RunConfig};
use crate::mux::{Multiplexer, PackedEvent};
use crate::program::ChannelProgram;
use crate::units::UnitConverter;

/// Delay between FIFO status polls
pub const POLL_INTERVAL_MS: u32 = 1;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunOutcome {
    /// Every event was delivered
    Completed {
        /// Number of events delivered
        events: usize,
    },
    /// Non-blocking run stopped at a full FIFO
    Saturated {
        /// Number of events delivered before stopping
        delivered: usize,
    },
}

impl RunOutcome {
    /// Check if every event was delivered
    pub fn is_complete(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// Number of events delivered
    pub fn delivered(&self) -> usize {
        match *self {
            RunOutcome::Completed { events } => events,
            RunOutcome::Saturated { delivered } => delivered,
        }
    }
}

/// Streams events from programs or a multiplexer into an engine FIFO
pub struct OutputDriver<Q, D> {
    fifo: Q,
    delay: D,
    encoding: Encoding,
    channels: usize,
    units: UnitConverter,
    blocking: bool,
}

impl<Q: TxFifo, D: DelayNs> OutputDriver<Q, D> {
    /// Create a driver for the engine described by `engine`
    ///
    /// The channel count is the engine's pin count, clamped to what the
    /// encoding fits; [`EngineConfig::validate`] rejects the configurations
    /// that need clamping.
    pub fn new(fifo: Q, delay: D, config: &RunConfig, engine: &EngineConfig) -> Self {
        Self {
            fifo,
            delay,
            encoding: config.encoding,
            channels: (engine.pin_count as usize).clamp(1, config.encoding.max_channels()),
            units: UnitConverter::new(config.duration_unit, engine.frequency_hz),
            blocking: config.blocking,
        }
    }

    /// Command encoding used for direct runs
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of engine output channels
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Duration converter
    pub fn units(&self) -> &UnitConverter {
        &self.units
    }

    /// Follow an engine frequency change
    pub fn set_frequency(&mut self, frequency_hz: u32) {
        self.units.set_frequency(frequency_hz);
    }

    /// Change the unit of incoming durations
    pub fn set_duration_unit(&mut self, unit: DurationUnit) {
        self.units.set_unit(unit);
    }

    /// Wait for FIFO space (true) or stop at a full FIFO (false)
    pub fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }

    /// Check if the driver waits for FIFO space
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// Underlying FIFO
    pub fn fifo(&self) -> &Q {
        &self.fifo
    }

    /// Release the FIFO and delay
    pub fn into_parts(self) -> (Q, D) {
        (self.fifo, self.delay)
    }

    async fn wait_for_space(&mut self) {
        while self.fifo.is_full() {
            self.delay.delay_ms(POLL_INTERVAL_MS).await;
        }
    }

    async fn push_words(&mut self, value: u32, ticks: u32) {
        self.wait_for_space().await;
        self.fifo.push(value);
        // The engine never sees half an event
        self.wait_for_space().await;
        self.fifo.push(ticks);
    }

    /// Deliver one event
    ///
    /// Returns `false` without pushing anything if the FIFO is full and the
    /// driver is non-blocking.
    pub async fn push(&mut self, event: PackedEvent) -> bool {
        if !self.blocking && self.fifo.is_full() {
            return false;
        }

        let ticks = self.units.ticks(event.duration);
        self.push_words(event.value, ticks).await;
        true
    }

    /// Deliver a stream of already packed events
    ///
    /// Values must be packed for [`channels`](Self::channels) channels in
    /// the driver's encoding; use [`run_multiplexed`](Self::run_multiplexed)
    /// to have that checked. No terminal event is added; the pins keep the
    /// last event's value.
    pub async fn run<I>(&mut self, events: I) -> RunOutcome
    where
        I: IntoIterator<Item = PackedEvent>,
    {
        let mut delivered = 0;

        for event in events {
            if !self.push(event).await {
                return RunOutcome::Saturated { delivered };
            }
            delivered += 1;
        }

        RunOutcome::Completed { events: delivered }
    }

    /// Deliver a multiplexer's stream
    ///
    /// Fails before pushing anything if the multiplexer's channel count or
    /// encoding does not match the engine.
    pub async fn run_multiplexed<P, const N: usize>(
        &mut self,
        mux: Multiplexer<P, N>,
    ) -> Result<RunOutcome, ConfigError>
    where
        P: ChannelProgram,
    {
        if N != self.channels {
            return Err(ConfigError::ChannelMismatch {
                engine: self.channels,
                multiplexer: N,
            });
        }
        if mux.encoding() != self.encoding {
            return Err(ConfigError::EncodingMismatch);
        }
        Ok(self.run(mux).await)
    }

    /// Deliver a single program on channel 0, then idle the pins
    ///
    /// Each step becomes one event with every other channel OFF. After the
    /// program is exhausted the terminal `(OFF, 0)` event is pushed. A
    /// saturated run skips the terminal event.
    pub async fn run_direct<P: ChannelProgram>(&mut self, mut program: P) -> RunOutcome {
        let mut delivered = 0;
        let mut commands = [Command::OFF; REGISTER_BITS];

        while let Some(step) = program.next_step() {
            commands[0] = step.command;
            let value = self.encoding.pack(&commands[..self.channels]);
            if !self.push(PackedEvent::new(value, step.duration)).await {
                return RunOutcome::Saturated { delivered };
            }
            delivered += 1;
        }

        self.finish().await;
        RunOutcome::Completed { events: delivered }
    }

    /// Push the terminal event, returning every pin to OFF
    ///
    /// Waits for FIFO space even when non-blocking.
    pub async fn finish(&mut self) {
        self.push_words(PackedEvent::idle().value, 0).await;
    }

    /// Wait until the engine has pulled every queued word
    pub async fn drain(&mut self) {
        while !self.fifo.is_empty() {
            self.delay.delay_ms(POLL_INTERVAL_MS).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::command::two_bit;
    use crate::mux::Multiplexer;
    use crate::program::{inactive, square_wave, steps};
    use crate::sim::SimEngine;

    fn engine_config(pin_count: u8, frequency_hz: u32) -> EngineConfig {
        EngineConfig {
            pin_count,
            frequency_hz,
            ..Default::default()
        }
    }

    fn single(frequency_hz: u32) -> EngineConfig {
        engine_config(1, frequency_hz)
    }

    fn ticks_config(blocking: bool) -> RunConfig {
        RunConfig {
            duration_unit: DurationUnit::Ticks,
            blocking,
            ..Default::default()
        }
    }

    #[test]
    fn test_words_in_order() {
        let engine = SimEngine::new(8);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(2), &RunConfig::default(), &single(100_000));

        let events = [PackedEvent::new(0b1100, 200), PackedEvent::new(0b0100, 50)];
        let outcome = block_on(driver.run(events));

        assert_eq!(outcome, RunOutcome::Completed { events: 2 });
        assert_eq!(engine.pushed(), [0b1100, 20_000, 0b0100, 5_000]);
    }

    #[test]
    fn test_blocking_waits_for_engine() {
        // FIFO holds two events; the engine frees one per poll
        let engine = SimEngine::new(4);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(2), &ticks_config(true), &single(100_000));

        let program = square_wave(two_bit::ON, 10, 10, Some(5));
        let outcome = block_on(driver.run_direct(program));
        block_on(driver.drain());

        assert_eq!(outcome, RunOutcome::Completed { events: 10 });
        let executed = engine.executed();
        assert_eq!(executed.len(), 11);
        assert_eq!(executed[0], (two_bit::ON.raw() as u32, 10));
        assert_eq!(executed[1], (0, 10));
        // Terminal event idles the pins
        assert_eq!(executed[10], (0, 0));
        assert!(engine.polls() > 0);
    }

    #[test]
    fn test_non_blocking_saturates() {
        // Nothing consumes: room for exactly two events
        let engine = SimEngine::new(4);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(0), &ticks_config(false), &single(100_000));

        let program = square_wave(two_bit::ON, 10, 10, None);
        let outcome = block_on(driver.run_direct(program));

        assert_eq!(outcome, RunOutcome::Saturated { delivered: 2 });
        assert!(!outcome.is_complete());
        assert_eq!(outcome.delivered(), 2);
        assert_eq!(engine.pushed().len(), 4);
        assert_eq!(engine.polls(), 0);
    }

    #[test]
    fn test_non_blocking_keeps_events_whole() {
        // Odd capacity: the value word fits, the ticks word must wait
        let engine = SimEngine::new(3);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(1), &ticks_config(false), &single(100_000));

        let events = [PackedEvent::new(1, 5), PackedEvent::new(2, 6)];
        let outcome = block_on(driver.run(events));
        block_on(driver.drain());

        assert_eq!(outcome, RunOutcome::Completed { events: 2 });
        assert_eq!(engine.executed(), [(1, 5), (2, 6)]);
    }

    #[test]
    fn test_multiplexed_run_has_no_terminal_event() {
        let engine = SimEngine::new(64);
        let mut driver =
            OutputDriver::new(engine.fifo(), engine.delay(2), &ticks_config(true), &engine_config(2, 100_000));

        let mut a = steps([(two_bit::ON, 100), (two_bit::OFF, 100)]);
        let mut b = steps([(two_bit::ON, 50)]);
        let programs: [&mut dyn ChannelProgram; 2] = [&mut a, &mut b];
        let mux = Multiplexer::new(programs, Encoding::TwoBit).unwrap();
        let outcome = block_on(driver.run_multiplexed(mux)).unwrap();

        assert_eq!(outcome, RunOutcome::Completed { events: 3 });
        assert_eq!(engine.pushed(), [0b1100, 50, 0b0100, 50, 0, 100]);
    }

    #[test]
    fn test_multiplexer_must_match_engine() {
        let engine = SimEngine::new(64);
        let mut driver =
            OutputDriver::new(engine.fifo(), engine.delay(2), &ticks_config(true), &engine_config(3, 100_000));

        let programs = [
            square_wave(two_bit::ON, 10, 10, None),
            square_wave(two_bit::ON, 5, 5, None),
        ];
        let mux = Multiplexer::new(programs, Encoding::TwoBit).unwrap();
        assert_eq!(
            block_on(driver.run_multiplexed(mux)),
            Err(ConfigError::ChannelMismatch {
                engine: 3,
                multiplexer: 2
            })
        );

        let mux = Multiplexer::new([inactive(), inactive(), inactive()], Encoding::OneBit).unwrap();
        assert_eq!(block_on(driver.run_multiplexed(mux)), Err(ConfigError::EncodingMismatch));

        // Nothing reached the engine
        assert!(engine.pushed().is_empty());
    }

    #[test]
    fn test_direct_run_on_wide_engine() {
        // Channel 0 of three: the high plane starts at bit 3
        let engine = SimEngine::new(64);
        let mut driver =
            OutputDriver::new(engine.fifo(), engine.delay(2), &ticks_config(true), &engine_config(3, 100_000));

        let outcome = block_on(driver.run_direct(steps([(two_bit::ON, 5), (two_bit::PULSE01, 6)])));

        assert!(outcome.is_complete());
        assert_eq!(engine.pushed(), [0b001_000, 5, 0b000_001, 6, 0, 0]);
    }

    #[test]
    fn test_direct_run_terminal_event() {
        let engine = SimEngine::new(64);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(2), &RunConfig::default(), &single(100_000));

        let outcome = block_on(driver.run_direct(steps([(two_bit::ON, 200)])));

        assert!(outcome.is_complete());
        assert_eq!(engine.pushed(), [0b10, 20_000, 0, 0]);
    }

    #[test]
    fn test_frequency_change_rescales() {
        let engine = SimEngine::new(64);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(2), &RunConfig::default(), &single(100_000));

        block_on(driver.push(PackedEvent::new(1, 10)));
        driver.set_frequency(10_000);
        block_on(driver.push(PackedEvent::new(1, 10)));
        driver.set_duration_unit(DurationUnit::Ticks);
        block_on(driver.push(PackedEvent::new(1, 10)));

        assert_eq!(engine.pushed(), [1, 1000, 1, 100, 1, 10]);
    }

    #[test]
    fn test_finish_waits_even_when_non_blocking() {
        let engine = SimEngine::new(2);
        let mut driver = OutputDriver::new(engine.fifo(), engine.delay(2), &ticks_config(false), &single(100_000));

        assert!(block_on(driver.push(PackedEvent::new(3, 7))));
        block_on(driver.finish());
        block_on(driver.drain());

        assert_eq!(engine.executed(), [(3, 7), (0, 0)]);
    }
}
