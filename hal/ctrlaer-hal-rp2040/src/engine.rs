//! PIO pulse engine
//!
//! One state machine running the pulse program on a block of consecutive
//! GPIOs. Software feeds it through the joined TX FIFO (8 words, four
//! events); the FIFO is the only synchronization point.

use ctrlaer_core::config::{ConfigError, EngineConfig, MAX_GPIO};
use ctrlaer_core::Encoding;
use ctrlaer_hal::TxFifo;
use embassy_rp::pio::{
    Common, Config, Direction, FifoJoin, Instance, Pin as PioPin, ShiftConfig, ShiftDirection,
    StateMachine,
};
use heapless::Vec;

use crate::pins::{OutputPins, PinError};
use crate::pio::{engine_divider, pulse_program, to_fixed};

/// Upper bound on pins per engine
const MAX_PINS: usize = MAX_GPIO as usize + 1;

/// Execution engine on one PIO state machine
pub struct PulseEngine<'d, PIO: Instance, const SM: usize> {
    sm: StateMachine<'d, PIO, SM>,
    /// Kept for the lifetime of the engine so the GPIOs stay routed to PIO
    _pins: Vec<PioPin<'d, PIO>, MAX_PINS>,
    pin_count: u8,
    frequency_hz: u32,
}

impl<'d, PIO: Instance, const SM: usize> PulseEngine<'d, PIO, SM> {
    /// Load the pulse program and start the state machine
    ///
    /// Takes `config.pin_count` GPIOs starting at `config.base_pin` from
    /// `pins`. Every configuration problem is reported before a pin is
    /// taken or the state machine is touched. The pins idle low until the
    /// first event.
    pub fn new(
        common: &mut Common<'d, PIO>,
        mut sm: StateMachine<'d, PIO, SM>,
        pins: &mut OutputPins,
        config: &EngineConfig,
        encoding: Encoding,
    ) -> Result<Self, ConfigError> {
        config.validate(encoding)?;
        if config.sm_index() as usize != SM {
            return Err(ConfigError::InvalidStateMachine(config.state_machine));
        }
        let divider = engine_divider(config.frequency_hz)?;

        let gpios = config.base_pin..config.base_pin + config.pin_count;
        if let Some(gpio) = gpios.clone().find(|&gpio| !pins.is_available(gpio)) {
            return Err(ConfigError::PinUnavailable(gpio));
        }

        let program = pulse_program(config.pin_count);
        let loaded = common
            .try_load_program(&program)
            .map_err(|_| ConfigError::NoProgramSpace)?;

        // Pins are only taken once nothing else can fail
        let mut out_pins = Vec::new();
        for gpio in gpios {
            let pin = pins.take_pio(common, gpio).map_err(|e| match e {
                PinError::InvalidPin => ConfigError::InvalidPinRange,
                PinError::AlreadyTaken | PinError::Reserved => ConfigError::PinUnavailable(gpio),
            })?;
            out_pins
                .push(pin)
                .map_err(|_| ConfigError::InvalidPinRange)?;
        }

        let pin_refs: Vec<&PioPin<'d, PIO>, MAX_PINS> = out_pins.iter().collect();

        let mut cfg = Config::default();
        cfg.use_program(&loaded, &[]);
        cfg.set_out_pins(&pin_refs);
        cfg.shift_out = ShiftConfig {
            auto_fill: false,
            threshold: 32,
            direction: ShiftDirection::Right,
        };
        cfg.fifo_join = FifoJoin::TxOnly;
        cfg.clock_divider = to_fixed(divider);

        sm.set_config(&cfg);
        sm.set_pin_dirs(Direction::Out, &pin_refs);
        sm.set_enable(true);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Engine SM{} on GPIO{}..={}: {} Hz, divider {}+{}/256",
            config.state_machine,
            config.base_pin,
            config.base_pin + config.pin_count - 1,
            config.frequency_hz,
            divider.int_part,
            divider.frac_part
        );

        drop(pin_refs);
        Ok(Self {
            sm,
            _pins: out_pins,
            pin_count: config.pin_count,
            frequency_hz: config.frequency_hz,
        })
    }

    /// Reprogram the output frequency
    ///
    /// Takes effect from the next state machine cycle; events already in
    /// the FIFO play back at the new rate.
    pub fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), ConfigError> {
        if frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        let divider = engine_divider(frequency_hz)?;

        self.sm.set_clock_divider(to_fixed(divider));
        self.frequency_hz = frequency_hz;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Engine frequency {} Hz, divider {}+{}/256",
            frequency_hz,
            divider.int_part,
            divider.frac_part
        );
        Ok(())
    }

    /// Output frequency in Hz
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Number of output pins
    pub fn pin_count(&self) -> u8 {
        self.pin_count
    }
}

impl<'d, PIO: Instance, const SM: usize> TxFifo for PulseEngine<'d, PIO, SM> {
    fn push(&mut self, word: u32) {
        // Stalls until the state machine pulls
        while !self.sm.tx().try_push(word) {}
    }

    fn is_full(&mut self) -> bool {
        self.sm.tx().full()
    }

    fn is_empty(&mut self) -> bool {
        self.sm.tx().empty()
    }
}
