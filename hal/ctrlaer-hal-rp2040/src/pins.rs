//! Output pin allocation for config-driven engine setup
//!
//! Engine pins come from `ctrlaer.toml` as a base GPIO and a count, so
//! they are taken from the bank by number at runtime and routed to the
//! PIO block that drives them.

use embassy_rp::peripherals;
use embassy_rp::pio::{Common, Instance, Pin as PioPin};
use embassy_rp::{Peri, Peripherals};

/// UART0 TX, reserved for the command link
pub const UART_TX_PIN: u8 = 0;

/// UART0 RX, reserved for the command link
pub const UART_RX_PIN: u8 = 1;

/// Error when requesting a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin number out of range (0-29 valid)
    InvalidPin,
    /// Pin already taken
    AlreadyTaken,
    /// Pin reserved for the command link
    Reserved,
}

/// Non-GPIO peripherals left after splitting off the output pins
pub struct RemainingPeripherals {
    pub pio0: Peri<'static, peripherals::PIO0>,
    pub pio1: Peri<'static, peripherals::PIO1>,
    pub uart0: Peri<'static, peripherals::UART0>,
    pub uart_tx: Peri<'static, peripherals::PIN_0>,
    pub uart_rx: Peri<'static, peripherals::PIN_1>,
}

macro_rules! output_pins {
    ($($field:ident: $pin:ident = $num:literal),* $(,)?) => {
        /// GPIOs available to engines, taken by number
        pub struct OutputPins {
            $($field: Option<Peri<'static, peripherals::$pin>>,)*
        }

        impl OutputPins {
            /// Split the output-capable GPIOs off the peripherals
            pub fn from_peripherals(p: Peripherals) -> (Self, RemainingPeripherals) {
                let pins = Self {
                    $($field: Some(p.$pin),)*
                };
                let remaining = RemainingPeripherals {
                    pio0: p.PIO0,
                    pio1: p.PIO1,
                    uart0: p.UART0,
                    uart_tx: p.PIN_0,
                    uart_rx: p.PIN_1,
                };
                (pins, remaining)
            }

            /// Check if a pin can still be taken
            pub fn is_available(&self, pin: u8) -> bool {
                match pin {
                    $($num => self.$field.is_some(),)*
                    _ => false,
                }
            }

            /// Take a pin by number and hand it to a PIO block
            pub fn take_pio<'d, PIO: Instance>(
                &mut self,
                common: &mut Common<'d, PIO>,
                pin: u8,
            ) -> Result<PioPin<'d, PIO>, PinError> {
                match pin {
                    $($num => self
                        .$field
                        .take()
                        .map(|p| common.make_pio_pin(p))
                        .ok_or(PinError::AlreadyTaken),)*
                    UART_TX_PIN | UART_RX_PIN => Err(PinError::Reserved),
                    _ => Err(PinError::InvalidPin),
                }
            }
        }
    };
}

output_pins! {
    pin2: PIN_2 = 2,
    pin3: PIN_3 = 3,
    pin4: PIN_4 = 4,
    pin5: PIN_5 = 5,
    pin6: PIN_6 = 6,
    pin7: PIN_7 = 7,
    pin8: PIN_8 = 8,
    pin9: PIN_9 = 9,
    pin10: PIN_10 = 10,
    pin11: PIN_11 = 11,
    pin12: PIN_12 = 12,
    pin13: PIN_13 = 13,
    pin14: PIN_14 = 14,
    pin15: PIN_15 = 15,
    pin16: PIN_16 = 16,
    pin17: PIN_17 = 17,
    pin18: PIN_18 = 18,
    pin19: PIN_19 = 19,
    pin20: PIN_20 = 20,
    pin21: PIN_21 = 21,
    pin22: PIN_22 = 22,
    pin23: PIN_23 = 23,
    pin24: PIN_24 = 24,
    pin25: PIN_25 = 25,
    pin26: PIN_26 = 26,
    pin27: PIN_27 = 27,
    pin28: PIN_28 = 28,
    pin29: PIN_29 = 29,
}
