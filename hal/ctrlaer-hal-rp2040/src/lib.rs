//! RP2040 execution engine for the pulse sequencer
//!
//! This crate implements the `ctrlaer-hal` traits on the RP2040's
//! Programmable I/O blocks:
//!
//! - Runtime assembly of the pulse program for any pin count
//! - Clock divider programming from the output frequency
//! - [`engine::PulseEngine`], a PIO state machine exposed as a `TxFifo`
//! - Config-driven output pin allocation

#![no_std]

pub mod engine;
pub mod pins;
pub mod pio;

pub use engine::PulseEngine;
pub use pins::{OutputPins, PinError, RemainingPeripherals};
