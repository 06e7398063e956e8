//! Board-agnostic core logic for the ctrlaer pulse sequencer
//!
//! This crate contains everything between user-written channel programs
//! and the hardware FIFO, with no dependency on a specific chip:
//!
//! - Channel commands and their bit encodings
//! - Channel program trait and common program shapes
//! - Multiplexer merging N programs into one event stream
//! - Duration unit conversion (milliseconds to engine ticks)
//! - Output driver streaming events into a [`ctrlaer_hal::TxFifo`]
//! - Line-command listener for host-driven runs
//! - Run and engine configuration types
//!
//! # Data flow
//!
//! ```text
//! ChannelProgram x N ──▶ Multiplexer ──▶ OutputDriver ──▶ TxFifo ──▶ engine ──▶ pins
//!                      (PackedEvent)   (value, ticks)
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod driver;
pub mod listen;
pub mod mux;
pub mod program;
pub mod units;

#[cfg(test)]
mod sim;

pub use command::{one_bit, two_bit, Command, Encoding};
pub use config::{ConfigError, DurationUnit, EngineConfig, RunConfig};
pub use driver::{OutputDriver, RunOutcome};
pub use listen::{ListenError, ListenSummary, Listener};
pub use mux::{DynMultiplexer, Multiplexer, PackedEvent};
pub use program::{ChannelProgram, Step};
pub use units::UnitConverter;
