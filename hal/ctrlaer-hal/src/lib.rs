//! ctrlaer Hardware Abstraction Layer
//!
//! This crate defines the narrow interface between the portable pulse
//! sequencing logic and a hardware execution engine. Chip-specific crates
//! (currently only RP2040 PIO) implement these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  ctrlaer-core (mux, output driver)      │
//! └─────────────────────────────────────────┘
//!                     │  TxFifo
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  ctrlaer-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  ctrlaer-hal-rp2040 (PIO state machine) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`fifo::TxFifo`] - Bounded hardware input queue (push, full, empty)
//! - [`clock::ClockDivider`] - Integer/fractional clock divider arithmetic

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod fifo;

// Re-export key items at crate root for convenience
pub use clock::{ClockDivider, ClockError, MAX_DIVIDER, MIN_DIVIDER};
pub use fifo::TxFifo;
