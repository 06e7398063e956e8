//! ctrlaer line-command protocol
//!
//! A host streams pulse events to the controller over a serial link as
//! plain text, one event per line:
//!
//! ```text
//! <command>,<duration>\n      forward one event (both unsigned integers)
//! END\n                       stop listening
//! \n                          ignored
//! ```
//!
//! `command` is the packed pin value written to the engine as-is and
//! `duration` is in the run's configured unit (milliseconds or ticks).
//! Every accepted record is echoed back in the same form once it has been
//! queued, which gives the host simple flow control.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod line;

pub use line::{Line, LineCommand, LineError, LineParser, END_TOKEN, MAX_ECHO_LEN, MAX_LINE_LEN};
