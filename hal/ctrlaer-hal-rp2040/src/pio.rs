//! PIO pulse program
//!
//! Each engine runs one state machine with this program, assembled at
//! runtime for its pin count `n`:
//!
//! ```text
//! start: pull block        ; packed value
//!        mov x, osr
//!        pull block        ; ticks
//!        mov y, osr
//!        jmp y-- tick      ; y = ticks - 1
//!        mov osr, x        ; zero ticks: park on the high plane
//!        out null, n
//!        out pins, n
//!        jmp start
//! more:  out pins, n  [5]  ; high plane
//! tick:  mov osr, x
//!        out pins, n  [5]  ; low plane
//!        jmp y-- more
//!        out pins, n       ; last high plane, wraps to start
//! ```
//!
//! One tick is 14 state machine cycles, 7 on the low plane and 7 on the
//! high plane, so the state machine clock is `frequency * 14`. The last
//! high plane of an event also covers fetching the next one (`out`, two
//! pulls, two movs, `jmp`, `mov osr`), so an event of `ticks` ticks
//! lasts exactly `14 * ticks` cycles as long as the FIFO keeps up. With
//! the FIFO empty the last high plane is held until the next event.
//!
//! A zero-tick event never outputs its low plane. Its high plane appears
//! one cycle late and lasts 8 cycles before the next event starts.

use ctrlaer_hal::{ClockDivider, ClockError};
use fixed::types::U24F8;
use pio::{
    Assembler, JmpCondition, MovDestination, MovOperation, MovSource, OutDestination, Program,
};

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// State machine cycles per engine tick
pub const CYCLES_PER_TICK: u32 = 14;

/// Instruction memory of one PIO block
pub const PROGRAM_SIZE: usize = 32;

/// Assemble the pulse program for `pin_count` output pins
pub fn pulse_program(pin_count: u8) -> Program<PROGRAM_SIZE> {
    let n = pin_count;
    let mut a = Assembler::<PROGRAM_SIZE>::new();

    let mut start = a.label();
    let mut more = a.label();
    let mut tick = a.label();
    let mut wrap_source = a.label();

    a.bind(&mut start);
    a.pull(false, true);
    a.mov(MovDestination::X, MovOperation::None, MovSource::OSR);
    a.pull(false, true);
    a.mov(MovDestination::Y, MovOperation::None, MovSource::OSR);
    a.jmp(JmpCondition::YDecNonZero, &mut tick);
    a.mov(MovDestination::OSR, MovOperation::None, MovSource::X);
    a.out(OutDestination::NULL, n);
    a.out(OutDestination::PINS, n);
    a.jmp(JmpCondition::Always, &mut start);

    a.bind(&mut more);
    a.out_with_delay(OutDestination::PINS, n, 5);
    a.bind(&mut tick);
    a.mov(MovDestination::OSR, MovOperation::None, MovSource::X);
    a.out_with_delay(OutDestination::PINS, n, 5);
    a.jmp(JmpCondition::YDecNonZero, &mut more);
    a.out(OutDestination::PINS, n);
    a.bind(&mut wrap_source);

    a.assemble_with_wrap(wrap_source, start)
}

/// Clock divider that runs the program at `frequency_hz` ticks per second
pub fn engine_divider(frequency_hz: u32) -> Result<ClockDivider, ClockError> {
    let sm_hz = frequency_hz
        .checked_mul(CYCLES_PER_TICK)
        .ok_or(ClockError::TooFast)?;
    ClockDivider::new(sm_hz, SYS_CLK_HZ)
}

/// Convert to embassy-rp's 24.8 fixed-point divider
pub fn to_fixed(divider: ClockDivider) -> U24F8 {
    U24F8::from_bits(divider.to_bits())
}
