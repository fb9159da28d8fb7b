//! Cycle-accurate Sharp SM83 (Game Boy) CPU core.
//!
//! The SM83 is the 8-bit processor at the heart of the original Game
//! Boy: eight byte registers (one reserved for ALU flags), a 16-bit
//! stack pointer and program counter, 256 primary opcodes and 256
//! CB-prefixed shift/bit opcodes.
//!
//! Each call to [`Sm83::step`] executes exactly one instruction
//! against a borrowed [`emu_core::Bus`], emitting one machine cycle
//! per bus access and per internal delay. A timing hook installed with
//! [`Sm83::set_on_tick`] fires on every machine cycle, so graphics,
//! timers and sound can be driven in lockstep with the instruction
//! stream.
//!
//! Interrupt dispatch, HALT/STOP power states and the interrupt-enable
//! side effects of EI/DI/RETI belong to the surrounding machine, not
//! this core.

mod alu;
mod cpu;
mod error;
mod flags;
mod registers;
mod ticks;

pub use cpu::{Sm83, TickHook};
pub use error::StepError;
pub use flags::{CF, HF, NF, ZF};
pub use registers::{Registers, State};
pub use ticks::Ticks;
