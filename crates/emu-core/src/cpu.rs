//! CPU core trait.

use crate::Bus;

/// A CPU core that executes instructions against a borrowed bus.
///
/// The type parameter `B` is the bus the core is bound to. The core
/// never owns memory — the bus is borrowed for the duration of each
/// call and released when it returns.
pub trait Cpu<B: Bus> {
    /// Snapshot type returned by [`Cpu::registers`].
    type Registers;

    /// Error surfaced when a step cannot complete.
    type Error;

    /// Fetch and execute exactly one instruction.
    ///
    /// On an error the register file and memory reflect the partial
    /// execution up to the fault; further calls continue from
    /// whatever state resulted.
    fn step(&mut self, bus: &mut B) -> Result<(), Self::Error>;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns the current program counter.
    fn pc(&self) -> u16;
}
