//! SM83 CPU core with per-m-cycle execution.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use emu_core::{Bus, Cpu, Observable, Value};

use crate::error::StepError;
use crate::flags::{CF, HF, NF, ZF};
use crate::registers::{Registers, State};
use crate::ticks::Ticks;

/// Timing hook invoked once per machine cycle.
///
/// The hook sees the register file (PC already advanced past any byte
/// just fetched) and a shared borrow of the bus, so a harness can
/// inspect whatever last-access record its bus keeps. Internal delay
/// cycles carry no payload beyond that. The hook must not re-enter the
/// CPU.
pub type TickHook<B> = Box<dyn FnMut(&Registers, &B)>;

/// Sharp SM83 CPU.
///
/// The CPU does not own the bus; every `step()` borrows it for exactly
/// one instruction. Each bus access and each internal delay cycle is
/// one machine cycle, and each machine cycle fires the timing hook, so
/// downstream hardware can be driven in lockstep with the instruction
/// stream.
pub struct Sm83<B: Bus> {
    pub(crate) regs: Registers,
    on_tick: Option<TickHook<B>>,
    ticks: Ticks,
}

impl<B: Bus> Sm83<B> {
    /// Create a new CPU with all registers zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),
            on_tick: None,
            ticks: Ticks::ZERO,
        }
    }

    /// Install a register snapshot.
    ///
    /// Emits no machine cycles. The timing hook and the cumulative
    /// cycle counter are left alone.
    pub fn reset(&mut self, state: State) {
        log::trace!("reset: pc=${:04X} sp=${:04X}", state.pc, state.sp);
        self.regs.a = state.a;
        self.regs.b = state.b;
        self.regs.c = state.c;
        self.regs.d = state.d;
        self.regs.e = state.e;
        self.regs.set_f(state.f);
        self.regs.h = state.h;
        self.regs.l = state.l;
        self.regs.sp = state.sp;
        self.regs.pc = state.pc;
    }

    /// Install the timing hook.
    pub fn set_on_tick(&mut self, hook: impl FnMut(&Registers, &B) + 'static) {
        self.on_tick = Some(Box::new(hook));
    }

    /// Remove the timing hook.
    pub fn clear_on_tick(&mut self) {
        self.on_tick = None;
    }

    /// Total machine cycles since creation.
    #[must_use]
    pub const fn ticks(&self) -> Ticks {
        self.ticks
    }

    /// Snapshot the register file.
    #[must_use]
    pub fn state(&self) -> State {
        State {
            a: self.regs.a,
            b: self.regs.b,
            c: self.regs.c,
            d: self.regs.d,
            e: self.regs.e,
            f: self.regs.f(),
            h: self.regs.h,
            l: self.regs.l,
            sp: self.regs.sp,
            pc: self.regs.pc,
        }
    }

    /// Get the A register.
    #[must_use]
    pub const fn a(&self) -> u8 {
        self.regs.a
    }

    /// Get the B register.
    #[must_use]
    pub const fn b(&self) -> u8 {
        self.regs.b
    }

    /// Get the C register.
    #[must_use]
    pub const fn c(&self) -> u8 {
        self.regs.c
    }

    /// Get the D register.
    #[must_use]
    pub const fn d(&self) -> u8 {
        self.regs.d
    }

    /// Get the E register.
    #[must_use]
    pub const fn e(&self) -> u8 {
        self.regs.e
    }

    /// Get the F register (flags).
    #[must_use]
    pub const fn f(&self) -> u8 {
        self.regs.f()
    }

    /// Get the H register.
    #[must_use]
    pub const fn h(&self) -> u8 {
        self.regs.h
    }

    /// Get the L register.
    #[must_use]
    pub const fn l(&self) -> u8 {
        self.regs.l
    }

    /// Get the stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.regs.sp
    }

    /// Get the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Get the AF register pair.
    #[must_use]
    pub const fn af(&self) -> u16 {
        self.regs.af()
    }

    /// Get the BC register pair.
    #[must_use]
    pub const fn bc(&self) -> u16 {
        self.regs.bc()
    }

    /// Get the DE register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        self.regs.de()
    }

    /// Get the HL register pair.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        self.regs.hl()
    }

    /// Fetch and execute one instruction.
    ///
    /// # Errors
    ///
    /// [`StepError::IllegalOpcode`] when the fetched byte is one of
    /// the reserved opcodes. Either way PC has advanced past the
    /// fetched byte and later calls continue from the partial state.
    pub fn step(&mut self, bus: &mut B) -> Result<(), StepError> {
        let opcode = self.fetch(bus);
        self.execute_primary(bus, opcode)
    }

    /// Emit one machine cycle: bump the counter, fire the hook.
    pub(crate) fn tick(&mut self, bus: &B) {
        self.ticks += Ticks::new(1);
        if let Some(hook) = self.on_tick.as_mut() {
            hook(&self.regs, bus);
        }
    }

    /// Read a byte; one machine cycle.
    pub(crate) fn read(&mut self, bus: &mut B, address: u16) -> u8 {
        let value = bus.read(address);
        self.tick(bus);
        value
    }

    /// Write a byte; one machine cycle.
    pub(crate) fn write(&mut self, bus: &mut B, address: u16, value: u8) {
        bus.write(address, value);
        self.tick(bus);
    }

    /// Read the byte at PC and advance past it.
    ///
    /// PC is advanced before the read so the hook observes it past the
    /// fetched byte.
    pub(crate) fn fetch(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        self.regs.pc = pc.wrapping_add(1);
        self.read(bus, pc)
    }

    /// Read a little-endian immediate word; two machine cycles.
    pub(crate) fn fetch_word(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Push a word: high byte at --SP, then low byte at --SP.
    pub(crate) fn push_word(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(bus, self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write(bus, self.regs.sp, value as u8);
    }

    /// Pop a word: low byte at SP++, then high byte at SP++.
    pub(crate) fn pop_word(&mut self, bus: &mut B) -> u16 {
        let lo = self.read(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(lo) | (u16::from(hi) << 8)
    }

    /// Get register by 3-bit encoding (bits 5-3 or 2-0 of the opcode).
    pub(crate) fn get_reg8(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => unreachable!("(HL) is routed through memory"),
        }
    }

    /// Set register by 3-bit encoding.
    pub(crate) fn set_reg8(&mut self, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            7 => self.regs.a = value,
            _ => unreachable!("(HL) is routed through memory"),
        }
    }

    /// Get register pair by 2-bit encoding (BC, DE, HL, SP).
    pub(crate) fn get_reg16(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    /// Set register pair by 2-bit encoding.
    pub(crate) fn set_reg16(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    /// Get register pair for PUSH (AF instead of SP).
    pub(crate) fn get_reg16_stack(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            3 => self.regs.af(),
            _ => unreachable!(),
        }
    }

    /// Set register pair for POP. POP AF masks F's low nibble.
    pub(crate) fn set_reg16_stack(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            3 => self.regs.set_af(value),
            _ => unreachable!(),
        }
    }

    /// Evaluate condition code (NZ, Z, NC, C).
    pub(crate) fn condition(&self, cc: u8) -> bool {
        match cc & 3 {
            0 => !self.regs.flag(ZF),
            1 => self.regs.flag(ZF),
            2 => !self.regs.flag(CF),
            3 => self.regs.flag(CF),
            _ => unreachable!(),
        }
    }
}

impl<B: Bus> Default for Sm83<B> {
    fn default() -> Self {
        Self::new()
    }
}

// Instruction execution split into a separate file for readability.
mod execute;

impl<B: Bus> Cpu<B> for Sm83<B> {
    type Registers = Registers;
    type Error = StepError;

    fn step(&mut self, bus: &mut B) -> Result<(), StepError> {
        Sm83::step(self, bus)
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }
}

/// All query paths supported by the SM83.
const SM83_QUERY_PATHS: &[&str] = &[
    // Byte registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Other registers
    "sp", "pc",
    // Flags (individual)
    "flags.z", "flags.n", "flags.h", "flags.c",
    // CPU state
    "ticks",
];

impl<B: Bus> Observable for Sm83<B> {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            // Byte registers
            "a" => Some(self.regs.a.into()),
            "f" => Some(self.regs.f().into()),
            "b" => Some(self.regs.b.into()),
            "c" => Some(self.regs.c.into()),
            "d" => Some(self.regs.d.into()),
            "e" => Some(self.regs.e.into()),
            "h" => Some(self.regs.h.into()),
            "l" => Some(self.regs.l.into()),

            // Register pairs
            "af" => Some(self.regs.af().into()),
            "bc" => Some(self.regs.bc().into()),
            "de" => Some(self.regs.de().into()),
            "hl" => Some(self.regs.hl().into()),

            // Other registers
            "sp" => Some(self.regs.sp.into()),
            "pc" => Some(self.regs.pc.into()),

            // Individual flags
            "flags.z" => Some(self.regs.flag(ZF).into()),
            "flags.n" => Some(self.regs.flag(NF).into()),
            "flags.h" => Some(self.regs.flag(HF).into()),
            "flags.c" => Some(self.regs.flag(CF).into()),

            // CPU state
            "ticks" => Some(self.ticks.get().into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        SM83_QUERY_PATHS
    }
}
