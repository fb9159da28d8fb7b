//! Instruction execution for the SM83.
//!
//! One machine cycle per bus access and per internal delay; the cycle
//! counts in the comments include the opcode fetch.

#![allow(clippy::too_many_lines)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;

use crate::alu;
use crate::error::StepError;
use crate::flags::{CF, HF, NF, ZF};

use super::Sm83;

impl<B: Bus> Sm83<B> {
    // =========================================================================
    // Primary opcode table
    // =========================================================================

    /// Execute an unprefixed instruction. The opcode byte has already
    /// been fetched and PC points past it.
    pub(super) fn execute_primary(&mut self, bus: &mut B, op: u8) -> Result<(), StepError> {
        match op {
            // NOP (1 cycle)
            0x00 => {}

            // LD rr, nn (01=BC, 11=DE, 21=HL, 31=SP; 3 cycles)
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.set_reg16((op >> 4) & 3, value);
            }

            // LD (BC), A / LD (DE), A (2 cycles)
            0x02 => self.write(bus, self.regs.bc(), self.regs.a),
            0x12 => self.write(bus, self.regs.de(), self.regs.a),

            // INC rr (03=BC, 13=DE, 23=HL, 33=SP; 2 cycles, one internal)
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.tick(bus);
                let rp = (op >> 4) & 3;
                let value = self.get_reg16(rp).wrapping_add(1);
                self.set_reg16(rp, value);
            }

            // DEC rr (0B=BC, 1B=DE, 2B=HL, 3B=SP; 2 cycles, one internal)
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.tick(bus);
                let rp = (op >> 4) & 3;
                let value = self.get_reg16(rp).wrapping_sub(1);
                self.set_reg16(rp, value);
            }

            // INC r / INC (HL) (1 cycle; 3 for (HL)). C preserved.
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let target = (op >> 3) & 7;
                if target == 6 {
                    let addr = self.regs.hl();
                    let result = alu::inc8(self.read(bus, addr));
                    self.write(bus, addr, result.value);
                    self.regs.set_f((self.regs.f() & CF) | result.flags);
                } else {
                    let result = alu::inc8(self.get_reg8(target));
                    self.set_reg8(target, result.value);
                    self.regs.set_f((self.regs.f() & CF) | result.flags);
                }
            }

            // DEC r / DEC (HL) (1 cycle; 3 for (HL)). C preserved.
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let target = (op >> 3) & 7;
                if target == 6 {
                    let addr = self.regs.hl();
                    let result = alu::dec8(self.read(bus, addr));
                    self.write(bus, addr, result.value);
                    self.regs.set_f((self.regs.f() & CF) | result.flags);
                } else {
                    let result = alu::dec8(self.get_reg8(target));
                    self.set_reg8(target, result.value);
                    self.regs.set_f((self.regs.f() & CF) | result.flags);
                }
            }

            // LD r, n / LD (HL), n (2 cycles; 3 for (HL))
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let value = self.fetch(bus);
                let target = (op >> 3) & 7;
                if target == 6 {
                    self.write(bus, self.regs.hl(), value);
                } else {
                    self.set_reg8(target, value);
                }
            }

            // RLCA / RRCA / RLA / RRA (1 cycle). Z forced clear.
            0x07 => {
                let result = alu::rlc8(self.regs.a);
                self.regs.a = result.value;
                self.regs.set_f(result.flags & CF);
            }
            0x0F => {
                let result = alu::rrc8(self.regs.a);
                self.regs.a = result.value;
                self.regs.set_f(result.flags & CF);
            }
            0x17 => {
                let result = alu::rl8(self.regs.a, self.regs.flag(CF));
                self.regs.a = result.value;
                self.regs.set_f(result.flags & CF);
            }
            0x1F => {
                let result = alu::rr8(self.regs.a, self.regs.flag(CF));
                self.regs.a = result.value;
                self.regs.set_f(result.flags & CF);
            }

            // LD (nn), SP (5 cycles; SP low first)
            0x08 => {
                let addr = self.fetch_word(bus);
                self.write(bus, addr, self.regs.sp as u8);
                self.write(bus, addr.wrapping_add(1), (self.regs.sp >> 8) as u8);
            }

            // ADD HL, rr (09=BC, 19=DE, 29=HL, 39=SP; 2 cycles). Z preserved.
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.tick(bus);
                let (value, flags) = alu::add16(self.regs.hl(), self.get_reg16((op >> 4) & 3));
                self.regs.set_hl(value);
                self.regs.set_f((self.regs.f() & ZF) | flags);
            }

            // LD A, (BC) / LD A, (DE) (2 cycles)
            0x0A => self.regs.a = self.read(bus, self.regs.bc()),
            0x1A => self.regs.a = self.read(bus, self.regs.de()),

            // STOP (3 cycles total; power state is the machine's job)
            0x10 => {
                self.tick(bus);
                self.tick(bus);
            }

            // JR e (3 cycles)
            0x18 => {
                let e = self.fetch(bus) as i8;
                self.tick(bus);
                self.regs.pc = self.regs.pc.wrapping_add(e as u16);
            }

            // JR cc, e (20=NZ, 28=Z, 30=NC, 38=C; 2 cycles, 3 taken)
            0x20 | 0x28 | 0x30 | 0x38 => {
                let e = self.fetch(bus) as i8;
                if self.condition((op >> 3) & 3) {
                    self.tick(bus);
                    self.regs.pc = self.regs.pc.wrapping_add(e as u16);
                }
            }

            // LD (HL+), A / LD A, (HL+) (2 cycles; HL update is free)
            0x22 => {
                let addr = self.regs.hl();
                self.write(bus, addr, self.regs.a);
                self.regs.set_hl(addr.wrapping_add(1));
            }
            0x2A => {
                let addr = self.regs.hl();
                self.regs.a = self.read(bus, addr);
                self.regs.set_hl(addr.wrapping_add(1));
            }

            // LD (HL-), A / LD A, (HL-) (2 cycles)
            0x32 => {
                let addr = self.regs.hl();
                self.write(bus, addr, self.regs.a);
                self.regs.set_hl(addr.wrapping_sub(1));
            }
            0x3A => {
                let addr = self.regs.hl();
                self.regs.a = self.read(bus, addr);
                self.regs.set_hl(addr.wrapping_sub(1));
            }

            // DAA (1 cycle)
            0x27 => {
                let result = alu::daa(self.regs.a, self.regs.f());
                self.regs.a = result.value;
                self.regs.set_f(result.flags);
            }

            // CPL (1 cycle). Z and C preserved.
            0x2F => {
                self.regs.a = !self.regs.a;
                self.regs.set_f((self.regs.f() & (ZF | CF)) | NF | HF);
            }

            // SCF (1 cycle). Z preserved.
            0x37 => self.regs.set_f((self.regs.f() & ZF) | CF),

            // CCF (1 cycle). Z preserved, C flipped.
            0x3F => self.regs.set_f((self.regs.f() & ZF) | ((self.regs.f() ^ CF) & CF)),

            // HALT (3 cycles total; power state is the machine's job)
            0x76 => {
                self.tick(bus);
                self.tick(bus);
            }

            // LD r, r' / LD r, (HL) / LD (HL), r (1 cycle; 2 with memory)
            0x40..=0x7F => {
                let dst = (op >> 3) & 7;
                let src = op & 7;
                if src == 6 {
                    let value = self.read(bus, self.regs.hl());
                    self.set_reg8(dst, value);
                } else if dst == 6 {
                    self.write(bus, self.regs.hl(), self.get_reg8(src));
                } else {
                    let value = self.get_reg8(src);
                    self.set_reg8(dst, value);
                }
            }

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP A, r / (HL) (1 cycle; 2 with memory)
            0x80..=0xBF => {
                let src = op & 7;
                let value = if src == 6 {
                    self.read(bus, self.regs.hl())
                } else {
                    self.get_reg8(src)
                };
                self.alu_a((op >> 3) & 7, value);
            }

            // RET cc (C0=NZ, C8=Z, D0=NC, D8=C; 2 cycles, 5 taken).
            // The internal cycle comes before the condition is tested.
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                self.tick(bus);
                if self.condition((op >> 3) & 3) {
                    let addr = self.pop_word(bus);
                    self.tick(bus);
                    self.regs.pc = addr;
                }
            }

            // POP rr (C1=BC, D1=DE, E1=HL, F1=AF; 3 cycles)
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop_word(bus);
                self.set_reg16_stack((op >> 4) & 3, value);
            }

            // JP cc, nn (3 cycles, 4 taken)
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let addr = self.fetch_word(bus);
                if self.condition((op >> 3) & 3) {
                    self.tick(bus);
                    self.regs.pc = addr;
                }
            }

            // JP nn (4 cycles)
            0xC3 => {
                let addr = self.fetch_word(bus);
                self.tick(bus);
                self.regs.pc = addr;
            }

            // CALL cc, nn (3 cycles, 6 taken)
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let addr = self.fetch_word(bus);
                if self.condition((op >> 3) & 3) {
                    self.tick(bus);
                    self.push_word(bus, self.regs.pc);
                    self.regs.pc = addr;
                }
            }

            // PUSH rr (C5=BC, D5=DE, E5=HL, F5=AF; 4 cycles, one internal)
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                self.tick(bus);
                let value = self.get_reg16_stack((op >> 4) & 3);
                self.push_word(bus, value);
            }

            // ADD/ADC/SUB/SBC/AND/XOR/OR/CP A, n (2 cycles)
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch(bus);
                self.alu_a((op >> 3) & 7, value);
            }

            // RST t (4 cycles, one internal)
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.tick(bus);
                self.push_word(bus, self.regs.pc);
                self.regs.pc = u16::from(op & 0x38);
            }

            // RET / RETI (4 cycles). Interrupt enable lives outside
            // the core, so RETI is plain RET here.
            0xC9 | 0xD9 => {
                let addr = self.pop_word(bus);
                self.tick(bus);
                self.regs.pc = addr;
            }

            // CB prefix: fetch the second opcode byte and dispatch the
            // extended table.
            0xCB => {
                let ext = self.fetch(bus);
                self.execute_cb(bus, ext);
            }

            // CALL nn (6 cycles)
            0xCD => {
                let addr = self.fetch_word(bus);
                self.tick(bus);
                self.push_word(bus, self.regs.pc);
                self.regs.pc = addr;
            }

            // LDH (n), A / LDH A, (n) (3 cycles)
            0xE0 => {
                let offset = self.fetch(bus);
                self.write(bus, 0xFF00 | u16::from(offset), self.regs.a);
            }
            0xF0 => {
                let offset = self.fetch(bus);
                self.regs.a = self.read(bus, 0xFF00 | u16::from(offset));
            }

            // LDH (C), A / LDH A, (C) (2 cycles)
            0xE2 => self.write(bus, 0xFF00 | u16::from(self.regs.c), self.regs.a),
            0xF2 => self.regs.a = self.read(bus, 0xFF00 | u16::from(self.regs.c)),

            // ADD SP, e (4 cycles, two internal)
            0xE8 => {
                let e = self.fetch(bus) as i8;
                self.tick(bus);
                self.tick(bus);
                let (value, flags) = alu::add16_signed(self.regs.sp, e);
                self.regs.sp = value;
                self.regs.set_f(flags);
            }

            // JP HL (1 cycle; no cycle beyond the fetch)
            0xE9 => self.regs.pc = self.regs.hl(),

            // LD (nn), A / LD A, (nn) (4 cycles)
            0xEA => {
                let addr = self.fetch_word(bus);
                self.write(bus, addr, self.regs.a);
            }
            0xFA => {
                let addr = self.fetch_word(bus);
                self.regs.a = self.read(bus, addr);
            }

            // DI / EI (1 cycle). The interrupt-enable flag lives in the
            // external interrupt controller; no CPU state changes here.
            0xF3 | 0xFB => {}

            // LD HL, SP+e (3 cycles, one internal)
            0xF8 => {
                let e = self.fetch(bus) as i8;
                self.tick(bus);
                let (value, flags) = alu::add16_signed(self.regs.sp, e);
                self.regs.set_hl(value);
                self.regs.set_f(flags);
            }

            // LD SP, HL (2 cycles, one internal)
            0xF9 => {
                self.tick(bus);
                self.regs.sp = self.regs.hl();
            }

            // Reserved opcodes with no defined behavior.
            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                log::warn!(
                    "illegal opcode ${op:02X} at ${:04X}",
                    self.regs.pc.wrapping_sub(1)
                );
                return Err(StepError::IllegalOpcode(op));
            }
        }

        Ok(())
    }

    /// Dispatch the 8-bit accumulator ALU family selected by bits 5-3.
    fn alu_a(&mut self, kind: u8, value: u8) {
        let result = match kind & 7 {
            0 => alu::add8(self.regs.a, value, false),
            1 => alu::add8(self.regs.a, value, self.regs.flag(CF)),
            2 => alu::sub8(self.regs.a, value, false),
            3 => alu::sub8(self.regs.a, value, self.regs.flag(CF)),
            4 => alu::and8(self.regs.a, value),
            5 => alu::xor8(self.regs.a, value),
            6 => alu::or8(self.regs.a, value),
            7 => {
                // CP: subtract and discard the result.
                let result = alu::sub8(self.regs.a, value, false);
                self.regs.set_f(result.flags);
                return;
            }
            _ => unreachable!(),
        };
        self.regs.a = result.value;
        self.regs.set_f(result.flags);
    }

    // =========================================================================
    // CB-prefixed opcode table
    // =========================================================================

    /// Execute a CB-prefixed instruction (2 cycles for register
    /// targets; 4 for `(HL)`, except BIT which does not write back and
    /// costs 3).
    fn execute_cb(&mut self, bus: &mut B, op: u8) {
        let target = op & 7;

        if target == 6 {
            let addr = self.regs.hl();
            let value = self.read(bus, addr);
            match op & 0xC0 {
                0x00 => {
                    let result = self.cb_shift(op, value);
                    self.write(bus, addr, result);
                }
                0x40 => self.cb_bit(op, value),
                0x80 => self.write(bus, addr, value & !(1 << ((op >> 3) & 7))),
                0xC0 => self.write(bus, addr, value | (1 << ((op >> 3) & 7))),
                _ => unreachable!(),
            }
            return;
        }

        let value = self.get_reg8(target);
        match op & 0xC0 {
            0x00 => {
                let result = self.cb_shift(op, value);
                self.set_reg8(target, result);
            }
            0x40 => self.cb_bit(op, value),
            0x80 => self.set_reg8(target, value & !(1 << ((op >> 3) & 7))),
            0xC0 => self.set_reg8(target, value | (1 << ((op >> 3) & 7))),
            _ => unreachable!(),
        }
    }

    /// Shift/rotate/swap family (CB 0x00-0x3F), selected by bits 5-3.
    /// Updates flags and returns the shifted value.
    fn cb_shift(&mut self, op: u8, value: u8) -> u8 {
        let result = match op & 0x38 {
            // RLC
            0x00 => alu::rlc8(value),
            // RRC
            0x08 => alu::rrc8(value),
            // RL
            0x10 => alu::rl8(value, self.regs.flag(CF)),
            // RR
            0x18 => alu::rr8(value, self.regs.flag(CF)),
            // SLA
            0x20 => alu::sla8(value),
            // SRA
            0x28 => alu::sra8(value),
            // SWAP
            0x30 => alu::swap8(value),
            // SRL
            0x38 => alu::srl8(value),
            _ => unreachable!(),
        };
        self.regs.set_f(result.flags);
        result.value
    }

    /// BIT n (CB 0x40-0x7F). C preserved; no write back.
    fn cb_bit(&mut self, op: u8, value: u8) {
        let bit = (op >> 3) & 7;
        let mut flags = (self.regs.f() & CF) | HF;
        if value & (1 << bit) == 0 {
            flags |= ZF;
        }
        self.regs.set_f(flags);
    }
}
