//! 6502 CPU implementation.
//!
//! One `step` fetches, decodes, and executes a complete instruction.
//! Interrupt requests are sampled at the step boundary, like the real
//! part samples IRQ between instructions.

#![allow(clippy::cast_possible_truncation)]

use emu_core::{Bus, Cpu, StepError};

use crate::flags::{B, C, D, I, N, V, Z};
use crate::{Registers, Status};

/// Addressing modes of the documented instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

/// Documented instruction mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx,
    Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp,
    Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay,
    Tsx, Txa, Txs, Tya,
}

/// Decode a documented opcode into its operation and addressing mode.
#[rustfmt::skip]
fn decode(opcode: u8) -> Option<(Op, Mode)> {
    use Mode::*;
    use Op::*;
    Some(match opcode {
        0x00 => (Brk, Implied),     0x01 => (Ora, IndirectX),
        0x05 => (Ora, ZeroPage),    0x06 => (Asl, ZeroPage),
        0x08 => (Php, Implied),     0x09 => (Ora, Immediate),
        0x0A => (Asl, Accumulator), 0x0D => (Ora, Absolute),
        0x0E => (Asl, Absolute),    0x10 => (Bpl, Relative),
        0x11 => (Ora, IndirectY),   0x15 => (Ora, ZeroPageX),
        0x16 => (Asl, ZeroPageX),   0x18 => (Clc, Implied),
        0x19 => (Ora, AbsoluteY),   0x1D => (Ora, AbsoluteX),
        0x1E => (Asl, AbsoluteX),   0x20 => (Jsr, Absolute),
        0x21 => (And, IndirectX),   0x24 => (Bit, ZeroPage),
        0x25 => (And, ZeroPage),    0x26 => (Rol, ZeroPage),
        0x28 => (Plp, Implied),     0x29 => (And, Immediate),
        0x2A => (Rol, Accumulator), 0x2C => (Bit, Absolute),
        0x2D => (And, Absolute),    0x2E => (Rol, Absolute),
        0x30 => (Bmi, Relative),    0x31 => (And, IndirectY),
        0x35 => (And, ZeroPageX),   0x36 => (Rol, ZeroPageX),
        0x38 => (Sec, Implied),     0x39 => (And, AbsoluteY),
        0x3D => (And, AbsoluteX),   0x3E => (Rol, AbsoluteX),
        0x40 => (Rti, Implied),     0x41 => (Eor, IndirectX),
        0x45 => (Eor, ZeroPage),    0x46 => (Lsr, ZeroPage),
        0x48 => (Pha, Implied),     0x49 => (Eor, Immediate),
        0x4A => (Lsr, Accumulator), 0x4C => (Jmp, Absolute),
        0x4D => (Eor, Absolute),    0x4E => (Lsr, Absolute),
        0x50 => (Bvc, Relative),    0x51 => (Eor, IndirectY),
        0x55 => (Eor, ZeroPageX),   0x56 => (Lsr, ZeroPageX),
        0x58 => (Cli, Implied),     0x59 => (Eor, AbsoluteY),
        0x5D => (Eor, AbsoluteX),   0x5E => (Lsr, AbsoluteX),
        0x60 => (Rts, Implied),     0x61 => (Adc, IndirectX),
        0x65 => (Adc, ZeroPage),    0x66 => (Ror, ZeroPage),
        0x68 => (Pla, Implied),     0x69 => (Adc, Immediate),
        0x6A => (Ror, Accumulator), 0x6C => (Jmp, Indirect),
        0x6D => (Adc, Absolute),    0x6E => (Ror, Absolute),
        0x70 => (Bvs, Relative),    0x71 => (Adc, IndirectY),
        0x75 => (Adc, ZeroPageX),   0x76 => (Ror, ZeroPageX),
        0x78 => (Sei, Implied),     0x79 => (Adc, AbsoluteY),
        0x7D => (Adc, AbsoluteX),   0x7E => (Ror, AbsoluteX),
        0x81 => (Sta, IndirectX),   0x84 => (Sty, ZeroPage),
        0x85 => (Sta, ZeroPage),    0x86 => (Stx, ZeroPage),
        0x88 => (Dey, Implied),     0x8A => (Txa, Implied),
        0x8C => (Sty, Absolute),    0x8D => (Sta, Absolute),
        0x8E => (Stx, Absolute),    0x90 => (Bcc, Relative),
        0x91 => (Sta, IndirectY),   0x94 => (Sty, ZeroPageX),
        0x95 => (Sta, ZeroPageX),   0x96 => (Stx, ZeroPageY),
        0x98 => (Tya, Implied),     0x99 => (Sta, AbsoluteY),
        0x9A => (Txs, Implied),     0x9D => (Sta, AbsoluteX),
        0xA0 => (Ldy, Immediate),   0xA1 => (Lda, IndirectX),
        0xA2 => (Ldx, Immediate),   0xA4 => (Ldy, ZeroPage),
        0xA5 => (Lda, ZeroPage),    0xA6 => (Ldx, ZeroPage),
        0xA8 => (Tay, Implied),     0xA9 => (Lda, Immediate),
        0xAA => (Tax, Implied),     0xAC => (Ldy, Absolute),
        0xAD => (Lda, Absolute),    0xAE => (Ldx, Absolute),
        0xB0 => (Bcs, Relative),    0xB1 => (Lda, IndirectY),
        0xB4 => (Ldy, ZeroPageX),   0xB5 => (Lda, ZeroPageX),
        0xB6 => (Ldx, ZeroPageY),   0xB8 => (Clv, Implied),
        0xB9 => (Lda, AbsoluteY),   0xBA => (Tsx, Implied),
        0xBC => (Ldy, AbsoluteX),   0xBD => (Lda, AbsoluteX),
        0xBE => (Ldx, AbsoluteY),   0xC0 => (Cpy, Immediate),
        0xC1 => (Cmp, IndirectX),   0xC4 => (Cpy, ZeroPage),
        0xC5 => (Cmp, ZeroPage),    0xC6 => (Dec, ZeroPage),
        0xC8 => (Iny, Implied),     0xC9 => (Cmp, Immediate),
        0xCA => (Dex, Implied),     0xCC => (Cpy, Absolute),
        0xCD => (Cmp, Absolute),    0xCE => (Dec, Absolute),
        0xD0 => (Bne, Relative),    0xD1 => (Cmp, IndirectY),
        0xD5 => (Cmp, ZeroPageX),   0xD6 => (Dec, ZeroPageX),
        0xD8 => (Cld, Implied),     0xD9 => (Cmp, AbsoluteY),
        0xDD => (Cmp, AbsoluteX),   0xDE => (Dec, AbsoluteX),
        0xE0 => (Cpx, Immediate),   0xE1 => (Sbc, IndirectX),
        0xE4 => (Cpx, ZeroPage),    0xE5 => (Sbc, ZeroPage),
        0xE6 => (Inc, ZeroPage),    0xE8 => (Inx, Implied),
        0xE9 => (Sbc, Immediate),   0xEA => (Nop, Implied),
        0xEC => (Cpx, Absolute),    0xED => (Sbc, Absolute),
        0xEE => (Inc, Absolute),    0xF0 => (Beq, Relative),
        0xF1 => (Sbc, IndirectY),   0xF5 => (Sbc, ZeroPageX),
        0xF6 => (Inc, ZeroPageX),   0xF8 => (Sed, Implied),
        0xF9 => (Sbc, AbsoluteY),   0xFD => (Sbc, AbsoluteX),
        0xFE => (Inc, AbsoluteX),
        _ => return None,
    })
}

/// Resolved instruction operand.
#[derive(Debug, Clone, Copy)]
enum Operand {
    None,
    Accumulator,
    Address(u16),
}

/// The MOS 6502 CPU.
pub struct Mos6502 {
    /// CPU registers.
    pub regs: Registers,
    /// When set, each instruction is disassembled to stderr before it
    /// executes.
    pub trace: bool,
    /// An IRQ has been requested and not yet sampled.
    irq_pending: bool,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    /// Create a new 6502 in reset state. The program counter is loaded
    /// by `reset` once a bus is available.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            trace: false,
            irq_pending: false,
        }
    }

    fn read_word<BUS: Bus>(bus: &mut BUS, addr: u16) -> u16 {
        let lo = bus.read(addr);
        let hi = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Fetch the next program byte.
    fn fetch<BUS: Bus>(&mut self, bus: &mut BUS) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_word<BUS: Bus>(&mut self, bus: &mut BUS) -> u16 {
        let lo = self.fetch(bus);
        let hi = self.fetch(bus);
        u16::from_le_bytes([lo, hi])
    }

    /// Resolve the operand for an addressing mode, consuming the
    /// operand bytes.
    fn fetch_operand<BUS: Bus>(&mut self, bus: &mut BUS, mode: Mode) -> Operand {
        match mode {
            Mode::Implied => Operand::None,
            Mode::Accumulator => Operand::Accumulator,
            // The branch offset is consumed by the branch itself
            Mode::Immediate | Mode::Relative => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                Operand::Address(addr)
            }
            Mode::ZeroPage => Operand::Address(u16::from(self.fetch(bus))),
            Mode::ZeroPageX => {
                Operand::Address(u16::from(self.fetch(bus).wrapping_add(self.regs.x)))
            }
            Mode::ZeroPageY => {
                Operand::Address(u16::from(self.fetch(bus).wrapping_add(self.regs.y)))
            }
            Mode::Absolute => Operand::Address(self.fetch_word(bus)),
            Mode::AbsoluteX => {
                Operand::Address(self.fetch_word(bus).wrapping_add(u16::from(self.regs.x)))
            }
            Mode::AbsoluteY => {
                Operand::Address(self.fetch_word(bus).wrapping_add(u16::from(self.regs.y)))
            }
            Mode::Indirect => {
                // The NMOS part never carries into the pointer's high
                // byte: ($xxFF) wraps within the page
                let ptr = self.fetch_word(bus);
                let lo = bus.read(ptr);
                let hi = bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
                Operand::Address(u16::from_le_bytes([lo, hi]))
            }
            Mode::IndirectX => {
                let ptr = self.fetch(bus).wrapping_add(self.regs.x);
                let lo = bus.read(u16::from(ptr));
                let hi = bus.read(u16::from(ptr.wrapping_add(1)));
                Operand::Address(u16::from_le_bytes([lo, hi]))
            }
            Mode::IndirectY => {
                let ptr = self.fetch(bus);
                let lo = bus.read(u16::from(ptr));
                let hi = bus.read(u16::from(ptr.wrapping_add(1)));
                Operand::Address(u16::from_le_bytes([lo, hi]).wrapping_add(u16::from(self.regs.y)))
            }
        }
    }

    fn load<BUS: Bus>(&mut self, bus: &mut BUS, operand: Operand) -> u8 {
        match operand {
            Operand::Address(addr) => bus.read(addr),
            Operand::Accumulator => self.regs.a,
            Operand::None => 0,
        }
    }

    /// Read-modify-write through an operand (shifts, INC/DEC).
    fn modify<BUS: Bus>(
        &mut self,
        bus: &mut BUS,
        operand: Operand,
        f: impl FnOnce(&mut Self, u8) -> u8,
    ) {
        match operand {
            Operand::Address(addr) => {
                let value = bus.read(addr);
                let result = f(self, value);
                bus.write(addr, result);
            }
            Operand::Accumulator => {
                let result = f(self, self.regs.a);
                self.regs.a = result;
            }
            Operand::None => {}
        }
    }

    fn push<BUS: Bus>(&mut self, bus: &mut BUS, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    fn pop<BUS: Bus>(&mut self, bus: &mut BUS) -> u8 {
        let addr = self.regs.pop();
        bus.read(addr)
    }

    fn branch<BUS: Bus>(&mut self, bus: &mut BUS, operand: Operand, taken: bool) {
        let Operand::Address(addr) = operand else {
            return;
        };
        let offset = bus.read(addr) as i8;
        if taken {
            self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
        }
    }

    fn adc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.adc_decimal(value);
        } else {
            let a = self.regs.a;
            let carry = u8::from(self.regs.p.is_set(C));
            let sum = u16::from(a) + u16::from(value) + u16::from(carry);
            let result = sum as u8;
            self.regs.p.set_if(C, sum > 0xFF);
            self.regs.p.set_if(V, (a ^ result) & (value ^ result) & 0x80 != 0);
            self.regs.p.update_nz(result);
            self.regs.a = result;
        }
    }

    /// BCD addition. A and C match the NMOS part exactly; N/V/Z are
    /// taken from the binary intermediate.
    fn adc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));
        let bin = (u16::from(a) + u16::from(value) + u16::from(carry)) as u8;
        self.regs.p.set_if(V, (a ^ bin) & (value ^ bin) & 0x80 != 0);
        self.regs.p.update_nz(bin);

        let mut lo = (a & 0x0F) + (value & 0x0F) + carry;
        let mut hi = u16::from(a >> 4) + u16::from(value >> 4);
        if lo > 9 {
            lo += 6;
            hi += 1;
        }
        if hi > 9 {
            hi += 6;
        }
        self.regs.p.set_if(C, hi > 0x0F);
        self.regs.a = ((hi as u8) << 4) | (lo & 0x0F);
    }

    fn sbc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.sbc_decimal(value);
        } else {
            // Subtraction is addition of the complement
            self.adc(!value);
        }
    }

    /// BCD subtraction. Flags come from the binary result, as on the
    /// NMOS part.
    fn sbc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = u8::from(!self.regs.p.is_set(C));
        let bin = i16::from(a) - i16::from(value) - i16::from(borrow);
        let result = bin as u8;
        self.regs.p.set_if(C, bin >= 0);
        self.regs.p.set_if(V, (a ^ value) & (a ^ result) & 0x80 != 0);
        self.regs.p.update_nz(result);

        let mut lo = i16::from(a & 0x0F) - i16::from(value & 0x0F) - i16::from(borrow);
        let mut hi = i16::from(a >> 4) - i16::from(value >> 4);
        if lo < 0 {
            lo += 10;
            hi -= 1;
        }
        if hi < 0 {
            hi += 10;
        }
        self.regs.a = ((hi as u8) << 4) | (lo as u8 & 0x0F);
    }

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.regs.p.set_if(C, register >= value);
        self.regs.p.update_nz(result);
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = value << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = value >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C)) << 7;
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    /// Take the IRQ: push state and vector through $FFFE.
    fn service_irq<BUS: Bus>(&mut self, bus: &mut BUS) {
        let pc = self.regs.pc;
        self.push(bus, (pc >> 8) as u8);
        self.push(bus, pc as u8);
        let status = self.regs.p.to_byte_irq();
        self.push(bus, status);
        self.regs.p.set(I);
        self.regs.pc = Self::read_word(bus, 0xFFFE);
    }

    fn execute<BUS: Bus>(&mut self, bus: &mut BUS, op: Op, mode: Mode) {
        let operand = self.fetch_operand(bus, mode);
        match op {
            Op::Lda => {
                let value = self.load(bus, operand);
                self.regs.a = value;
                self.regs.p.update_nz(value);
            }
            Op::Ldx => {
                let value = self.load(bus, operand);
                self.regs.x = value;
                self.regs.p.update_nz(value);
            }
            Op::Ldy => {
                let value = self.load(bus, operand);
                self.regs.y = value;
                self.regs.p.update_nz(value);
            }
            Op::Sta => {
                if let Operand::Address(addr) = operand {
                    bus.write(addr, self.regs.a);
                }
            }
            Op::Stx => {
                if let Operand::Address(addr) = operand {
                    bus.write(addr, self.regs.x);
                }
            }
            Op::Sty => {
                if let Operand::Address(addr) = operand {
                    bus.write(addr, self.regs.y);
                }
            }
            Op::Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
            }
            Op::Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Tsx => {
                self.regs.x = self.regs.s;
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Txs => self.regs.s = self.regs.x, // No flags
            Op::Pha => self.push(bus, self.regs.a),
            Op::Php => {
                let status = self.regs.p.to_byte_brk();
                self.push(bus, status);
            }
            Op::Pla => {
                let value = self.pop(bus);
                self.regs.a = value;
                self.regs.p.update_nz(value);
            }
            Op::Plp => {
                let value = self.pop(bus);
                self.regs.p = Status::from_byte(value & !B);
            }
            Op::Adc => {
                let value = self.load(bus, operand);
                self.adc(value);
            }
            Op::Sbc => {
                let value = self.load(bus, operand);
                self.sbc(value);
            }
            Op::And => {
                let value = self.load(bus, operand);
                self.regs.a &= value;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Ora => {
                let value = self.load(bus, operand);
                self.regs.a |= value;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Eor => {
                let value = self.load(bus, operand);
                self.regs.a ^= value;
                self.regs.p.update_nz(self.regs.a);
            }
            Op::Cmp => {
                let value = self.load(bus, operand);
                self.compare(self.regs.a, value);
            }
            Op::Cpx => {
                let value = self.load(bus, operand);
                self.compare(self.regs.x, value);
            }
            Op::Cpy => {
                let value = self.load(bus, operand);
                self.compare(self.regs.y, value);
            }
            Op::Bit => {
                let value = self.load(bus, operand);
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                self.regs.p.set_if(N, value & 0x80 != 0);
                self.regs.p.set_if(V, value & 0x40 != 0);
            }
            Op::Inc => self.modify(bus, operand, |cpu, v| {
                let result = v.wrapping_add(1);
                cpu.regs.p.update_nz(result);
                result
            }),
            Op::Dec => self.modify(bus, operand, |cpu, v| {
                let result = v.wrapping_sub(1);
                cpu.regs.p.update_nz(result);
                result
            }),
            Op::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Op::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Op::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Op::Asl => self.modify(bus, operand, Self::asl),
            Op::Lsr => self.modify(bus, operand, Self::lsr),
            Op::Rol => self.modify(bus, operand, Self::rol),
            Op::Ror => self.modify(bus, operand, Self::ror),
            Op::Jmp => {
                if let Operand::Address(addr) = operand {
                    self.regs.pc = addr;
                }
            }
            Op::Jsr => {
                if let Operand::Address(addr) = operand {
                    // Push the address of the last operand byte
                    let ret = self.regs.pc.wrapping_sub(1);
                    self.push(bus, (ret >> 8) as u8);
                    self.push(bus, ret as u8);
                    self.regs.pc = addr;
                }
            }
            Op::Rts => {
                let lo = self.pop(bus);
                let hi = self.pop(bus);
                self.regs.pc = u16::from_le_bytes([lo, hi]).wrapping_add(1);
            }
            Op::Brk => {
                // BRK occupies two bytes; the padding byte is skipped
                let ret = self.regs.pc.wrapping_add(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                let status = self.regs.p.to_byte_brk();
                self.push(bus, status);
                self.regs.p.set(I);
                self.regs.pc = Self::read_word(bus, 0xFFFE);
            }
            Op::Rti => {
                let status = self.pop(bus);
                self.regs.p = Status::from_byte(status & !B);
                let lo = self.pop(bus);
                let hi = self.pop(bus);
                self.regs.pc = u16::from_le_bytes([lo, hi]);
            }
            Op::Bcc => self.branch(bus, operand, !self.regs.p.is_set(C)),
            Op::Bcs => self.branch(bus, operand, self.regs.p.is_set(C)),
            Op::Beq => self.branch(bus, operand, self.regs.p.is_set(Z)),
            Op::Bne => self.branch(bus, operand, !self.regs.p.is_set(Z)),
            Op::Bmi => self.branch(bus, operand, self.regs.p.is_set(N)),
            Op::Bpl => self.branch(bus, operand, !self.regs.p.is_set(N)),
            Op::Bvs => self.branch(bus, operand, self.regs.p.is_set(V)),
            Op::Bvc => self.branch(bus, operand, !self.regs.p.is_set(V)),
            Op::Clc => self.regs.p.clear(C),
            Op::Sec => self.regs.p.set(C),
            Op::Cli => self.regs.p.clear(I),
            Op::Sei => self.regs.p.set(I),
            Op::Clv => self.regs.p.clear(V),
            Op::Cld => self.regs.p.clear(D),
            Op::Sed => self.regs.p.set(D),
            Op::Nop => {}
        }
    }

    /// Disassemble the instruction at `pc` to stderr.
    fn trace_instruction<BUS: Bus>(&self, bus: &mut BUS, pc: u16, op: Op, mode: Mode) {
        let mnemonic = format!("{op:?}").to_ascii_uppercase();
        let opcode = bus.read(pc);
        let lo = bus.read(pc.wrapping_add(1));
        let hi = bus.read(pc.wrapping_add(2));
        let word = u16::from_le_bytes([lo, hi]);

        let one = format!("{opcode:02x}");
        let two = format!("{opcode:02x} {lo:02x}");
        let three = format!("{opcode:02x} {lo:02x} {hi:02x}");
        let (bytes, operand) = match mode {
            Mode::Implied => (one, String::new()),
            Mode::Accumulator => (one, "A".to_string()),
            Mode::Immediate => (two, format!("#${lo:02x}")),
            Mode::ZeroPage => (two, format!("${lo:02x}")),
            Mode::ZeroPageX => (two, format!("${lo:02x},X")),
            Mode::ZeroPageY => (two, format!("${lo:02x},Y")),
            Mode::Absolute => (three, format!("${word:04x}")),
            Mode::AbsoluteX => (three, format!("${word:04x},X")),
            Mode::AbsoluteY => (three, format!("${word:04x},Y")),
            Mode::Indirect => (three, format!("(${word:04x})")),
            Mode::IndirectX => (two, format!("(${lo:02x},X)")),
            Mode::IndirectY => (two, format!("(${lo:02x}),Y")),
            Mode::Relative => {
                let target = pc.wrapping_add(2).wrapping_add(lo as i8 as u16);
                (two, format!("${target:04x}"))
            }
        };
        eprintln!("{pc:04x}  {bytes:<9} {mnemonic} {operand}");
    }
}

impl Cpu for Mos6502 {
    fn reset<BUS: Bus>(&mut self, bus: &mut BUS) {
        self.regs = Registers::new();
        self.regs.pc = Self::read_word(bus, 0xFFFC);
        self.irq_pending = false;
    }

    fn step<BUS: Bus>(&mut self, bus: &mut BUS) -> Result<(), StepError> {
        if self.irq_pending {
            // The request is consumed either way; a level-style source
            // re-raises it on the next loop iteration
            self.irq_pending = false;
            if !self.regs.p.is_set(I) {
                self.service_irq(bus);
                return Ok(());
            }
        }

        let pc = self.regs.pc;
        let opcode = bus.read(pc);
        let (op, mode) = decode(opcode).ok_or(StepError::IllegalOpcode { opcode, pc })?;
        if self.trace {
            self.trace_instruction(bus, pc, op, mode);
        }
        self.regs.pc = pc.wrapping_add(1);
        self.execute(bus, op, mode);
        Ok(())
    }

    fn interrupt(&mut self) {
        self.irq_pending = true;
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }
}
