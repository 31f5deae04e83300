//! Unit tests for 6502 instruction behavior.

use emu_core::{Bus, Cpu, SimpleBus, StepError};
use mos_6502::{flags, Mos6502};

/// Load a program at $0200 and point PC there.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6502, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.regs.pc = 0x0200;
}

fn run(cpu: &mut Mos6502, bus: &mut SimpleBus, instructions: usize) {
    for _ in 0..instructions {
        cpu.step(bus).expect("legal program");
    }
}

#[test]
fn lda_sets_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x00, 0xA9, 0x80]);

    run(&mut cpu, &mut bus, 1); // LDA #$00
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(!cpu.regs.p.is_set(flags::N));

    run(&mut cpu, &mut bus, 1); // LDA #$80
    assert_eq!(cpu.regs.a, 0x80);
    assert!(!cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDA #$42; LDX #$FF; TXS; PHA; LDA #$00; PLA
    let program = [0xA9, 0x42, 0xA2, 0xFF, 0x9A, 0x48, 0xA9, 0x00, 0x68];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xFF, "SP should be back to $FF after PLA");
}

#[test]
fn stack_php_plp() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDX #$FF; TXS; SEC; PHP; CLC; PLP
    let program = [0xA2, 0xFF, 0x9A, 0x38, 0x08, 0x18, 0x28];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6);

    assert!(cpu.regs.p.is_set(flags::C), "PLP should restore carry");
}

#[test]
fn adc_carry_and_overflow() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // CLC; LDA #$7F; ADC #$01 -> $80, V set, C clear
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0x7F, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(!cpu.regs.p.is_set(flags::C));

    // CLC; LDA #$FF; ADC #$01 -> $00, C set, Z set
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0xFF, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::Z));
}

#[test]
fn adc_decimal_mode() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SED; CLC; LDA #$19; ADC #$01 -> $20 in BCD
    setup_program(&mut bus, &mut cpu, &[0xF8, 0x18, 0xA9, 0x19, 0x69, 0x01]);
    run(&mut cpu, &mut bus, 4);
    assert_eq!(cpu.regs.a, 0x20);
    assert!(!cpu.regs.p.is_set(flags::C));

    // SED; SEC; LDA #$99; ADC #$00 -> $00 with carry out
    setup_program(&mut bus, &mut cpu, &[0xF8, 0x38, 0xA9, 0x99, 0x69, 0x00]);
    run(&mut cpu, &mut bus, 4);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn sbc_borrow() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEC; LDA #$10; SBC #$01 -> $0F, C still set (no borrow)
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x10, 0xE9, 0x01]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0x0F);
    assert!(cpu.regs.p.is_set(flags::C));

    // SEC; LDA #$00; SBC #$01 -> $FF with borrow (C clear)
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x00, 0xE9, 0x01]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0xFF);
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn sbc_decimal_mode() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SED; SEC; LDA #$20; SBC #$01 -> $19 in BCD
    setup_program(&mut bus, &mut cpu, &[0xF8, 0x38, 0xA9, 0x20, 0xE9, 0x01]);
    run(&mut cpu, &mut bus, 4);
    assert_eq!(cpu.regs.a, 0x19);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn cmp_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDA #$40; CMP #$40
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x40, 0xC9, 0x40]);
    run(&mut cpu, &mut bus, 2);
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::C));

    // LDA #$40; CMP #$41
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x40, 0xC9, 0x41]);
    run(&mut cpu, &mut bus, 2);
    assert!(!cpu.regs.p.is_set(flags::Z));
    assert!(!cpu.regs.p.is_set(flags::C));
}

#[test]
fn bit_copies_high_bits() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0xC0);

    // LDA #$00; BIT $10
    setup_program(&mut bus, &mut cpu, &[0xA9, 0x00, 0x24, 0x10]);
    run(&mut cpu, &mut bus, 2);
    assert!(cpu.regs.p.is_set(flags::Z)); // A & M == 0
    assert!(cpu.regs.p.is_set(flags::N));
    assert!(cpu.regs.p.is_set(flags::V));
}

#[test]
fn branches_taken_and_not_taken() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // LDX #$02; loop: DEX; BNE loop; LDA #$55
    let program = [0xA2, 0x02, 0xCA, 0xD0, 0xFD, 0xA9, 0x55];
    setup_program(&mut bus, &mut cpu, &program);
    run(&mut cpu, &mut bus, 6); // LDX, DEX, BNE (taken), DEX, BNE (not), LDA
    assert_eq!(cpu.regs.x, 0);
    assert_eq!(cpu.regs.a, 0x55);
}

#[test]
fn jsr_rts_round_trip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // $0200: JSR $0300; LDA #$01
    // $0300: LDX #$7F; RTS
    setup_program(&mut bus, &mut cpu, &[0x20, 0x00, 0x03, 0xA9, 0x01]);
    bus.load(0x0300, &[0xA2, 0x7F, 0x60]);

    run(&mut cpu, &mut bus, 4);
    assert_eq!(cpu.regs.x, 0x7F);
    assert_eq!(cpu.regs.a, 0x01);
    assert_eq!(cpu.regs.pc, 0x0205);
}

#[test]
fn jmp_indirect_page_wrap_quirk() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // Pointer at $02FF: low byte at $02FF, high byte fetched from
    // $0200 (not $0300) on the NMOS part
    bus.write(0x02FF, 0x34);
    bus.write(0x0300, 0x99); // Would be used by a fixed part
    bus.write(0x0200, 0x12);

    bus.load(0x0400, &[0x6C, 0xFF, 0x02]); // JMP ($02FF)
    cpu.regs.pc = 0x0400;
    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn indexed_indirect_addressing() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // ($20,X) with X=4 -> pointer at $24/$25 -> $0380
    bus.write(0x0024, 0x80);
    bus.write(0x0025, 0x03);
    bus.write(0x0380, 0xAB);

    // LDX #$04; LDA ($20,X)
    setup_program(&mut bus, &mut cpu, &[0xA2, 0x04, 0xA1, 0x20]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.a, 0xAB);

    // ($40),Y with Y=$10 -> pointer $0390 + $10 = $03A0
    bus.write(0x0040, 0x90);
    bus.write(0x0041, 0x03);
    bus.write(0x03A0, 0xCD);

    // LDY #$10; LDA ($40),Y
    setup_program(&mut bus, &mut cpu, &[0xA0, 0x10, 0xB1, 0x40]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.a, 0xCD);
}

#[test]
fn rmw_on_memory() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x41);

    // ASL $10; INC $10
    setup_program(&mut bus, &mut cpu, &[0x06, 0x10, 0xE6, 0x10]);
    run(&mut cpu, &mut bus, 2);
    assert_eq!(bus.read(0x0010), 0x83);
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn rol_ror_through_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEC; LDA #$80; ROL A -> $01, carry out set
    setup_program(&mut bus, &mut cpu, &[0x38, 0xA9, 0x80, 0x2A]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(cpu.regs.p.is_set(flags::C));

    // CLC; LDA #$01; ROR A -> $00, carry out set
    setup_program(&mut bus, &mut cpu, &[0x18, 0xA9, 0x01, 0x6A]);
    run(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn reset_loads_vector() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0xFFFC, &[0x00, 0xC0]);
    cpu.reset(&mut bus);
    assert_eq!(cpu.pc(), 0xC000);
    assert!(cpu.regs.p.is_set(flags::I));
}

#[test]
fn irq_serviced_when_unmasked() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0xFFFE, &[0x00, 0x05]); // IRQ vector -> $0500
    bus.load(0x0500, &[0xA9, 0x77]); // Handler: LDA #$77

    // CLI; NOP
    setup_program(&mut bus, &mut cpu, &[0x58, 0xEA]);
    run(&mut cpu, &mut bus, 1); // CLI

    cpu.interrupt();
    run(&mut cpu, &mut bus, 1); // Step consumes the IRQ
    assert_eq!(cpu.regs.pc, 0x0500);
    assert!(cpu.regs.p.is_set(flags::I), "IRQ entry masks interrupts");

    run(&mut cpu, &mut bus, 1);
    assert_eq!(cpu.regs.a, 0x77);
}

#[test]
fn irq_masked_by_i_flag() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();

    // SEI; LDA #$11
    setup_program(&mut bus, &mut cpu, &[0x78, 0xA9, 0x11]);
    run(&mut cpu, &mut bus, 1); // SEI

    cpu.interrupt();
    run(&mut cpu, &mut bus, 1); // Executes LDA, not the handler
    assert_eq!(cpu.regs.a, 0x11);
}

#[test]
fn irq_return_resumes_after_rti() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0xFFFE, &[0x00, 0x05]); // IRQ vector -> $0500
    bus.load(0x0500, &[0xA2, 0x09, 0x40]); // LDX #$09; RTI

    // CLI; LDA #$33
    setup_program(&mut bus, &mut cpu, &[0x58, 0xA9, 0x33]);
    run(&mut cpu, &mut bus, 1); // CLI
    cpu.interrupt();
    run(&mut cpu, &mut bus, 3); // Enter handler, LDX, RTI
    assert_eq!(cpu.regs.x, 0x09);
    assert!(!cpu.regs.p.is_set(flags::I), "RTI restores the I flag");

    run(&mut cpu, &mut bus, 1); // Interrupted instruction runs now
    assert_eq!(cpu.regs.a, 0x33);
}

#[test]
fn brk_pushes_and_vectors() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.load(0xFFFE, &[0x00, 0x06]);
    bus.load(0x0600, &[0x40]); // RTI

    // LDX #$FF; TXS; BRK; (padding); LDA #$21
    setup_program(&mut bus, &mut cpu, &[0xA2, 0xFF, 0x9A, 0x00, 0xEA, 0xA9, 0x21]);
    run(&mut cpu, &mut bus, 3); // LDX, TXS, BRK
    assert_eq!(cpu.regs.pc, 0x0600);

    run(&mut cpu, &mut bus, 2); // RTI, LDA
    // BRK skips its padding byte
    assert_eq!(cpu.regs.a, 0x21);
}

#[test]
fn illegal_opcode_is_an_error() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x02]); // JAM

    let err = cpu.step(&mut bus).unwrap_err();
    assert_eq!(
        err,
        StepError::IllegalOpcode {
            opcode: 0x02,
            pc: 0x0200
        }
    );
}
