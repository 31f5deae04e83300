//! Machine-level test: the hardware attention acknowledge.
//!
//! A minimal ROM configures VIA1's handshake outputs and parks in a
//! loop. Asserting ATN from the host end must pull NRFD and NDAC low
//! through the ATNA xor gate with no firmware involvement, which is
//! exactly how the real drive acknowledges attention.

use std::sync::{Arc, Mutex};

use bus_ieee488::Signal;
use emu_cbm2031::{Cbm2031, Cbm2031Config, HostConnector, ROM_SIZE};
use mos_6502::Mos6502;
use mos_via_6522::PORT_B;

/// High ROM with a reset vector to $E000 and a program that sets DDRB
/// bits 1-2 as outputs, releases NRFD/NDAC, and loops.
fn make_high_rom() -> Vec<u8> {
    let mut rom = vec![0xEA; ROM_SIZE];
    let program = [
        0xA9, 0x06, // LDA #$06
        0x8D, 0x02, 0x18, // STA $1802 (DDRB: NRFD, NDAC outputs)
        0x8D, 0x00, 0x18, // STA $1800 (port B: both released)
        0x4C, 0x08, 0xE0, // JMP $E008
    ];
    rom[..program.len()].copy_from_slice(&program);
    rom[0x1FFC] = 0x00; // Reset vector -> $E000
    rom[0x1FFD] = 0xE0;
    rom
}

fn make_machine(host: Arc<Mutex<HostConnector>>) -> Cbm2031<Mos6502> {
    let config = Cbm2031Config {
        low_rom: vec![0xEA; ROM_SIZE],
        high_rom: make_high_rom(),
    };
    Cbm2031::new(Mos6502::new(), config, host)
}

#[test]
fn atn_is_acknowledged_in_hardware() {
    let host = Arc::new(Mutex::new(HostConnector::new()));
    let mut machine = make_machine(Arc::clone(&host));

    // Let the setup code run; the bus settles with both lines released
    for _ in 0..8 {
        machine.step().expect("setup program");
    }
    {
        let host = host.lock().unwrap();
        assert_eq!(host.inward.ndac, Signal::Negated);
        assert_eq!(host.inward.nrfd, Signal::Negated);
    }

    // Assert attention: the gate must answer without firmware help
    host.lock().unwrap().outward.atn = Signal::Asserted;
    for _ in 0..4 {
        machine.step().expect("idle loop");
    }
    {
        let host = host.lock().unwrap();
        assert_eq!(host.inward.ndac, Signal::Asserted);
        assert_eq!(host.inward.nrfd, Signal::Asserted);
    }
    // The firmware-visible ATN level on PB7 follows, inverted
    assert_ne!(machine.bus.via1.peek(PORT_B) & 0x80, 0);

    // Release attention: the lines go back to the port B values
    host.lock().unwrap().outward.atn = Signal::Negated;
    for _ in 0..4 {
        machine.step().expect("idle loop");
    }
    {
        let host = host.lock().unwrap();
        assert_eq!(host.inward.ndac, Signal::Negated);
        assert_eq!(host.inward.nrfd, Signal::Negated);
    }
    assert_eq!(machine.bus.via1.peek(PORT_B) & 0x80, 0);
}
