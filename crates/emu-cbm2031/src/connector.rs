//! Drive-side cable connector: bridges VIA1 to the IEEE-488 bus.
//!
//! VIA1 wiring:
//!   Port A: DIO data lines (the firmware drives pre-inverted data)
//!   Port B: bit 0 = ATNA out, bit 1 = NRFD, bit 2 = NDAC, bit 3 = EOI,
//!           bit 6 = DAV, bit 7 = inverted ATN in
//!   CA1:    inverted ATN (edge detect)
//!   CA2:    NRFD (edge detect)
//!
//! ATNA and the inverted ATN level are XORed in hardware; while they
//! disagree, the gate drives NRFD and NDAC low through an inverter,
//! which is how the drive acknowledges attention before the firmware
//! has reacted at all.

use bus_ieee488::{Connector, Ieee488, Signal};
use mos_via_6522::{ControlLine, Port, Via6522, PORT_B_DIR};

/// Attention acknowledge output.
const PB_ATNA: u8 = 0x01;
/// Not Ready For Data.
const PB_NRFD: u8 = 0x02;
/// Not Data Accepted.
const PB_NDAC: u8 = 0x04;
/// End Or Identify.
const PB_EOI: u8 = 0x08;
/// Data Valid.
const PB_DAV: u8 = 0x40;
/// Inverted ATN level input.
const PB_ATN_IN: u8 = 0x80;

/// Drive end of the IEEE-488 cable, wrapping the interface VIA for the
/// duration of one bus propagation.
pub struct DriveConnector<'a> {
    via: &'a mut Via6522,
}

impl<'a> DriveConnector<'a> {
    pub fn new(via: &'a mut Via6522) -> Self {
        Self { via }
    }
}

impl Connector for DriveConnector<'_> {
    /// Derive the bus state the drive is driving from VIA1's outputs.
    fn read(&mut self) -> Ieee488 {
        let mut out = Ieee488::new();
        let port_b = self.via.port_output(Port::B);
        let dir_b = self.via.peek(PORT_B_DIR);

        let atna = port_b & PB_ATNA != 0;
        let mut nrfd = port_b & PB_NRFD != 0;
        let mut ndac = port_b & PB_NDAC != 0;

        // The ATNA xor inverted-ATN gate: while they disagree, both
        // handshake lines are held low (asserted after the inverter)
        if atna != self.via.ctrl_level(ControlLine::Ca1) {
            nrfd = false;
            ndac = false;
        }

        out.nrfd = if dir_b & PB_NRFD == 0 {
            Signal::Floating // NRFD is an input
        } else {
            Signal::from_ttl(nrfd)
        };
        out.ndac = if dir_b & PB_NDAC == 0 {
            Signal::Floating // NDAC is an input
        } else {
            Signal::from_ttl(ndac)
        };
        out.eoi = if dir_b & PB_EOI == 0 {
            Signal::Floating
        } else {
            Signal::from_ttl(port_b & PB_EOI != 0)
        };
        out.dav = if dir_b & PB_DAV == 0 {
            Signal::Floating
        } else {
            Signal::from_ttl(port_b & PB_DAV != 0)
        };

        // Only output-configured data bits drive the bus
        out.dio = self.via.port_output(Port::A);
        out
    }

    /// Deliver the merged bus state to VIA1's inputs.
    fn write(&mut self, state: Ieee488) {
        let mut port_b = 0u8;

        // ATN is inverted onto PB7 and the CA1 edge input, so the
        // firmware can poll the level and take the interrupt
        let ttl = !state.atn.to_ttl();
        if ttl {
            port_b |= PB_ATN_IN;
        }
        self.via.ctrl_in(ControlLine::Ca1, ttl);

        let ttl = state.nrfd.to_ttl();
        if ttl {
            port_b |= PB_NRFD;
        }
        self.via.ctrl_in(ControlLine::Ca2, ttl);

        if state.ndac.to_ttl() {
            port_b |= PB_NDAC;
        }
        if state.eoi.to_ttl() {
            port_b |= PB_EOI;
        }
        if state.dav.to_ttl() {
            port_b |= PB_DAV;
        }

        self.via.port_input(Port::A, state.dio);
        self.via.port_input(Port::B, port_b);
    }
}
