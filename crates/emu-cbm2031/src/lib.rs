//! Commodore CBM 2031 floppy drive emulation.
//!
//! The 2031 is the IEEE-488 sibling of the 1541: its own 6502 running
//! the DOS ROM, 2 KiB-style zero-page workspace in 8 KiB of RAM, and
//! two MOS 6522 VIAs:
//!
//!   VIA1 ($1800): IEEE-488 bus interface
//!     Port A: DIO data lines (inverted convention on the wire)
//!     Port B: bit 0 = ATNA, bit 1 = NRFD, bit 2 = NDAC, bit 3 = EOI,
//!             bit 6 = DAV, bit 7 = inverted ATN level
//!     CA1:    inverted ATN edge detect
//!     CA2:    NRFD edge detect
//!
//!   VIA2 ($1C00): Disk controller (timer and mechanics side)
//!
//! The host side of the cable is a passive connector latch driven by a
//! monitor REPL that plays bus controller: it can address the drive to
//! talk and read bytes back with the full DAV/NRFD/NDAC handshake.

pub mod bus;
pub mod cbm2031;
pub mod config;
pub mod connector;
pub mod host;
pub mod monitor;

pub use bus::DriveBus;
pub use cbm2031::Cbm2031;
pub use config::{load_rom, Cbm2031Config, ROM_SIZE};
pub use connector::DriveConnector;
pub use host::{BusController, HostConnector, SECOND, TALK, UNTALK};
pub use monitor::Monitor;
