//! Drive bus: address decoding for the drive's internal 6502.
//!
//! Address map:
//!   $0000-$1FFF: 8 KiB RAM
//!   $1800-$180F: VIA1 — IEEE-488 interface (wins over RAM)
//!   $1C00-$1C0F: VIA2 — disk controller (wins over RAM)
//!   $C000-$DFFF: DOS ROM, low half
//!   $E000-$FFFF: DOS ROM, high half
//!
//! Everything else reads zero and ignores writes.

#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;
use mos_via_6522::Via6522;

use crate::config::ROM_SIZE;

/// 8 KiB of drive RAM.
pub const RAM_SIZE: usize = 8 * 1024;
/// Base address of the IEEE-488 interface VIA.
pub const VIA1_BASE: u16 = 0x1800;
/// Base address of the disk controller VIA.
pub const VIA2_BASE: u16 = 0x1C00;

/// CBM 2031 drive bus.
pub struct DriveBus {
    /// Drive RAM.
    ram: Vec<u8>,
    /// DOS ROM at $C000.
    low_rom: Vec<u8>,
    /// DOS ROM at $E000.
    high_rom: Vec<u8>,
    /// VIA1: IEEE-488 interface.
    pub via1: Via6522,
    /// VIA2: disk controller.
    pub via2: Via6522,
}

impl DriveBus {
    /// Create a new drive bus with the given ROM halves.
    ///
    /// Each ROM must be 8,192 bytes.
    #[must_use]
    pub fn new(low_rom: Vec<u8>, high_rom: Vec<u8>) -> Self {
        assert!(low_rom.len() == ROM_SIZE, "low ROM must be {ROM_SIZE} bytes");
        assert!(
            high_rom.len() == ROM_SIZE,
            "high ROM must be {ROM_SIZE} bytes"
        );
        Self {
            ram: vec![0; RAM_SIZE],
            low_rom,
            high_rom,
            via1: Via6522::new(),
            via2: Via6522::new(),
        }
    }

    /// Whether either VIA is raising the shared interrupt line.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.via1.irq_active() || self.via2.irq_active()
    }

    /// Borrow the drive RAM.
    #[must_use]
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Borrow the drive RAM mutably.
    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }
}

impl Bus for DriveBus {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            0x1800..=0x180F => self.via1.read((address - VIA1_BASE) as u8),
            0x1C00..=0x1C0F => self.via2.read((address - VIA2_BASE) as u8),
            0xC000..=0xDFFF => self.low_rom[usize::from(address - 0xC000)],
            0xE000..=0xFFFF => self.high_rom[usize::from(address - 0xE000)],
            0x0000..=0x1FFF => self.ram[usize::from(address)],
            _ => 0,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x1800..=0x180F => self.via1.write((address - VIA1_BASE) as u8, value),
            0x1C00..=0x1C0F => self.via2.write((address - VIA2_BASE) as u8, value),
            0xC000..=0xFFFF => {} // ROM — writes ignored
            0x0000..=0x1FFF => self.ram[usize::from(address)] = value,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bus() -> DriveBus {
        DriveBus::new(vec![0xEA; ROM_SIZE], vec![0xEA; ROM_SIZE])
    }

    #[test]
    fn ram_read_write() {
        let mut bus = make_bus();
        bus.write(0x0000, 0xAB);
        assert_eq!(bus.read(0x0000), 0xAB);
        bus.write(0x1FFF, 0x55);
        assert_eq!(bus.read(0x1FFF), 0x55);
    }

    #[test]
    fn rom_read() {
        let mut low = vec![0; ROM_SIZE];
        let mut high = vec![0; ROM_SIZE];
        low[0] = 0x42; // $C000
        high[ROM_SIZE - 1] = 0xFF; // $FFFF
        let mut bus = DriveBus::new(low, high);
        assert_eq!(bus.read(0xC000), 0x42);
        assert_eq!(bus.read(0xFFFF), 0xFF);
    }

    #[test]
    fn rom_write_ignored() {
        let mut bus = make_bus();
        bus.write(0xC000, 0x00);
        assert_eq!(bus.read(0xC000), 0xEA); // Unchanged
    }

    #[test]
    fn via_windows_win_over_ram() {
        let mut bus = make_bus();
        bus.write(0x1803, 0xFF); // VIA1 DDR A
        assert_eq!(bus.read(0x1803), 0xFF);
        assert_eq!(bus.ram()[0x1803], 0); // RAM untouched

        bus.write(0x1C03, 0xAA); // VIA2 DDR A
        assert_eq!(bus.read(0x1C03), 0xAA);
    }

    #[test]
    fn via_windows_are_sixteen_bytes() {
        let mut bus = make_bus();
        // Just past the VIA window: plain RAM again
        bus.write(0x1810, 0x77);
        assert_eq!(bus.read(0x1810), 0x77);
        assert_eq!(bus.ram()[0x1810], 0x77);
    }

    #[test]
    fn unmapped_reads_zero_and_drops_writes() {
        let mut bus = make_bus();
        bus.write(0x4000, 0x99);
        assert_eq!(bus.read(0x4000), 0);
    }
}
