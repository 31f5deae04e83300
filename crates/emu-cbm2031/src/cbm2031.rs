//! The CBM 2031 machine: CPU, memory bus, and cable wiring.

use std::sync::{Arc, Mutex};

use emu_core::{Cpu, StepError, Tickable};

use crate::bus::DriveBus;
use crate::config::Cbm2031Config;
use crate::connector::DriveConnector;
use crate::host::HostConnector;

/// A CBM 2031 drive wired to the host end of an IEEE-488 cable.
///
/// The host connector is shared with the bus controller running on its
/// own thread; each machine step locks it briefly to propagate the
/// cable.
pub struct Cbm2031<C> {
    cpu: C,
    /// Drive memory bus (RAM, ROM halves, both VIAs).
    pub bus: DriveBus,
    host: Arc<Mutex<HostConnector>>,
}

impl<C: Cpu> Cbm2031<C> {
    /// Build the drive and reset the CPU through the ROM vector.
    pub fn new(mut cpu: C, config: Cbm2031Config, host: Arc<Mutex<HostConnector>>) -> Self {
        let mut bus = DriveBus::new(config.low_rom, config.high_rom);
        cpu.reset(&mut bus);
        Self { cpu, bus, host }
    }

    /// One machine step: CPU instruction, VIA clocks, cable
    /// propagation, then interrupt sampling, in that order.
    pub fn step(&mut self) -> Result<(), StepError> {
        self.cpu.step(&mut self.bus)?;
        self.bus.via1.tick();
        self.bus.via2.tick();
        self.sync_cable();
        if self.bus.irq_active() {
            self.cpu.interrupt();
        }
        Ok(())
    }

    /// Propagate the cable between the drive connector over VIA1 and
    /// the shared host connector.
    fn sync_cable(&mut self) {
        let mut drive_end = DriveConnector::new(&mut self.bus.via1);
        let mut host = self.host.lock().unwrap();
        bus_ieee488::sync(&mut drive_end, &mut *host);
    }

    /// Borrow the CPU for inspection.
    pub fn cpu(&self) -> &C {
        &self.cpu
    }
}
