//! Host end of the cable and the reference bus controller.
//!
//! The host connector is a passive latch pair: what the monitor wants
//! driven onto the bus, and what the last cable propagation delivered.
//! DIO is inverted on both sides so the controller deals in natural
//! bytes while the wire carries the bus's inverted data convention.
//!
//! The controller implements the command and data-transfer handshakes
//! as bounded polling against the incoming latch; the drive loop keeps
//! the latch fresh by propagating the cable every machine step.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bus_ieee488::{Connector, Ieee488, Signal};

/// Command byte marking a primary address to talk.
pub const TALK: u8 = 0x40;
/// Command byte marking a secondary address.
pub const SECOND: u8 = 0x60;
/// Command releasing the current talker.
pub const UNTALK: u8 = 0x5F;

/// Byte that terminates an input transfer; substituted on EOI.
const TERMINATOR: u8 = 0x13;
/// Input transfers stop after this many bytes without a terminator.
const MAX_INPUT: usize = 80;

/// Poll budget for each handshake wait: retries x interval ~ 500 ms.
const RETRY_LIMIT: u32 = 500;
const RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Host-side cable connector.
pub struct HostConnector {
    /// What this end drives onto the bus.
    pub outward: Ieee488,
    /// What the last propagation delivered.
    pub inward: Ieee488,
}

impl HostConnector {
    /// A connector with all outgoing lines undriven.
    #[must_use]
    pub fn new() -> Self {
        let mut outward = Ieee488::floating();
        // A natural byte of all ones is the released state once
        // inverted onto the wire
        outward.dio = 0xFF;
        Self {
            outward,
            inward: Ieee488::new(),
        }
    }

    /// Float all outgoing signal lines, leaving the data byte alone.
    pub fn reset(&mut self) {
        let dio = self.outward.dio;
        self.outward = Ieee488::floating();
        self.outward.dio = dio;
    }

    /// Print both latches.
    pub fn dump(&self) {
        println!("IN");
        println!(
            "ATN: {}, NRFD: {}, NDAC: {}, EOI: {}, DAV: {}",
            self.inward.atn, self.inward.nrfd, self.inward.ndac, self.inward.eoi, self.inward.dav
        );
        println!(
            "DATA: 0x{:02x} (inverted from 0x{:02x})",
            self.inward.dio, !self.inward.dio
        );
        println!();
        println!("OUT");
        println!(
            "ATN: {}, NRFD: {}, NDAC: {}, EOI: {}, DAV: {}",
            self.outward.atn, self.outward.nrfd, self.outward.ndac, self.outward.eoi,
            self.outward.dav
        );
        println!(
            "DATA: 0x{:02x} (inverted to 0x{:02x})",
            self.outward.dio, !self.outward.dio
        );
    }
}

impl Default for HostConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for HostConnector {
    fn read(&mut self) -> Ieee488 {
        let mut state = self.outward;
        // Natural byte out, inverted convention on the wire
        state.dio = !state.dio;
        state
    }

    fn write(&mut self, mut state: Ieee488) {
        // Invert the wire data back into a natural byte
        state.dio = !state.dio;
        self.inward = state;
    }
}

/// Reference bus controller: drives command and read handshakes from
/// the host connector, sharing it with the drive loop.
pub struct BusController {
    host: Arc<Mutex<HostConnector>>,
}

impl BusController {
    #[must_use]
    pub fn new(host: Arc<Mutex<HostConnector>>) -> Self {
        Self { host }
    }

    fn with_host<R>(&self, f: impl FnOnce(&mut HostConnector) -> R) -> R {
        f(&mut self.host.lock().unwrap())
    }

    /// Poll the incoming latch until `ready` holds, within the retry
    /// budget. A timeout reports the step and the observed lines.
    fn wait_for(
        &self,
        what: &str,
        ready: impl Fn(&HostConnector) -> bool,
    ) -> Result<(), String> {
        for _ in 0..RETRY_LIMIT {
            if self.with_host(|h| ready(h)) {
                return Ok(());
            }
            thread::sleep(RETRY_INTERVAL);
        }
        Err(self.with_host(|h| {
            format!(
                "remote did not {what} (NDAC={}, NRFD={}, DAV={})",
                h.inward.ndac, h.inward.nrfd, h.inward.dav
            )
        }))
    }

    fn report(&self, what: &str) {
        self.with_host(|h| {
            println!(
                "remote {what} (NDAC={}, NRFD={})",
                h.inward.ndac, h.inward.nrfd
            );
        });
    }

    /// Address the drive under attention: send a primary command byte
    /// and optionally a secondary, then release the bus.
    ///
    /// Attention is released on every exit path, including timeouts.
    pub fn cmd(&self, primary: u8, secondary: Option<u8>) -> Result<(), String> {
        let result = self.cmd_inner(primary, secondary);
        self.with_host(|h| h.outward.atn = Signal::Negated);
        result
    }

    fn cmd_inner(&self, primary: u8, secondary: Option<u8>) -> Result<(), String> {
        self.with_host(|h| {
            h.reset();
            h.outward.atn = Signal::Asserted;
        });

        // The drive pulls both NDAC and NRFD when acknowledging ATN;
        // only NDAC is significant
        self.wait_for("acknowledge attention", |h| {
            h.inward.ndac == Signal::Asserted
        })?;
        self.report("acknowledged attention");

        self.send_command_byte(primary)?;
        if let Some(secondary) = secondary {
            self.send_command_byte(secondary)?;
        }

        // Command sequence finished: drop attention and hold the
        // handshake lines as an idle listener
        self.with_host(|h| {
            h.outward.atn = Signal::Negated;
            h.outward.nrfd = Signal::Asserted;
            h.outward.ndac = Signal::Asserted;
        });
        Ok(())
    }

    /// One byte of the command handshake: present it on DIO, validate,
    /// and wait for the remote to pace through busy/accepted/idle.
    fn send_command_byte(&self, value: u8) -> Result<(), String> {
        self.with_host(|h| h.outward.dio = value);
        println!("DIO set to 0x{value:02x}");

        self.wait_for("become ready", |h| {
            h.inward.ndac == Signal::Asserted && h.inward.nrfd == Signal::Negated
        })?;
        self.report("became ready");

        self.with_host(|h| h.outward.dav = Signal::Asserted);

        self.wait_for("become busy", |h| h.inward.nrfd == Signal::Asserted)?;
        self.report("became busy");

        self.wait_for("accept the byte", |h| h.inward.ndac == Signal::Negated)?;
        self.report("accepted the byte");

        self.with_host(|h| {
            h.outward.dav = Signal::Negated;
            // Release the data lines (all ones inverts to nothing
            // driven on the wire)
            h.outward.dio = 0xFF;
        });

        self.wait_for("become idle", |h| h.inward.ndac == Signal::Asserted)?;
        self.report("became idle");
        Ok(())
    }

    /// Read one byte with the DAV/NRFD/NDAC acceptor handshake.
    ///
    /// NRFD is re-asserted on every exit path: the host is not ready
    /// for another byte until asked again.
    pub fn read_byte(&self) -> Result<u8, String> {
        let result = self.read_byte_inner();
        self.with_host(|h| h.outward.nrfd = Signal::Asserted);
        result
    }

    fn read_byte_inner(&self) -> Result<u8, String> {
        self.with_host(|h| {
            h.outward.dav = Signal::Floating;
            h.outward.nrfd = Signal::Negated; // Ready for data
            h.outward.ndac = Signal::Asserted; // Previous byte held
        });

        self.wait_for("present valid data", |h| h.inward.dav == Signal::Asserted)?;

        // Busy while the byte is latched
        self.with_host(|h| h.outward.nrfd = Signal::Asserted);
        thread::sleep(RETRY_INTERVAL);

        let (mut data, eoi) =
            self.with_host(|h| (h.inward.dio, h.inward.eoi == Signal::Asserted));
        if eoi {
            println!("EOI asserted");
            data = TERMINATOR;
        }

        // Byte accepted
        self.with_host(|h| h.outward.ndac = Signal::Negated);

        self.wait_for("withdraw data valid", |h| h.inward.dav == Signal::Negated)?;

        self.with_host(|h| {
            h.outward.ndac = Signal::Asserted;
            h.outward.nrfd = Signal::Asserted;
        });
        Ok(data)
    }

    /// Read bytes until the terminator or the transfer cap.
    pub fn input(&self) -> Result<Vec<u8>, String> {
        let mut data = Vec::new();
        while data.len() < MAX_INPUT {
            let byte = self
                .read_byte()
                .map_err(|e| format!("failed to read from bus: {e}"))?;
            data.push(byte);
            if byte == TERMINATOR {
                break;
            }
        }
        println!("read {} characters", data.len());
        Ok(data)
    }

    /// Release the current talker.
    pub fn untalk(&self) -> Result<(), String> {
        self.cmd(UNTALK, None)
    }
}
