//! Interactive monitor: a line-oriented REPL on stdin that plays bus
//! controller and pokes at the drive's state.
//!
//! Commands:
//!   exit                      stop the emulator
//!   dump                      print the host connector latches
//!   via <reg>                 print a VIA1 register (peek, no side effects)
//!   peek <addr>               print one RAM byte (hex address)
//!   poke <addr> <byte>        write one RAM byte
//!   open <pri> [<sec>]        address the drive to talk
//!   input <pri> [<sec>]       talk, read until terminator, untalk

use std::io::{self, Write};
use std::process;
use std::sync::{Arc, Mutex};

use emu_core::Cpu;
use mos_via_6522::{ACR, IER, IFR, PCR, PORT_A, PORT_A_DIR, PORT_B, PORT_B_DIR, T1_COUNTER_HI,
    T1_COUNTER_LO};

use crate::bus::RAM_SIZE;
use crate::cbm2031::Cbm2031;
use crate::host::{BusController, HostConnector, SECOND, TALK};

/// Monitor REPL bound to a running drive.
pub struct Monitor<C> {
    system: Arc<Mutex<Cbm2031<C>>>,
    host: Arc<Mutex<HostConnector>>,
    controller: BusController,
}

impl<C: Cpu> Monitor<C> {
    #[must_use]
    pub fn new(system: Arc<Mutex<Cbm2031<C>>>, host: Arc<Mutex<HostConnector>>) -> Self {
        let controller = BusController::new(Arc::clone(&host));
        Self {
            system,
            host,
            controller,
        }
    }

    /// Read and dispatch commands until stdin closes or `exit`.
    pub fn run(&self) {
        let mut line = String::new();
        loop {
            print!("> ");
            let _ = io::stdout().flush();

            line.clear();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => return, // EOF
                Ok(_) => {}
            }

            let args: Vec<&str> = line.split_whitespace().collect();
            let Some(&command) = args.first() else {
                continue;
            };

            match command {
                "exit" => process::exit(0),
                "dump" => self.host.lock().unwrap().dump(),
                "via" => self.cmd_via(&args[1..]),
                "peek" => self.cmd_peek(&args[1..]),
                "poke" => self.cmd_poke(&args[1..]),
                "open" => {
                    if let Err(e) = self.cmd_open(&args[1..]) {
                        println!("{e}");
                    }
                }
                "input" => self.cmd_input(&args[1..]),
                _ => println!("?"),
            }
        }
    }

    fn cmd_via(&self, args: &[&str]) {
        let Some(&reg) = args.first() else {
            println!("via reg");
            return;
        };
        let system = self.system.lock().unwrap();
        let via = &system.bus.via1;
        match reg {
            "a" => println!("Port A: ${:02x}", via.peek(PORT_A)),
            "adir" => println!("Port A Dir: ${:02x}", via.peek(PORT_A_DIR)),
            "b" => println!("Port B: ${:02x}", via.peek(PORT_B)),
            "bdir" => println!("Port B Dir: ${:02x}", via.peek(PORT_B_DIR)),
            "t1lo" | "t1low" => println!("Timer 1 Low: ${:02x}", via.peek(T1_COUNTER_LO)),
            "t1hi" | "t1high" => println!("Timer 1 High: ${:02x}", via.peek(T1_COUNTER_HI)),
            "ifr" => println!("IFR: ${:02x}", via.peek(IFR)),
            "ie" => println!("IE: ${:02x}", via.peek(IER)),
            "acr" => println!("ACR: ${:02x}", via.peek(ACR)),
            "pcr" => println!("PCR: ${:02x}", via.peek(PCR)),
            "irq" => println!("IRQ: {}", via.irq_active()),
            _ => println!("?"),
        }
    }

    fn cmd_peek(&self, args: &[&str]) {
        let [addr] = args else {
            println!("peek addr");
            return;
        };
        let addr = match parse_ram_addr(addr) {
            Ok(a) => a,
            Err(e) => {
                println!("invalid addr: {e}");
                return;
            }
        };
        let system = self.system.lock().unwrap();
        let data = system.bus.ram()[addr];
        println!("${addr:04x}: ${data:02x}");
    }

    fn cmd_poke(&self, args: &[&str]) {
        let [addr, data] = args else {
            println!("poke addr data");
            return;
        };
        let addr = match parse_ram_addr(addr) {
            Ok(a) => a,
            Err(e) => {
                println!("invalid addr: {e}");
                return;
            }
        };
        let data = match u8::from_str_radix(data, 16) {
            Ok(d) => d,
            Err(e) => {
                println!("invalid data: {e}");
                return;
            }
        };
        let mut system = self.system.lock().unwrap();
        system.bus.ram_mut()[addr] = data;
        println!("${addr:04x}: ${data:02x}");
    }

    fn cmd_open(&self, args: &[&str]) -> Result<(), String> {
        if args.is_empty() {
            return Err("usage: open primary_addr [secondary_addr]".into());
        }
        let primary = u8::from_str_radix(args[0], 16)
            .map_err(|e| format!("invalid primary_addr: {e}"))?;
        let secondary = match args.get(1) {
            Some(s) => Some(
                u8::from_str_radix(s, 16)
                    .map_err(|e| format!("invalid secondary_addr: {e}"))?
                    | SECOND,
            ),
            None => None,
        };
        self.controller.cmd(primary | TALK, secondary)
    }

    fn cmd_input(&self, args: &[&str]) {
        if let Err(e) = self.cmd_open(args) {
            println!("{e}");
        }
        let data = match self.controller.input() {
            Ok(data) => data,
            Err(e) => {
                println!("{e}");
                Vec::new()
            }
        };
        if let Err(e) = self.controller.untalk() {
            println!("{e}");
        }
        if data.is_empty() {
            return;
        }

        for byte in &data {
            print!("0x{byte:02x} ");
        }
        println!();
        for &byte in &data {
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            };
            print!("{ch}");
        }
        println!();
    }
}

/// Parse a hex address and bounds-check it against the drive RAM.
fn parse_ram_addr(s: &str) -> Result<usize, String> {
    let addr = u16::from_str_radix(s, 16).map_err(|e| e.to_string())?;
    let addr = usize::from(addr);
    if addr >= RAM_SIZE {
        return Err(format!("${addr:04x} is outside RAM"));
    }
    Ok(addr)
}
