//! CBM 2031 emulator binary.
//!
//! Runs the drive loop on a background thread and the monitor REPL on
//! the main thread, connected through the shared IEEE-488 cable.

use std::process;
use std::sync::{Arc, Mutex};
use std::thread;

use emu_cbm2031::{load_rom, Cbm2031, Cbm2031Config, HostConnector, Monitor};
use mos_6502::Mos6502;

/// DOS ROM image mapped at $C000.
const LOW_ROM_PATH: &str = "roms/901484-03.bin";
/// DOS ROM image mapped at $E000.
const HIGH_ROM_PATH: &str = "roms/901484-05.bin";

fn parse_args() -> bool {
    let args: Vec<String> = std::env::args().collect();
    let mut debug = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" => {
                debug = true;
            }
            "--help" | "-h" => {
                eprintln!("Usage: emu-cbm2031 [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  -d    Enable CPU disassembly on stderr");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    debug
}

fn main() {
    let debug = parse_args();

    let low_rom = load_rom(LOW_ROM_PATH).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let high_rom = load_rom(HIGH_ROM_PATH).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let mut cpu = Mos6502::new();
    cpu.trace = debug;

    let host = Arc::new(Mutex::new(HostConnector::new()));
    let machine = Cbm2031::new(cpu, Cbm2031Config { low_rom, high_rom }, Arc::clone(&host));
    let system = Arc::new(Mutex::new(machine));

    let drive = Arc::clone(&system);
    thread::spawn(move || run_drive(&drive));

    Monitor::new(system, host).run();
}

/// The drive loop: step the machine forever, releasing the lock between
/// steps so the monitor can interleave.
fn run_drive(system: &Arc<Mutex<Cbm2031<Mos6502>>>) {
    loop {
        let mut machine = system.lock().unwrap();
        if let Err(e) = machine.step() {
            println!();
            println!("execution stopped: {e}");
            dump(&machine);
            process::exit(1);
        }
    }
}

/// Fatal-error dump: CPU registers and the zero page.
fn dump(machine: &Cbm2031<Mos6502>) {
    println!("{}", machine.cpu().regs);

    let ram = machine.bus.ram();
    for n in (0..256).step_by(4) {
        println!(
            "0x{:04x}: 0x{:02x},\t0x{:04x}: 0x{:02x},\t0x{:04x}: 0x{:02x},\t0x{:04x}: 0x{:02x}",
            n,
            ram[n],
            n + 1,
            ram[n + 1],
            n + 2,
            ram[n + 2],
            n + 3,
            ram[n + 3]
        );
    }
}
