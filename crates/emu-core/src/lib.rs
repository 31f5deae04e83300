//! Core traits and types shared by the emulator crates.
//!
//! A machine is a CPU stepping against a memory bus, with peripherals
//! advanced by clock ticks. These traits are the seams between those
//! pieces; the concrete chips live in their own crates.

mod bus;
mod cpu;
mod tickable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use cpu::{Cpu, StepError};
pub use tickable::Tickable;
pub use ticks::Ticks;
