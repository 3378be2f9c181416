//! A CHIP-8 and SUPER-CHIP virtual machine.

pub mod breakpoint;
pub mod cli;
pub mod config;
pub mod disasm;
pub mod display;
pub mod error;
pub mod font;
pub mod frontend;
pub mod input;
pub mod instr_set;
pub mod instruction;
pub mod quirks;
pub mod sound;
pub mod state;
pub mod vm;

pub use config::Config;
pub use error::{Result, VmError};
pub use vm::{Mode, Vm};
