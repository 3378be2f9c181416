use thiserror::Error;

use crate::state::{PROG_MAX_SIZE, STACK_MAX_SIZE};

/// Errors raised while loading or executing a program.
#[derive(Error, Debug)]
pub enum VmError {
    #[error("invalid opcode {opcode:#06x} at {offset:#06x}")]
    InvalidOpcode { opcode: u16, offset: u16 },

    #[error("the maximum number of values in the stack ({}) has been exceeded", STACK_MAX_SIZE)]
    StackOverflow,

    #[error("cannot return from a subroutine: the stack is empty")]
    StackUnderflow,

    #[error("flag register V{0:X} does not exist (only V0..=V7 can be saved)")]
    FlagIndex(u8),

    #[error("size of program must be <= {} bytes, got {size}", PROG_MAX_SIZE)]
    RomTooLarge { size: usize },

    #[error("cannot read program: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VmError>;
