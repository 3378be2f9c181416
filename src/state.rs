use std::ops::{Deref, DerefMut};

use crate::font;

pub const MEM_SIZE: usize = 4096;
pub const PROG_OFFSET: u16 = 0x200;
/// Program counter values wrap within the 12-bit address space.
pub const PC_MASK: u16 = 0x0FFF;
pub const PROG_MAX_SIZE: usize = MEM_SIZE - PROG_OFFSET as usize;
pub const STACK_MAX_SIZE: usize = 12;
pub const REGISTER_COUNT: usize = 16;
pub const KEY_COUNT: usize = 16;
pub const FLAG_COUNT: usize = 8;

/// Generates fixed-size byte arrays that deref to their contents.
macro_rules! wrapper {
    ($($(#[$meta:meta])* $name:ident => $size:expr),*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct $name([u8; $size]);

            impl Default for $name {
                fn default() -> Self {
                    Self([0; $size])
                }
            }

            impl Deref for $name {
                type Target = [u8; $size];

                fn deref(&self) -> &Self::Target {
                    &self.0
                }
            }

            impl DerefMut for $name {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.0
                }
            }
        )*
    };
}

wrapper! {
    /// The 4 KiB address space.
    Memory => MEM_SIZE,
    /// V0..=VF.
    RegisterArray => REGISTER_COUNT,
    /// SUPER-CHIP persistent flag registers.
    RplFlags => FLAG_COUNT
}

impl Memory {
    /// Reads a byte; addresses wrap around the 12-bit address space.
    pub fn read(&self, addr: u16) -> u8 {
        self[addr as usize % MEM_SIZE]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self[addr as usize % MEM_SIZE] = value;
    }

    /// Reads a big-endian word, independent of the host byte order.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }
}

impl RplFlags {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits.to_le_bytes())
    }

    pub fn bits(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }
}

/// Mutable machine state: registers, memory, stack, timers and keys.
#[derive(Debug, Clone)]
pub struct VmState {
    /// Address of the next instruction to fetch.
    pub pc: u16,
    pub i: u16,
    pub dt: u8,
    pub st: u8,
    pub regs: RegisterArray,
    pub stack: Vec<u16>,
    pub memory: Memory,
    pub rom_size: usize,
    pub input_table: [bool; KEY_COUNT],
}

impl Default for VmState {
    fn default() -> Self {
        Self::new()
    }
}

impl VmState {
    pub fn new() -> Self {
        let mut memory = Memory::default();
        memory[font::MEMORY_RANGE].copy_from_slice(font::FONT);
        memory[font::BIG_MEMORY_RANGE].copy_from_slice(font::BIG_FONT);

        let mut state = Self {
            pc: PROG_OFFSET,
            i: 0,
            dt: 0,
            st: 0,
            regs: RegisterArray::default(),
            stack: Vec::with_capacity(STACK_MAX_SIZE),
            memory,
            rom_size: 0,
            input_table: [false; KEY_COUNT],
        };
        state.reset();
        state
    }

    /// Restores power-on register values. Memory is left alone.
    pub fn reset(&mut self) {
        self.pc = PROG_OFFSET;
        self.dt = u8::MAX;
        self.st = 0;
        self.i = 0;
        self.regs = RegisterArray::default();
        self.stack.clear();
        self.input_table = [false; KEY_COUNT];
    }

    pub fn update_timers(&mut self) {
        self.dt = self.dt.saturating_sub(1);
        self.st = self.st.saturating_sub(1);
    }

    /// The program bytes currently loaded.
    pub fn program(&self) -> &[u8] {
        let start = PROG_OFFSET as usize;
        &self.memory[start..start + self.rom_size]
    }

    pub fn vf(&mut self) -> &mut u8 {
        &mut self.regs[0xF]
    }
}
