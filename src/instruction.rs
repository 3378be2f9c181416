use std::fmt;

/// Every instruction the VM knows about, CHIP-8 first and SUPER-CHIP after.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstrKind {
    ClearScreen,
    Ret,
    Jump,
    Call,
    SkipEqual,
    SkipNotEqual,
    SkipRegsEqual,
    LoadByte,
    Add,
    LoadReg,
    Or,
    And,
    Xor,
    AddReg,
    SubReg,
    RShift,
    LoadAndSubReg,
    LShift,
    SkipRegsNotEqual,
    LoadI,
    JumpOffset,
    Random,
    DrawSprite,
    SkipPressed,
    SkipNotPressed,
    LoadDt,
    ReadKey,
    SetDt,
    SetSt,
    AddI,
    FontChar,
    Bcd,
    RegDump,
    RegLoad,

    Hires,
    Lores,
    ScrollDown,
    ScrollRight,
    ScrollLeft,
    BigFontChar,
    SaveFlags,
    LoadFlags,
    Exit,
}

impl InstrKind {
    pub const COUNT: usize = InstrKind::Exit as usize + 1;

    pub const CHIP8: [InstrKind; 34] = [
        InstrKind::ClearScreen,
        InstrKind::Ret,
        InstrKind::Jump,
        InstrKind::Call,
        InstrKind::SkipEqual,
        InstrKind::SkipNotEqual,
        InstrKind::SkipRegsEqual,
        InstrKind::LoadByte,
        InstrKind::Add,
        InstrKind::LoadReg,
        InstrKind::Or,
        InstrKind::And,
        InstrKind::Xor,
        InstrKind::AddReg,
        InstrKind::SubReg,
        InstrKind::RShift,
        InstrKind::LoadAndSubReg,
        InstrKind::LShift,
        InstrKind::SkipRegsNotEqual,
        InstrKind::LoadI,
        InstrKind::JumpOffset,
        InstrKind::Random,
        InstrKind::DrawSprite,
        InstrKind::SkipPressed,
        InstrKind::SkipNotPressed,
        InstrKind::LoadDt,
        InstrKind::ReadKey,
        InstrKind::SetDt,
        InstrKind::SetSt,
        InstrKind::AddI,
        InstrKind::FontChar,
        InstrKind::Bcd,
        InstrKind::RegDump,
        InstrKind::RegLoad,
    ];

    pub const SCHIP: [InstrKind; 9] = [
        InstrKind::Hires,
        InstrKind::Lores,
        InstrKind::ScrollDown,
        InstrKind::ScrollRight,
        InstrKind::ScrollLeft,
        InstrKind::BigFontChar,
        InstrKind::SaveFlags,
        InstrKind::LoadFlags,
        InstrKind::Exit,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Decodes an opcode into the kind of instruction it encodes, if any.
///
/// Masks are tried from the most to the least specific: the `00Ex` and `00Cn`
/// system calls, single-nibble instructions, the `8xyN` ALU family and last
/// the `ExNN`/`FxNN` family together with the fixed SUPER-CHIP opcodes.
pub fn try_decode(opcode: u16) -> Option<InstrKind> {
    match opcode & 0xFFF0 {
        0x00E0 => match opcode & 0x000F {
            0x0 => return Some(InstrKind::ClearScreen),
            0xE => return Some(InstrKind::Ret),
            _ => {}
        },
        0x00C0 => return Some(InstrKind::ScrollDown),
        _ => {}
    }

    match opcode & 0xF000 {
        0x1000 => return Some(InstrKind::Jump),
        0x2000 => return Some(InstrKind::Call),
        0x3000 => return Some(InstrKind::SkipEqual),
        0x4000 => return Some(InstrKind::SkipNotEqual),
        0x5000 => return Some(InstrKind::SkipRegsEqual),
        0x6000 => return Some(InstrKind::LoadByte),
        0x7000 => return Some(InstrKind::Add),
        0x9000 => return Some(InstrKind::SkipRegsNotEqual),
        0xA000 => return Some(InstrKind::LoadI),
        0xB000 => return Some(InstrKind::JumpOffset),
        0xC000 => return Some(InstrKind::Random),
        0xD000 => return Some(InstrKind::DrawSprite),
        _ => {}
    }

    match opcode & 0xF00F {
        0x8000 => return Some(InstrKind::LoadReg),
        0x8001 => return Some(InstrKind::Or),
        0x8002 => return Some(InstrKind::And),
        0x8003 => return Some(InstrKind::Xor),
        0x8004 => return Some(InstrKind::AddReg),
        0x8005 => return Some(InstrKind::SubReg),
        0x8006 => return Some(InstrKind::RShift),
        0x8007 => return Some(InstrKind::LoadAndSubReg),
        0x800E => return Some(InstrKind::LShift),
        _ => {}
    }

    // 00xx system calls carry no register, so they must match exactly
    match opcode {
        0x00FB => return Some(InstrKind::ScrollRight),
        0x00FC => return Some(InstrKind::ScrollLeft),
        0x00FD => return Some(InstrKind::Exit),
        0x00FE => return Some(InstrKind::Lores),
        0x00FF => return Some(InstrKind::Hires),
        _ => {}
    }

    match opcode & 0xF0FF {
        0xE09E => Some(InstrKind::SkipPressed),
        0xE0A1 => Some(InstrKind::SkipNotPressed),
        0xF007 => Some(InstrKind::LoadDt),
        0xF00A => Some(InstrKind::ReadKey),
        0xF015 => Some(InstrKind::SetDt),
        0xF018 => Some(InstrKind::SetSt),
        0xF01E => Some(InstrKind::AddI),
        0xF029 => Some(InstrKind::FontChar),
        0xF030 => Some(InstrKind::BigFontChar),
        0xF033 => Some(InstrKind::Bcd),
        0xF055 => Some(InstrKind::RegDump),
        0xF065 => Some(InstrKind::RegLoad),
        0xF075 => Some(InstrKind::SaveFlags),
        0xF085 => Some(InstrKind::LoadFlags),
        _ => None,
    }
}

/// The operand fields of an opcode. Which of them are meaningful depends on
/// the instruction.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OperandMap {
    /// `0x0X00`
    pub x: u8,
    /// `0x00Y0`
    pub y: u8,
    /// `0x0NNN`
    pub addr: u16,
    /// `0x000N`
    pub imm1: u8,
    /// `0x00NN`
    pub imm2: u8,
    /// `0x0NNN`
    pub imm3: u16,
}

impl From<u16> for OperandMap {
    fn from(opcode: u16) -> Self {
        Self {
            x: ((opcode & 0x0F00) >> 8) as u8,
            y: ((opcode & 0x00F0) >> 4) as u8,
            addr: opcode & 0x0FFF,
            imm1: (opcode & 0x000F) as u8,
            imm2: (opcode & 0x00FF) as u8,
            imm3: opcode & 0x0FFF,
        }
    }
}

impl fmt::Debug for OperandMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x: {:X} y: {:X} nnn: {:03X} nn: {:02X} n: {:X}",
            self.x, self.y, self.addr, self.imm2, self.imm1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands() {
        let ops = OperandMap::from(0xD12F);
        assert_eq!(ops.x, 0x1);
        assert_eq!(ops.y, 0x2);
        assert_eq!(ops.imm1, 0xF);
        assert_eq!(ops.imm2, 0x2F);
        assert_eq!(ops.addr, 0x12F);
        assert_eq!(ops.imm3, ops.addr);
    }

    #[test]
    fn system_calls() {
        assert_eq!(try_decode(0x00E0), Some(InstrKind::ClearScreen));
        assert_eq!(try_decode(0x00EE), Some(InstrKind::Ret));
        assert_eq!(try_decode(0x00E5), None);
        assert_eq!(try_decode(0x00C7), Some(InstrKind::ScrollDown));
        assert_eq!(try_decode(0x00FF), Some(InstrKind::Hires));
        assert_eq!(try_decode(0x0AFF), None);
        assert_eq!(try_decode(0x0000), None);
    }

    #[test]
    fn alu_family() {
        assert_eq!(try_decode(0x8AB4), Some(InstrKind::AddReg));
        assert_eq!(try_decode(0x8AB7), Some(InstrKind::LoadAndSubReg));
        assert_eq!(try_decode(0x8ABE), Some(InstrKind::LShift));
        assert_eq!(try_decode(0x8AB8), None);
    }

    #[test]
    fn key_timer_memory_family() {
        assert_eq!(try_decode(0xE39E), Some(InstrKind::SkipPressed));
        assert_eq!(try_decode(0xF40A), Some(InstrKind::ReadKey));
        assert_eq!(try_decode(0xF730), Some(InstrKind::BigFontChar));
        assert_eq!(try_decode(0xF885), Some(InstrKind::LoadFlags));
        assert_eq!(try_decode(0xFFFF), None);
        assert_eq!(try_decode(0xE000), None);
    }

    #[test]
    fn decode_is_total() {
        // every kind is reachable and no opcode panics
        let mut seen = [false; InstrKind::COUNT];
        for opcode in 0..=u16::MAX {
            if let Some(kind) = try_decode(opcode) {
                seen[kind.index()] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn kind_tables_cover_every_kind() {
        assert_eq!(InstrKind::CHIP8.len() + InstrKind::SCHIP.len(), InstrKind::COUNT);
    }
}
