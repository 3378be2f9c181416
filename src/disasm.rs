//! Textual rendering of single opcodes for debugger views.

use crate::instruction::{try_decode, InstrKind, OperandMap};
use crate::quirks::Quirks;

fn reg(n: u8) -> String {
    format!("V{n:X}")
}

fn byte(n: u8) -> String {
    format!("{n:#04x}")
}

fn addr(n: u16) -> String {
    format!("{n:#06x}")
}

/// Renders `opcode` as a mnemonic with its operands, e.g. `add V3, 0x0a`.
/// Returns `None` for opcodes that do not decode.
pub fn disassemble(opcode: u16, quirks: &Quirks) -> Option<String> {
    let kind = try_decode(opcode)?;
    let ops = OperandMap::from(opcode);
    let (x, y) = (reg(ops.x), reg(ops.y));

    let text = match kind {
        InstrKind::ClearScreen => "clear_screen".to_string(),
        InstrKind::Ret => "ret".to_string(),
        InstrKind::Jump => format!("jump {}", addr(ops.addr)),
        InstrKind::Call => format!("call {}", addr(ops.addr)),
        InstrKind::SkipEqual => format!("skip_equal {x}, {}", byte(ops.imm2)),
        InstrKind::SkipNotEqual => format!("skip_not_equal {x}, {}", byte(ops.imm2)),
        InstrKind::SkipRegsEqual => format!("skip_equal {x}, {y}"),
        InstrKind::LoadByte => format!("load {x}, {}", byte(ops.imm2)),
        InstrKind::Add => format!("add {x}, {}", byte(ops.imm2)),
        InstrKind::LoadReg => format!("load {x}, {y}"),
        InstrKind::Or => format!("or {x}, {y}"),
        InstrKind::And => format!("and {x}, {y}"),
        InstrKind::Xor => format!("xor {x}, {y}"),
        InstrKind::AddReg => format!("add {x}, {y}"),
        InstrKind::SubReg => format!("sub {x}, {y}"),
        InstrKind::RShift => format!("rshift {x}"),
        InstrKind::LoadAndSubReg => format!("ldsub {x}, {y}"),
        InstrKind::LShift => format!("lshift {x}"),
        InstrKind::SkipRegsNotEqual => format!("skip_not_equal {x}, {y}"),
        InstrKind::LoadI => format!("load I, {}", addr(ops.imm3)),
        InstrKind::JumpOffset => {
            let offset = if quirks.jump_offset_use_v0 { reg(0) } else { x };
            format!("jump {} + {offset}", addr(ops.addr))
        }
        InstrKind::Random => format!("random {x}, {}", byte(ops.imm2)),
        InstrKind::DrawSprite => format!("draw_sprite {x}, {y}, {}", byte(ops.imm1)),
        InstrKind::SkipPressed => format!("skip_pressed {x}"),
        InstrKind::SkipNotPressed => format!("skip_not_pressed {x}"),
        InstrKind::LoadDt => format!("load_dt {x}"),
        InstrKind::ReadKey => format!("wait_keypress {x}"),
        InstrKind::SetDt => format!("load DT, {x}"),
        InstrKind::SetSt => format!("load ST, {x}"),
        InstrKind::AddI => format!("add I, {x}"),
        InstrKind::FontChar => format!("load I, font[{x}]"),
        InstrKind::Bcd => format!("bcd {x}"),
        InstrKind::RegDump => format!("reg_dump {x}"),
        InstrKind::RegLoad => format!("reg_load {x}"),
        InstrKind::Hires => "hires".to_string(),
        InstrKind::Lores => "lores".to_string(),
        InstrKind::ScrollDown => format!("scroll_down {}", byte(ops.imm1)),
        InstrKind::ScrollRight => "scroll_right".to_string(),
        InstrKind::ScrollLeft => "scroll_left".to_string(),
        InstrKind::BigFontChar => format!("load I, big_font[{x}]"),
        InstrKind::SaveFlags => format!("save_flags {x}"),
        InstrKind::LoadFlags => format!("load_flags {x}"),
        InstrKind::Exit => "exit".to_string(),
    };

    Some(text)
}

/// Disassembles a whole program, one line per 16-bit word starting at `origin`.
pub fn listing(program: &[u8], origin: u16, quirks: &Quirks) -> Vec<String> {
    program
        .chunks(2)
        .enumerate()
        .map(|(n, chunk)| {
            let offset = origin.wrapping_add(2 * n as u16);
            let opcode = u16::from_be_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]);
            match disassemble(opcode, quirks) {
                Some(text) => format!("{offset:#06x}: {opcode:04x}  {text}"),
                None => format!("{offset:#06x}: {opcode:04x}  .word {opcode:#06x}"),
            }
        })
        .collect()
}
