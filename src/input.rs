use clap::ValueEnum;
use std::collections::HashMap;
use winit::event::VirtualKeyCode;

/// Generates a keymap from a mapping of host keys to CHIP-8 key indices,
/// represented as a [`HashMap`](std::collections::HashMap).
macro_rules! keymap {
    ($($(#[$meta:meta])* $name:ident { $($keycode:ident => $mapping:literal),* })*) => {
        lazy_static::lazy_static! {
            $(
                $(#[$meta])*
                pub static ref $name: HashMap<VirtualKeyCode, u8> = {
                    let mut m = HashMap::new();
                    $(
                      m.insert(VirtualKeyCode::$keycode, $mapping);
                    )*
                    m
                };
            )*
        }
    };
}

keymap! {
    /// The COSMAC VIP hex keypad, key for key.
    ORIGINAL_LAYOUT {
        Key1 => 0x1, Key2 => 0x2, Key3 => 0x3, C => 0xC,
        Key4 => 0x4, Key5 => 0x5, Key6 => 0x6, D => 0xD,
        Key7 => 0x7, Key8 => 0x8, Key9 => 0x9, E => 0xE,
        A => 0xA, Key0 => 0x0, B => 0xB, F => 0xF
    }

    /// The keypad laid over the left hand side of a QWERTY keyboard.
    MODERN_LAYOUT {
        Key1 => 0x1, Key2 => 0x2, Key3 => 0x3, Key4 => 0xC,
        Q => 0x4, W => 0x5, E => 0x6, R => 0xD,
        A => 0x7, S => 0x8, D => 0x9, F => 0xE,
        Z => 0xA, X => 0x0, C => 0xB, V => 0xF
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Layout {
    Original,
    #[default]
    Modern,
}

impl Layout {
    pub fn keymap(self) -> &'static HashMap<VirtualKeyCode, u8> {
        match self {
            Layout::Original => &ORIGINAL_LAYOUT,
            Layout::Modern => &MODERN_LAYOUT,
        }
    }

    /// The CHIP-8 key a host key stands for, if any.
    pub fn key_index(self, key: VirtualKeyCode) -> Option<u8> {
        self.keymap().get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_cover_all_keys() {
        for layout in [Layout::Original, Layout::Modern] {
            let mut keys: Vec<u8> = layout.keymap().values().copied().collect();
            keys.sort_unstable();
            assert_eq!(keys, (0..16).collect::<Vec<u8>>());
        }
    }

    #[test]
    fn modern_layout() {
        assert_eq!(Layout::Modern.key_index(VirtualKeyCode::V), Some(0xF));
        assert_eq!(Layout::Modern.key_index(VirtualKeyCode::X), Some(0x0));
        assert_eq!(Layout::Modern.key_index(VirtualKeyCode::Key5), None);
    }

    #[test]
    fn original_layout() {
        assert_eq!(Layout::Original.key_index(VirtualKeyCode::Key0), Some(0x0));
        assert_eq!(Layout::Original.key_index(VirtualKeyCode::C), Some(0xC));
        assert_eq!(Layout::Original.key_index(VirtualKeyCode::Q), None);
    }
}
