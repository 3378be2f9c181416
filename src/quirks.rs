//! Behaviour toggles reproducing the differences between historical interpreters.

/// What happens to a sprite pixel that falls past one edge of the display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeMode {
    /// The pixel is dropped.
    #[default]
    Clip,
    /// The pixel reappears on the opposite edge.
    Wrap,
}

impl From<bool> for EdgeMode {
    fn from(wrap: bool) -> Self {
        if wrap {
            EdgeMode::Wrap
        } else {
            EdgeMode::Clip
        }
    }
}

/// Instruction set the VM accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Extension {
    #[default]
    None,
    Schip,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Quirks {
    /// `Bnnn` jumps to `nnn + V0` instead of `nnn + Vx`.
    pub jump_offset_use_v0: bool,
    /// `Dxyn` behaviour past the right edge.
    pub wrap_x: EdgeMode,
    /// `Dxyn` behaviour past the bottom edge.
    pub wrap_y: EdgeMode,
    /// `8xy1`, `8xy2` and `8xy3` reset VF.
    pub bitwise_reset_vf: bool,
    /// `8xy6` and `8xyE` copy Vy into Vx before shifting.
    pub shift_set_vx_to_vy: bool,
    /// `Fx55` and `Fx65` leave I at `I + x + 1`.
    pub load_save_increment_i: bool,
    /// `Dxy0` draws an 8x16 sprite instead of a 16x16 one in low resolution.
    pub draw_8x16_sprite_in_lores: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            jump_offset_use_v0: true,
            wrap_x: EdgeMode::Clip,
            wrap_y: EdgeMode::Clip,
            bitwise_reset_vf: false,
            shift_set_vx_to_vy: true,
            load_save_increment_i: true,
            draw_8x16_sprite_in_lores: false,
        }
    }
}
