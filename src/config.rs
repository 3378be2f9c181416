use std::time::{SystemTime, UNIX_EPOCH};

use crate::display::{Color, DisplayConfig};
use crate::input::Layout;
use crate::quirks::{Extension, Quirks};
use crate::sound::Waveform;

#[derive(Clone, Debug, PartialEq)]
pub struct CpuConfig {
    pub cycles_per_sec: u32,
    /// Execute an instruction on every update instead of rate limiting.
    pub uncap_cycles_per_sec: bool,
    pub rng_seed: u64,
    /// Initial contents of the SUPER-CHIP flag registers, V0 in the low byte.
    pub rpl_flags: u64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            cycles_per_sec: 250,
            uncap_cycles_per_sec: false,
            rng_seed: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            rpl_flags: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsConfig {
    pub on_color: Color,
    pub off_color: Color,
    pub scale_factor: usize,
    pub enable_grid: bool,
    pub enable_fade: bool,
    pub fade_speed: u8,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        let display = DisplayConfig::default();
        Self {
            on_color: display.on_color,
            off_color: display.off_color,
            scale_factor: display.scale_factor,
            enable_grid: display.enable_grid,
            enable_fade: display.enable_fade,
            fade_speed: display.fade_speed,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SoundConfig {
    pub enable: bool,
    /// Decibels.
    pub level: f64,
    pub frequency: u32,
    pub waveform: Waveform,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enable: true,
            level: 3.0,
            frequency: 440,
            waveform: Waveform::Square,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputConfig {
    pub layout: Layout,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub cpu: CpuConfig,
    pub graphics: GraphicsConfig,
    pub sound: SoundConfig,
    pub input: InputConfig,
    pub quirks: Quirks,
    pub extension: Extension,
}

impl Config {
    /// Display settings derived from the graphics section and the wrap quirks.
    pub fn display(&self) -> DisplayConfig {
        DisplayConfig {
            on_color: self.graphics.on_color,
            off_color: self.graphics.off_color,
            scale_factor: self.graphics.scale_factor.max(1),
            enable_grid: self.graphics.enable_grid,
            enable_fade: self.graphics.enable_fade,
            fade_speed: self.graphics.fade_speed.max(1),
            wrap_x: self.quirks.wrap_x,
            wrap_y: self.quirks.wrap_y,
        }
    }
}
