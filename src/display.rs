//! Framebuffer with per-line dirty tracking, sprite compositing, scrolling
//! and a fade-out effect for cleared pixels.

use log::trace;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use crate::quirks::EdgeMode;

pub const LORES_SIZE: (usize, usize) = (64, 32);
pub const HIRES_SIZE: (usize, usize) = (128, 64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0x00, 0x00, 0x00, 0xFF);
    pub const WHITE: Color = Color::rgba(0xFF, 0xFF, 0xFF, 0xFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `RRGGBB` or `RRGGBBAA`, with or without a leading `#`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let value = u32::from_str_radix(s, 16).ok()?;
        match s.len() {
            6 => Some(Self::from_u32((value << 8) | 0xFF)),
            8 => Some(Self::from_u32(value)),
            _ => None,
        }
    }

    /// Unpacks `0xRRGGBBAA`.
    pub const fn from_u32(color: u32) -> Self {
        let [r, g, b, a] = color.to_be_bytes();
        Self { r, g, b, a }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// The same colour with every channel but alpha inverted.
    pub const fn inverted(self) -> Self {
        Self::rgba(!self.r, !self.g, !self.b, self.a)
    }

    /// Whether the colour channels match, ignoring alpha.
    pub const fn same_rgb(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Moves the colour channels at most `step` towards `target`. Alpha is kept.
    pub fn approach(self, target: Color, step: u8) -> Self {
        fn channel(from: u8, to: u8, step: u8) -> u8 {
            if from > to {
                from.saturating_sub(step).max(to)
            } else {
                from.saturating_add(step).min(to)
            }
        }

        Self {
            r: channel(self.r, target.r, step),
            g: channel(self.g, target.g, step),
            b: channel(self.b, target.b, step),
            a: self.a,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Resolution {
    #[default]
    Low,
    High,
}

impl Resolution {
    pub const fn size(self) -> (usize, usize) {
        match self {
            Resolution::Low => LORES_SIZE,
            Resolution::High => HIRES_SIZE,
        }
    }

    /// Edge of one pixel in high-resolution units.
    pub const fn pixel_size(self) -> usize {
        match self {
            Resolution::Low => 2,
            Resolution::High => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Right,
    Left,
}

/// A sprite as read from memory, ready to be XORed onto the display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    pub pos: Point,
    /// One entry per row, most significant bit is the leftmost pixel.
    pub rows: Vec<u16>,
    /// 8 or 16.
    pub width: usize,
}

impl Sprite {
    pub fn new(pos: Point, rows: Vec<u16>, width: usize) -> Self {
        debug_assert!(width == 8 || width == 16);
        Self { pos, rows, width }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayConfig {
    pub on_color: Color,
    pub off_color: Color,
    pub scale_factor: usize,
    pub enable_grid: bool,
    pub enable_fade: bool,
    /// How far each colour channel moves per animation tick.
    pub fade_speed: u8,
    pub wrap_x: EdgeMode,
    pub wrap_y: EdgeMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            on_color: Color::WHITE,
            off_color: Color::BLACK,
            scale_factor: 5,
            enable_grid: false,
            enable_fade: false,
            fade_speed: 16,
            wrap_x: EdgeMode::Clip,
            wrap_y: EdgeMode::Clip,
        }
    }
}

/// Columns of a line changed since the last time the renderer looked at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Region {
    begin: usize,
    end: usize,
}

impl Region {
    fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    fn expand(&mut self, range: Range<usize>) {
        if self.is_empty() {
            self.begin = range.start;
            self.end = range.end;
        } else {
            self.begin = self.begin.min(range.start);
            self.end = self.end.max(range.end);
        }
    }
}

/// One scanline; column `n` is bit `n`.
#[derive(Clone, Copy, Debug, Default)]
struct Line {
    data: u128,
    updated: Region,
}

/// A line the renderer has to repaint, and which of its columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirtyLine {
    pub row: usize,
    pub columns: Range<usize>,
}

#[derive(Debug)]
pub struct Display {
    lines: Vec<Line>,
    res: Resolution,
    config: DisplayConfig,
    updated_lines: BTreeSet<usize>,
    changed: bool,
    fading: HashMap<Point, Color>,
}

impl Default for Display {
    fn default() -> Self {
        Self::new(DisplayConfig::default())
    }
}

impl Display {
    pub fn new(config: DisplayConfig) -> Self {
        let mut display = Self {
            lines: Vec::with_capacity(HIRES_SIZE.1),
            res: Resolution::Low,
            config,
            updated_lines: BTreeSet::new(),
            changed: false,
            fading: HashMap::new(),
        };
        display.set_resolution(Resolution::Low);
        display
    }

    pub fn width(&self) -> usize {
        self.res.size().0
    }

    pub fn height(&self) -> usize {
        self.res.size().1
    }

    pub fn resolution(&self) -> Resolution {
        self.res
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Edge of one pixel on screen, in physical pixels.
    pub fn pixel_size(&self) -> usize {
        self.res.pixel_size() * self.config.scale_factor
    }

    fn width_mask(&self) -> u128 {
        match self.width() {
            128 => u128::MAX,
            w => (1u128 << w) - 1,
        }
    }

    fn in_bounds(&self, pos: Point) -> bool {
        pos.x < self.width() && pos.y < self.height()
    }

    pub fn at(&self, pos: Point) -> bool {
        self.in_bounds(pos) && self.lines[pos.y].data & (1u128 << pos.x) != 0
    }

    /// Writes a single pixel. Positions outside the display are ignored.
    pub fn set_pixel(&mut self, pos: Point, on: bool) {
        if !self.in_bounds(pos) {
            return;
        }

        let line = &mut self.lines[pos.y];
        if on {
            line.data |= 1u128 << pos.x;
            self.fading.remove(&pos);
        } else {
            line.data &= !(1u128 << pos.x);
        }
        line.updated.expand(pos.x..pos.x + 1);

        self.updated_lines.insert(pos.y);
        self.changed = true;
    }

    /// XORs a sprite onto the display and reports whether any lit pixel was
    /// switched off.
    pub fn draw_sprite(&mut self, sprite: &Sprite) -> bool {
        let mask: u16 = if sprite.width > 8 { 0x8000 } else { 0x80 };
        let mut collision = false;

        trace!(
            "Drawing {}x{} sprite at ({}, {})",
            sprite.width,
            sprite.rows.len(),
            sprite.pos.x,
            sprite.pos.y
        );

        for (dy, &row) in sprite.rows.iter().enumerate() {
            for dx in 0..sprite.width {
                if row & (mask >> dx) == 0 {
                    continue;
                }

                let pos = Point::new(sprite.pos.x + dx, sprite.pos.y + dy);
                if self.draw_sprite_pixel(pos) {
                    collision = true;
                }
            }
        }

        collision
    }

    fn draw_sprite_pixel(&mut self, mut pos: Point) -> bool {
        if pos.x >= self.width() {
            match self.config.wrap_x {
                EdgeMode::Wrap => pos.x %= self.width(),
                EdgeMode::Clip => return false,
            }
        }

        if pos.y >= self.height() {
            match self.config.wrap_y {
                EdgeMode::Wrap => pos.y %= self.height(),
                EdgeMode::Clip => return false,
            }
        }

        let lit = self.at(pos);
        self.set_pixel(pos, !lit);
        lit
    }

    /// Switches every pixel off. With fading enabled the lit pixels keep
    /// glowing and decay in [`Display::animate`].
    pub fn clear(&mut self) {
        if self.config.enable_fade {
            let on_color = self.config.on_color;
            for (y, line) in self.lines.iter().enumerate() {
                let mut bits = line.data;
                while bits != 0 {
                    let x = bits.trailing_zeros() as usize;
                    self.fading.insert(Point::new(x, y), on_color);
                    bits &= bits - 1;
                }
            }
        }

        for line in self.lines.iter_mut() {
            line.data = 0;
        }

        self.update_all_lines();
    }

    /// Scrolls the picture by `n` pixels. In low resolution the distance is
    /// halved, since SUPER-CHIP measures it in high-resolution pixels.
    pub fn scroll(&mut self, dir: ScrollDirection, n: usize) {
        let n = match self.res {
            Resolution::Low => n / 2,
            Resolution::High => n,
        };
        let mask = self.width_mask();

        match dir {
            ScrollDirection::Down => {
                let n = n.min(self.lines.len());
                self.lines.rotate_right(n);
                for line in &mut self.lines[..n] {
                    line.data = 0;
                }
            }
            ScrollDirection::Right => {
                for line in self.lines.iter_mut() {
                    line.data = line.data.checked_shl(n as u32).unwrap_or(0) & mask;
                }
            }
            ScrollDirection::Left => {
                for line in self.lines.iter_mut() {
                    line.data = line.data.checked_shr(n as u32).unwrap_or(0);
                }
            }
        }

        self.update_all_lines();
    }

    pub fn set_resolution(&mut self, res: Resolution) {
        self.res = res;
        let (width, height) = res.size();

        self.lines.resize(height, Line::default());
        let mask = self.width_mask();
        for line in self.lines.iter_mut() {
            line.data &= mask;
        }
        self.fading.retain(|pos, _| pos.x < width && pos.y < height);
        self.updated_lines.retain(|&y| y < height);

        self.update_all_lines();
    }

    pub fn set_on_color(&mut self, color: Color) {
        self.config.on_color = color;
        self.update_all_lines();
    }

    pub fn set_off_color(&mut self, color: Color) {
        self.config.off_color = color;
        self.update_all_lines();
    }

    pub fn set_scale_factor(&mut self, factor: usize) {
        self.config.scale_factor = factor.max(1);
        self.update_all_lines();
    }

    pub fn set_grid(&mut self, enabled: bool) {
        self.config.enable_grid = enabled;
        self.update_all_lines();
    }

    pub fn set_fade(&mut self, enabled: bool, speed: u8) {
        self.config.enable_fade = enabled;
        self.config.fade_speed = speed.max(1);
        if !enabled {
            self.fading.clear();
        }
        self.update_all_lines();
    }

    pub fn set_wrap(&mut self, wrap_x: EdgeMode, wrap_y: EdgeMode) {
        self.config.wrap_x = wrap_x;
        self.config.wrap_y = wrap_y;
    }

    /// Advances the fade animation by one tick.
    pub fn animate(&mut self) {
        let Self {
            lines,
            config,
            fading,
            updated_lines,
            changed,
            ..
        } = self;

        if fading.is_empty() {
            return;
        }

        fading.retain(|pos, color| {
            *color = color.approach(config.off_color, config.fade_speed);
            lines[pos.y].updated.expand(pos.x..pos.x + 1);
            updated_lines.insert(pos.y);
            !color.same_rgb(config.off_color)
        });
        *changed = true;
    }

    pub fn is_fading(&self) -> bool {
        !self.fading.is_empty()
    }

    pub fn fading_pixels(&self) -> impl Iterator<Item = (Point, Color)> + '_ {
        self.fading.iter().map(|(&pos, &color)| (pos, color))
    }

    /// The colour the renderer should paint at `pos`.
    pub fn color_at(&self, pos: Point) -> Color {
        if self.at(pos) {
            self.config.on_color
        } else {
            self.fading
                .get(&pos)
                .copied()
                .unwrap_or(self.config.off_color)
        }
    }

    /// Whether anything changed since the last [`Display::take_dirty_lines`].
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Hands the pending dirty regions to the renderer and forgets them.
    pub fn take_dirty_lines(&mut self) -> Vec<DirtyLine> {
        let dirty = std::mem::take(&mut self.updated_lines)
            .into_iter()
            .filter_map(|row| {
                let region = std::mem::take(&mut self.lines[row].updated);
                (!region.is_empty()).then(|| DirtyLine {
                    row,
                    columns: region.begin..region.end,
                })
            })
            .collect();
        self.changed = false;
        dirty
    }

    fn update_all_lines(&mut self) {
        let width = self.width();
        for (y, line) in self.lines.iter_mut().enumerate() {
            line.updated = Region {
                begin: 0,
                end: width,
            };
            self.updated_lines.insert(y);
        }
        self.changed = true;
    }
}
