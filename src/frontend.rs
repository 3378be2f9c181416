//! Desktop window driving a [`Vm`] and painting its display.

use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use std::error::Error;
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

use crate::display::{Display, Point, HIRES_SIZE};
use crate::vm::{Mode, Vm};

/// Size of the framebuffer in physical pixels. Low resolution pixels cover
/// twice as many, so the buffer never changes size.
fn buffer_size(display: &Display) -> (usize, usize) {
    let scale = display.config().scale_factor;
    (HIRES_SIZE.0 * scale, HIRES_SIZE.1 * scale)
}

/// Repaints the dirty parts of `display` into an RGBA `frame`.
fn paint(display: &mut Display, frame: &mut [u8]) {
    let (stride, _) = buffer_size(display);
    let cell = display.pixel_size();
    let grid = display.config().enable_grid && cell > 2;

    for line in display.take_dirty_lines() {
        for x in line.columns {
            let color = display.color_at(Point::new(x, line.row));

            for dy in 0..cell {
                for dx in 0..cell {
                    let edge = dx == 0 || dy == 0 || dx == cell - 1 || dy == cell - 1;
                    let color = if grid && edge { color.inverted() } else { color };

                    let idx = ((line.row * cell + dy) * stride + x * cell + dx) * 4;
                    if let Some(pixel) = frame.get_mut(idx..idx + 4) {
                        pixel.copy_from_slice(&color.to_array());
                    }
                }
            }
        }
    }
}

/// Leaves STEP mode by executing the instruction under the breakpoint and
/// running again, unless that instruction stopped the program.
fn continue_from_step(vm: &mut Vm) {
    if let Err(err) = vm.step() {
        error!("{err}");
        return;
    }
    if vm.mode() == Mode::Step {
        vm.set_mode(Mode::Run);
    }
}

fn handle_controls(vm: &mut Vm, input: &WinitInputHelper) {
    if input.key_pressed(VirtualKeyCode::Space) {
        match vm.mode() {
            Mode::Run => vm.pause(),
            Mode::Paused => vm.resume(),
            Mode::Step => continue_from_step(vm),
            Mode::Empty => {}
        }
    }

    if input.key_pressed(VirtualKeyCode::Tab) && matches!(vm.mode(), Mode::Step | Mode::Paused) {
        if let Err(err) = vm.step() {
            error!("{err}");
        }
    }

    if input.key_pressed(VirtualKeyCode::Back) {
        vm.reset();
    }
}

/// Opens a window and runs `vm` in it until the window is closed.
pub fn run(mut vm: Vm) -> Result<(), Box<dyn Error>> {
    let layout = vm.config().input.layout;
    let (width, height) = buffer_size(&vm.display);

    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let window = WindowBuilder::new()
        .with_title("superchip")
        .with_inner_size(LogicalSize::new(width as f64, height as f64))
        .with_resizable(false)
        .build(&event_loop)?;

    let mut pixels = {
        let size = window.inner_size();
        let texture = SurfaceTexture::new(size.width, size.height, &window);
        Pixels::new(width as u32, height as u32, texture)?
    };

    info!("Opened window [size: {width}x{height}] [layout: {layout:?}]");

    event_loop.run(move |event, _, control_flow| {
        if let Event::RedrawRequested(_) = event {
            if vm.display.is_changed() {
                paint(&mut vm.display, pixels.get_frame_mut());
            }
            if let Err(err) = pixels.render() {
                error!("Rendering failed: {err}");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.quit() {
                *control_flow = ControlFlow::Exit;
                return;
            }

            handle_controls(&mut vm, &input);
            for (&key, &index) in layout.keymap() {
                vm.set_key(index, input.key_held(key));
            }

            if let Err(err) = vm.update() {
                error!("VM paused [pc: {:#06x}]: {err}", vm.state.pc);
            }

            // no audio device is opened, so queued samples are discarded
            vm.beeper.drain(vm.beeper.queued());

            window.request_redraw();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::display::{Color, DisplayConfig, Resolution};
    use crate::quirks::Extension;

    fn frame_for(display: &Display) -> Vec<u8> {
        let (width, height) = buffer_size(display);
        vec![0; width * height * 4]
    }

    fn pixel(frame: &[u8], stride: usize, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * stride + x) * 4;
        [frame[idx], frame[idx + 1], frame[idx + 2], frame[idx + 3]]
    }

    #[test]
    fn low_resolution_pixels_cover_two_cells() {
        let mut display = Display::new(DisplayConfig {
            scale_factor: 1,
            ..Default::default()
        });
        let mut frame = frame_for(&display);
        display.set_pixel(Point::new(1, 0), true);

        paint(&mut display, &mut frame);

        assert_eq!(pixel(&frame, 128, 2, 0), Color::WHITE.to_array());
        assert_eq!(pixel(&frame, 128, 3, 1), Color::WHITE.to_array());
        assert_eq!(pixel(&frame, 128, 1, 0), Color::BLACK.to_array());
        assert!(!display.is_changed());
    }

    #[test]
    fn grid_outlines_cells() {
        let mut display = Display::new(DisplayConfig {
            scale_factor: 2,
            enable_grid: true,
            ..Default::default()
        });
        display.set_resolution(Resolution::Low);
        let mut frame = frame_for(&display);

        paint(&mut display, &mut frame);

        // 4x4 cells: border inverted, centre plain
        assert_eq!(pixel(&frame, 256, 0, 0), Color::WHITE.to_array());
        assert_eq!(pixel(&frame, 256, 1, 1), Color::BLACK.to_array());
        assert_eq!(pixel(&frame, 256, 3, 2), Color::WHITE.to_array());
    }

    fn stepping_vm(rom: &[u8]) -> Vm {
        let mut config = Config::default();
        config.extension = Extension::Schip;
        let mut vm = Vm::new(config);
        vm.load(rom).unwrap();
        vm.set_mode(Mode::Step);
        vm
    }

    #[test]
    fn continue_resumes_running() {
        let mut vm = stepping_vm(&[0x60, 0x07, 0x12, 0x02]);
        continue_from_step(&mut vm);
        assert_eq!(vm.state.regs[0], 7);
        assert_eq!(vm.mode(), Mode::Run);
    }

    #[test]
    fn continue_past_exit_stays_empty() {
        let mut vm = stepping_vm(&[0x00, 0xFD]);
        continue_from_step(&mut vm);
        assert_eq!(vm.mode(), Mode::Empty);
    }

    #[test]
    fn continue_into_error_stays_paused() {
        let mut vm = stepping_vm(&[0xFF, 0xFF]);
        continue_from_step(&mut vm);
        assert_eq!(vm.mode(), Mode::Paused);
    }
}
