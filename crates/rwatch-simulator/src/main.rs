//! Desktop simulator for the rwatch UI toolkit.
//!
//! Renders the window stack in an SDL2 window via `embedded-graphics-simulator`
//! and maps the keyboard onto the four watch buttons. Starts the calendar app.
//!
//! # Key bindings
//!
//! | Key                 | Button |
//! |---------------------|--------|
//! | Escape / Backspace  | Back   |
//! | Up arrow            | Up     |
//! | Return / Space      | Select |
//! | Down arrow          | Down   |
//! | Q                   | Quit   |

use std::ops::ControlFlow;
use std::time::{Duration, Instant as StdInstant};

use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{error, info};

use rwatch_core::ToolkitConfig;
use rwatch_core::apps::calendar;
use rwatch_core::ui::{ButtonEvent, ButtonId, WindowManager};

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 3;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Map an SDL keycode to a watch button.
fn keycode_to_button(keycode: Keycode) -> Option<ButtonId> {
    match keycode {
        Keycode::Escape | Keycode::Backspace | Keycode::Left => Some(ButtonId::Back),
        Keycode::Up => Some(ButtonId::Up),
        Keycode::Return | Keycode::Space | Keycode::Right => Some(ButtonId::Select),
        Keycode::Down => Some(ButtonId::Down),
        _ => None,
    }
}

fn main() {
    env_logger::init();

    let config = ToolkitConfig::default();
    info!("Starting rwatch simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        config.display_width, config.display_height, WINDOW_SCALE
    );
    info!("Keys: Esc=Back  ↑=Up  Enter=Select  ↓=Down  Q=Quit");

    let mut display = SimulatorDisplay::<Rgb565>::new(Size::new(
        config.display_width as u32,
        config.display_height as u32,
    ));
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("rwatch Simulator", &output_settings);

    let mut wm = WindowManager::new(config);
    if let Err(e) = calendar::launch(&mut wm) {
        error!("Calendar failed to start: {}", e);
        return;
    }

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    let Ok(_) = wm.process_pending(&mut display);
    window.update(&display);

    'running: loop {
        let frame_start = StdInstant::now();

        // --- SDL events ---------------------------------------------------
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown {
                    keycode, repeat, ..
                } => {
                    if keycode == Keycode::Q {
                        break 'running;
                    }
                    // Held keys are timed by the click recognizer, not SDL.
                    if repeat {
                        continue;
                    }
                    if let Some(button) = keycode_to_button(keycode) {
                        wm.post_button_event(ButtonEvent::down(button, Instant::now()));
                    }
                }

                SimulatorEvent::KeyUp { keycode, .. } => {
                    if let Some(button) = keycode_to_button(keycode) {
                        wm.post_button_event(ButtonEvent::up(button, Instant::now()));
                    }
                }

                _ => {}
            }
        }

        // --- Click timing and queued messages -----------------------------
        wm.tick(Instant::now());
        let Ok(flow) = wm.process_pending(&mut display);
        if let ControlFlow::Break(()) = flow {
            info!("Window stack empty");
            break 'running;
        }

        window.update(&display);

        // --- Frame pacing -------------------------------------------------
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting");
}
