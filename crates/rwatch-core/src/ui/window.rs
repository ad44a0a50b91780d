//! Window records, lifecycle handlers and the window arena.
//!
//! A [`Window`] owns exactly one root layer plus the metadata that makes it a
//! unit of screen ownership: background color, lifecycle handlers, click
//! configuration, render state and user data. Windows live in a
//! fixed-capacity [`WindowArena`] and are addressed by generational
//! [`WindowId`] handles; the [`WindowManager`] is the public surface.

extern crate alloc;

use alloc::boxed::Box;
use core::any::Any;
use core::fmt;
use embedded_graphics::pixelcolor::Rgb565;
use heapless::Vec;

use crate::config::{ClickTiming, MAX_WINDOWS};
use crate::ui::click::{ClickConfig, ClickConfigProvider};
use crate::ui::colors::WHITE;
use crate::ui::core::ClickContext;
use crate::ui::layer::LayerId;
use crate::ui::window_manager::WindowManager;

/// A handle to a window owned by a [`WindowManager`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId {
    idx: u16,
    generation: u16,
}

impl WindowId {
    /// Raw slot index (diagnostics only).
    pub const fn index(self) -> u16 {
        self.idx
    }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowId({}@gen{})", self.idx, self.generation)
    }
}

/// Window lifecycle callbacks.
///
/// Both operations are optional; the defaults do nothing. `load` runs once
/// when the window becomes the top of the stack, before it is drawn. `unload`
/// runs once after it stops being the top.
///
/// Handlers get the manager back, so they can build layers, change the stack
/// or even destroy their own window.
pub trait WindowHandlers {
    fn load(&mut self, _wm: &mut WindowManager, _window: WindowId) {}

    fn unload(&mut self, _wm: &mut WindowManager, _window: WindowId) {}
}

/// Render scheduling state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    /// Nothing to draw.
    #[default]
    Clean,
    /// A draw request is queued for this window.
    DirtyScheduled,
}

/// A window record.
pub struct Window {
    pub(crate) root_layer: LayerId,
    pub(crate) background_color: Rgb565,
    pub(crate) is_loaded: bool,
    pub(crate) render_state: RenderState,
    pub(crate) click_config_provider: Option<ClickConfigProvider>,
    pub(crate) click_config_context: Option<ClickContext>,
    pub(crate) click_config: ClickConfig,
    pub(crate) handlers: Option<Box<dyn WindowHandlers>>,
    pub(crate) user_data: Option<Box<dyn Any>>,
}

impl Window {
    pub(crate) fn new(root_layer: LayerId, timing: ClickTiming) -> Self {
        Self {
            root_layer,
            background_color: WHITE,
            is_loaded: false,
            render_state: RenderState::Clean,
            click_config_provider: None,
            click_config_context: None,
            click_config: ClickConfig::new(timing),
            handlers: None,
            user_data: None,
        }
    }

    pub fn root_layer(&self) -> LayerId {
        self.root_layer
    }

    pub fn background_color(&self) -> Rgb565 {
        self.background_color
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    pub fn render_state(&self) -> RenderState {
        self.render_state
    }

    /// The subscription table built by the click-config provider.
    pub fn click_config(&self) -> &ClickConfig {
        &self.click_config
    }

    /// Context handed to click handlers when no per-button context is set.
    pub(crate) fn effective_click_context(&self, id: WindowId) -> ClickContext {
        self.click_config_context.unwrap_or(ClickContext::Window(id))
    }
}

struct WindowSlot {
    generation: u16,
    window: Option<Window>,
}

/// Fixed-capacity storage for windows.
pub(crate) struct WindowArena {
    slots: Vec<WindowSlot, MAX_WINDOWS>,
}

impl WindowArena {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Store a window, handing it back if every slot is taken.
    pub(crate) fn insert(&mut self, window: Window) -> Result<WindowId, Window> {
        if let Some(idx) = self.slots.iter().position(|slot| slot.window.is_none()) {
            let slot = &mut self.slots[idx];
            slot.window = Some(window);
            return Ok(WindowId {
                idx: idx as u16,
                generation: slot.generation,
            });
        }

        if self.slots.is_full() {
            return Err(window);
        }
        let idx = self.slots.len();
        self.slots
            .push(WindowSlot {
                generation: 0,
                window: Some(window),
            })
            .ok();

        Ok(WindowId {
            idx: idx as u16,
            generation: 0,
        })
    }

    pub(crate) fn remove(&mut self, id: WindowId) -> Option<Window> {
        let slot = self
            .slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let window = slot.window.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(window)
    }

    pub(crate) fn get(&self, id: WindowId) -> Option<&Window> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.window.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.window.as_mut())
    }
}
