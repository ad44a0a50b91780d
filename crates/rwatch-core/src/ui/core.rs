// src/ui/core.rs
//! Core UI types: buttons, app messages and click contexts

use embassy_time::Instant;

use crate::ui::layer::LayerId;
use crate::ui::window::WindowId;

/// Physical watch buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Back,
    Up,
    Select,
    Down,
}

impl ButtonId {
    /// Number of physical buttons.
    pub const COUNT: usize = 4;

    /// All buttons, in table order.
    pub const ALL: [ButtonId; Self::COUNT] =
        [ButtonId::Back, ButtonId::Up, ButtonId::Select, ButtonId::Down];

    /// Index into per-button tables.
    pub const fn index(self) -> usize {
        match self {
            ButtonId::Back => 0,
            ButtonId::Up => 1,
            ButtonId::Select => 2,
            ButtonId::Down => 3,
        }
    }
}

/// Edge of a physical button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Down,
    Up,
}

/// A raw button edge with the time it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub action: ButtonAction,
    pub at: Instant,
}

impl ButtonEvent {
    pub fn down(button: ButtonId, at: Instant) -> Self {
        Self {
            button,
            action: ButtonAction::Down,
            at,
        }
    }

    pub fn up(button: ButtonId, at: Instant) -> Self {
        Self {
            button,
            action: ButtonAction::Up,
            at,
        }
    }
}

/// Messages consumed by the app run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMessage {
    /// The top window was marked dirty and needs compositing
    Draw,
    /// A physical button edge
    Button(ButtonEvent),
    /// Time advanced; drives long-press, repeat and multi-click timeouts
    Tick(Instant),
    /// Leave the run loop
    Quit,
}

/// Context handed to click handlers.
///
/// Defaults to the window whose click configuration is active; a provider
/// context or a per-button context can override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickContext {
    Window(WindowId),
    Layer(LayerId),
    Value(u32),
}
