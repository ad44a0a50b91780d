//! rwatch UI system - windows, layers and button dispatch for a watch display
//!
//! This module provides:
//! - A layer tree with per-layer update procedures
//! - Windows owning a root layer, lifecycle handlers and click configuration
//! - A window stack whose top entry is the active window
//! - Dirty-driven render scheduling through the app message queue
//! - Click recognition (single, repeating, multi, long, raw) and dispatch

pub mod click;
pub mod colors;
pub mod core;
pub mod dispatch;
pub mod layer;
pub mod render;
pub mod window;
pub mod window_manager;

// Re-export commonly used items
pub use click::{
    ButtonSubscription, ClickConfig, ClickConfigProvider, ClickHandler, ClickRecognizer,
};
pub use self::core::{AppMessage, ButtonAction, ButtonEvent, ButtonId, ClickContext};
pub use layer::{LayerId, LayerInfo, LayerTree, UpdateProc};
pub use window::{RenderState, WindowHandlers, WindowId};
pub use window_manager::WindowManager;
