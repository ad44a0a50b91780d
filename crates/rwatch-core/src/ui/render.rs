//! Dirty-driven render scheduling.
//!
//! Marking the top window dirty never draws. It moves the window from
//! [`RenderState::Clean`] to [`RenderState::DirtyScheduled`] and posts one
//! [`AppMessage::Draw`]. When the host drains that message, [`WindowManager::draw`]
//! composes the window into the shared [`GContext`](crate::graphics::GContext)
//! and presents only the changed pixels.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, warn};

use crate::ui::core::AppMessage;
use crate::ui::layer::LayerId;
use crate::ui::window::RenderState;
use crate::ui::window_manager::WindowManager;

impl WindowManager {
    /// Schedule (`true`) or unschedule (`false`) a redraw of the top window.
    ///
    /// At most one draw request is queued per Clean → DirtyScheduled
    /// transition. If the queue is full the window stays Clean, so a later
    /// call can retry.
    pub fn window_dirty(&mut self, is_dirty: bool) {
        let Some(top) = self.window_stack_get_top_window() else {
            return;
        };
        let Some(window) = self.windows.get_mut(top) else {
            return;
        };

        if !is_dirty {
            window.render_state = RenderState::Clean;
            return;
        }
        if window.render_state == RenderState::DirtyScheduled {
            return;
        }

        match self.queue.try_send(AppMessage::Draw) {
            Ok(()) => window.render_state = RenderState::DirtyScheduled,
            Err(_) => warn!("App queue full, draw request for {:?} dropped", top),
        }
    }

    /// Schedule a redraw if `layer` belongs to the top window's tree.
    pub fn layer_mark_dirty(&mut self, layer: LayerId) {
        let Some(root) = self.layers.root_of(layer) else {
            return;
        };
        let is_top = self
            .window_stack_get_top_window()
            .and_then(|top| self.windows.get(top))
            .is_some_and(|window| window.root_layer == root);

        if is_top {
            self.window_dirty(true);
        }
    }

    /// Compose the top window and present it to `display`.
    ///
    /// Does nothing and returns `Ok(false)` unless a top window exists and is
    /// scheduled. Otherwise the background is filled, every visible layer is
    /// drawn parent first, the changed region is presented and the window is
    /// marked clean again (also when presenting fails).
    pub fn draw<D>(&mut self, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(top) = self.window_stack_get_top_window() else {
            return Ok(false);
        };
        let Some(window) = self.windows.get(top) else {
            return Ok(false);
        };
        if window.render_state != RenderState::DirtyScheduled {
            return Ok(false);
        }
        let root = window.root_layer;
        let background = window.background_color;
        let Some(frame) = self.layers.frame(root) else {
            warn!("Window {:?} lost its root layer", top);
            if let Some(window) = self.windows.get_mut(top) {
                window.render_state = RenderState::Clean;
            }
            return Ok(false);
        };

        let ctx = &mut self.context;
        ctx.set_offset(frame);
        ctx.set_fill_color(background);
        ctx.fill_rect(Rectangle::new(Point::zero(), frame.size));

        let screen = self.config().display_bounds();
        let visited = self.layers.walk(root, Point::zero(), screen, &mut self.context);
        self.context.reset_offset();

        let presented = self.context.present(display);
        if let Some(window) = self.windows.get_mut(top) {
            window.render_state = RenderState::Clean;
        }
        let presented = presented?;

        debug!(
            "Drew window {:?}: {} layers, presented: {}",
            top, visited, presented
        );
        Ok(true)
    }
}
