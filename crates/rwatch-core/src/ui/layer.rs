//! Layer tree: hierarchical drawable nodes stored in a fixed-capacity arena.
//!
//! Layers are addressed by [`LayerId`] handles carrying a slot index and a
//! generation counter, so a handle to a destroyed layer is detected instead of
//! aliasing whatever reuses the slot. A layer is owned by its parent (or by a
//! window, as that window's root); destroying a layer destroys its subtree.
//!
//! Each layer has a frame (position and size inside the parent's bounds), its
//! own bounds (local drawing rectangle, `(0, 0)` + frame size by default) and
//! an optional [`UpdateProc`] that draws it.

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use heapless::Vec;
use log::{debug, error};

use crate::config::{MAX_CHILDREN, MAX_LAYERS};
use crate::error::{UiError, UiResult};
use crate::graphics::GContext;

/// A handle to a layer in a [`LayerTree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId {
    idx: u16,
    generation: u16,
}

impl LayerId {
    /// Raw slot index (diagnostics only).
    pub const fn index(self) -> u16 {
        self.idx
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// Snapshot of a layer's geometry handed to its update procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerInfo {
    pub id: LayerId,
    /// Position and size inside the parent's bounds.
    pub frame: Rectangle,
    /// Local drawing rectangle.
    pub bounds: Rectangle,
}

/// Draws a layer.
///
/// The context's offset is the layer's absolute frame when this runs, so
/// drawing at `layer.bounds` covers exactly the layer. Any
/// `FnMut(&LayerInfo, &mut GContext)` closure is an update procedure.
pub trait UpdateProc {
    fn update(&mut self, layer: &LayerInfo, ctx: &mut GContext);
}

impl<F> UpdateProc for F
where
    F: FnMut(&LayerInfo, &mut GContext),
{
    fn update(&mut self, layer: &LayerInfo, ctx: &mut GContext) {
        self(layer, ctx)
    }
}

/// A single node of the layer tree.
pub struct Layer {
    frame: Rectangle,
    bounds: Rectangle,
    hidden: bool,
    parent: Option<LayerId>,
    children: Vec<LayerId, MAX_CHILDREN>,
    update_proc: Option<Box<dyn UpdateProc>>,
}

impl Layer {
    fn new(frame: Rectangle) -> Self {
        Self {
            frame,
            bounds: Rectangle::new(Point::zero(), frame.size),
            hidden: false,
            parent: None,
            children: Vec::new(),
            update_proc: None,
        }
    }

    pub fn frame(&self) -> Rectangle {
        self.frame
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn parent(&self) -> Option<LayerId> {
        self.parent
    }

    /// Children in drawing order.
    pub fn children(&self) -> &[LayerId] {
        &self.children
    }

    pub fn has_update_proc(&self) -> bool {
        self.update_proc.is_some()
    }
}

struct LayerSlot {
    generation: u16,
    layer: Option<Layer>,
}

/// Arena holding every layer of every window.
pub struct LayerTree {
    slots: Vec<LayerSlot, MAX_LAYERS>,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Create a detached layer with the given frame.
    ///
    /// Fails with [`UiError::LayerCapacity`] when every slot is in use.
    pub fn create(&mut self, frame: Rectangle) -> UiResult<LayerId> {
        if let Some(idx) = self.slots.iter().position(|slot| slot.layer.is_none()) {
            let slot = &mut self.slots[idx];
            slot.layer = Some(Layer::new(frame));
            return Ok(LayerId {
                idx: idx as u16,
                generation: slot.generation,
            });
        }

        let idx = self.slots.len();
        self.slots
            .push(LayerSlot {
                generation: 0,
                layer: Some(Layer::new(frame)),
            })
            .map_err(|_| {
                error!("No memory for Layer (max: {})", MAX_LAYERS);
                UiError::LayerCapacity { max: MAX_LAYERS }
            })?;

        Ok(LayerId {
            idx: idx as u16,
            generation: 0,
        })
    }

    /// Destroy a layer and its whole subtree.
    ///
    /// Returns `false` (and does nothing) for a stale handle.
    pub fn destroy(&mut self, id: LayerId) -> bool {
        if !self.is_alive(id) {
            debug!("destroy: stale layer {:?}", id);
            return false;
        }
        self.remove_from_parent(id);

        let mut pending: Vec<LayerId, MAX_LAYERS> = Vec::new();
        pending.push(id).ok();
        while let Some(next) = pending.pop() {
            let slot = &mut self.slots[next.idx as usize];
            if slot.generation != next.generation {
                continue;
            }
            if let Some(layer) = slot.layer.take() {
                // Bump generation so old handles immediately fail validation.
                slot.generation = slot.generation.wrapping_add(1);
                for child in layer.children {
                    pending.push(child).ok();
                }
            }
        }
        true
    }

    /// Whether the handle refers to a live layer.
    pub fn is_alive(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.slots
            .get(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.layer.as_ref())
    }

    fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.layer.as_mut())
    }

    /// Number of live layers.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.layer.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `child` as the last (topmost) child of `parent`.
    ///
    /// A child that already has a parent is moved.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) -> UiResult<()> {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return Err(UiError::InvalidLayer);
        }

        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(UiError::Cycle);
            }
            cursor = self.get(ancestor).and_then(Layer::parent);
        }

        let already_child = self
            .get(parent)
            .is_some_and(|layer| layer.children.contains(&child));
        let full = self
            .get(parent)
            .is_some_and(|layer| layer.children.is_full());
        if full && !already_child {
            return Err(UiError::ChildCapacity { max: MAX_CHILDREN });
        }

        self.remove_from_parent(child);
        if let Some(layer) = self.get_mut(parent) {
            layer.children.push(child).ok();
        }
        if let Some(layer) = self.get_mut(child) {
            layer.parent = Some(parent);
        }
        Ok(())
    }

    /// Detach a layer from its parent. The subtree stays alive.
    pub fn remove_from_parent(&mut self, id: LayerId) {
        let Some(parent) = self.get(id).and_then(Layer::parent) else {
            return;
        };
        if let Some(layer) = self.get_mut(parent) {
            layer.children.retain(|child| *child != id);
        }
        if let Some(layer) = self.get_mut(id) {
            layer.parent = None;
        }
    }

    /// Topmost ancestor of a layer (the layer itself if detached).
    pub fn root_of(&self, id: LayerId) -> Option<LayerId> {
        let mut current = id;
        let mut layer = self.get(current)?;
        while let Some(parent) = layer.parent {
            current = parent;
            layer = self.get(current)?;
        }
        Some(current)
    }

    pub fn set_update_proc<P>(&mut self, id: LayerId, update_proc: P)
    where
        P: UpdateProc + 'static,
    {
        if let Some(layer) = self.get_mut(id) {
            layer.update_proc = Some(Box::new(update_proc));
        }
    }

    pub fn clear_update_proc(&mut self, id: LayerId) {
        if let Some(layer) = self.get_mut(id) {
            layer.update_proc = None;
        }
    }

    pub fn frame(&self, id: LayerId) -> Option<Rectangle> {
        self.get(id).map(Layer::frame)
    }

    /// Move/resize a layer. The bounds keep their origin and follow the new
    /// frame size.
    pub fn set_frame(&mut self, id: LayerId, frame: Rectangle) {
        if let Some(layer) = self.get_mut(id) {
            layer.frame = frame;
            layer.bounds.size = frame.size;
        }
    }

    pub fn bounds(&self, id: LayerId) -> Option<Rectangle> {
        self.get(id).map(Layer::bounds)
    }

    /// Set the local drawing rectangle. A non-zero origin scrolls the children.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Rectangle) {
        if let Some(layer) = self.get_mut(id) {
            layer.bounds = bounds;
        }
    }

    pub fn set_hidden(&mut self, id: LayerId, hidden: bool) {
        if let Some(layer) = self.get_mut(id) {
            layer.hidden = hidden;
        }
    }

    pub fn is_hidden(&self, id: LayerId) -> bool {
        self.get(id).is_some_and(Layer::is_hidden)
    }

    pub fn info(&self, id: LayerId) -> Option<LayerInfo> {
        self.get(id).map(|layer| LayerInfo {
            id,
            frame: layer.frame,
            bounds: layer.bounds,
        })
    }

    /// Draw a subtree: the layer first, then each child subtree in order.
    ///
    /// `parent_origin` is the screen position of the parent's bounds origin
    /// and `parent_clip` the screen area the parent may draw into. Hidden
    /// layers are skipped together with their subtree. Returns the number of
    /// layers visited.
    pub(crate) fn walk(
        &mut self,
        id: LayerId,
        parent_origin: Point,
        parent_clip: Rectangle,
        ctx: &mut GContext,
    ) -> usize {
        let Some(layer) = self.get_mut(id) else {
            return 0;
        };
        if layer.hidden {
            return 0;
        }

        let frame = layer.frame;
        let bounds = layer.bounds;
        let absolute = Rectangle::new(parent_origin + frame.top_left, frame.size);
        let clip = absolute.intersection(&parent_clip);

        if let Some(update_proc) = layer.update_proc.as_mut() {
            ctx.set_offset(absolute);
            ctx.restrict_clip(&clip);
            update_proc.update(&LayerInfo { id, frame, bounds }, ctx);
        }

        let children = layer.children.clone();
        let child_origin = absolute.top_left + bounds.top_left;
        let mut visited = 1;
        for child in children {
            visited += self.walk(child, child_origin, clip, ctx);
        }
        visited
    }
}
