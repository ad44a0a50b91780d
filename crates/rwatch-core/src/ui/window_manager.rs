//! Window manager: owns every window, layer and the window stack.
//!
//! The manager is the single owner of UI state. Windows and layers are
//! addressed through generational handles, and the top of the window stack is
//! the only window that receives input and gets drawn. Stack transitions drive
//! the window lifecycle:
//!
//! 1. The previous top stops receiving input and its `unload` handler runs.
//! 2. The new top's `load` handler runs (once, before any drawing).
//! 3. The new top's click configuration is rebuilt from its provider.
//! 4. The new top is marked dirty, which queues a draw request.
//!
//! Rendering lives in [`render`](crate::ui::render) and input dispatch in
//! [`dispatch`](crate::ui::dispatch); both are further `impl` blocks on
//! [`WindowManager`].

extern crate alloc;

use alloc::boxed::Box;
use core::any::Any;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use heapless::Vec;
use log::{debug, error, info, warn};

use crate::config::{APP_QUEUE_CAPACITY, MAX_WINDOW_STACK, MAX_WINDOWS, ToolkitConfig};
use crate::error::{UiError, UiResult};
use crate::graphics::GContext;
use crate::ui::click::{ButtonRecognizer, ClickConfigProvider};
use crate::ui::core::{AppMessage, ButtonId, ClickContext};
use crate::ui::layer::{LayerId, LayerTree};
use crate::ui::window::{RenderState, Window, WindowArena, WindowHandlers, WindowId};

/// Owner of all UI state: windows, layers, the stack, the graphics context
/// and the app message queue.
pub struct WindowManager {
    config: ToolkitConfig,
    pub(crate) windows: WindowArena,
    pub(crate) layers: LayerTree,
    pub(crate) stack: Vec<WindowId, MAX_WINDOW_STACK>,
    pub(crate) recognizers: [ButtonRecognizer; ButtonId::COUNT],
    pub(crate) context: GContext,
    pub(crate) queue: Channel<NoopRawMutex, AppMessage, APP_QUEUE_CAPACITY>,
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(ToolkitConfig::default())
    }
}

impl WindowManager {
    pub fn new(config: ToolkitConfig) -> Self {
        let size = Size::new(config.display_width as u32, config.display_height as u32);
        Self {
            config,
            windows: WindowArena::new(),
            layers: LayerTree::new(),
            stack: Vec::new(),
            recognizers: [ButtonRecognizer::default(); ButtonId::COUNT],
            context: GContext::new(size),
            queue: Channel::new(),
        }
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerTree {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerTree {
        &mut self.layers
    }

    /// The window record behind a handle, `None` if the handle is stale.
    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// The shared graphics context (the composed framebuffer).
    pub fn graphics(&self) -> &GContext {
        &self.context
    }

    // ---------------------------------------------------------------------
    // Windows
    // ---------------------------------------------------------------------

    /// Create a window with a full-screen root layer and a white background.
    pub fn window_create(&mut self) -> UiResult<WindowId> {
        let root = self.layers.create(self.config.display_bounds())?;

        match self.windows.insert(Window::new(root, self.config.click)) {
            Ok(id) => {
                debug!("Created window {:?} with root layer {:?}", id, root);
                Ok(id)
            }
            Err(_) => {
                self.layers.destroy(root);
                error!("No memory for Window (max: {})", MAX_WINDOWS);
                Err(UiError::WindowCapacity { max: MAX_WINDOWS })
            }
        }
    }

    /// Destroy a window: take it off the stack, unload it if loaded, then
    /// free its layer tree and slot. Stale handles are ignored.
    pub fn window_destroy(&mut self, id: WindowId) {
        if self.windows.get(id).is_none() {
            debug!("window_destroy: stale window {:?}", id);
            return;
        }

        self.window_stack_remove(id, false);
        self.unload_window(id);

        // An unload handler may already have destroyed the window.
        if let Some(window) = self.windows.remove(id) {
            self.layers.destroy(window.root_layer);
            debug!("Destroyed window {:?}", id);
        }
    }

    pub fn window_set_window_handlers<H>(&mut self, id: WindowId, handlers: H)
    where
        H: WindowHandlers + 'static,
    {
        if let Some(window) = self.windows.get_mut(id) {
            window.handlers = Some(Box::new(handlers));
        }
    }

    pub fn window_get_root_layer(&self, id: WindowId) -> Option<LayerId> {
        self.windows.get(id).map(|window| window.root_layer)
    }

    pub fn window_set_background_color(&mut self, id: WindowId, color: Rgb565) {
        if let Some(window) = self.windows.get_mut(id) {
            window.background_color = color;
        }
    }

    pub fn window_get_background_color(&self, id: WindowId) -> Option<Rgb565> {
        self.windows.get(id).map(|window| window.background_color)
    }

    pub fn window_is_loaded(&self, id: WindowId) -> bool {
        self.windows.get(id).is_some_and(|window| window.is_loaded)
    }

    pub fn window_is_render_scheduled(&self, id: WindowId) -> bool {
        self.windows
            .get(id)
            .is_some_and(|window| window.render_state == RenderState::DirtyScheduled)
    }

    /// Attach arbitrary data to a window, replacing any previous data.
    pub fn window_set_user_data<T: Any>(&mut self, id: WindowId, data: T) {
        if let Some(window) = self.windows.get_mut(id) {
            window.user_data = Some(Box::new(data));
        }
    }

    /// The window's user data, if present and of type `T`.
    pub fn window_user_data<T: Any>(&self, id: WindowId) -> Option<&T> {
        self.windows
            .get(id)?
            .user_data
            .as_deref()?
            .downcast_ref::<T>()
    }

    pub fn window_user_data_mut<T: Any>(&mut self, id: WindowId) -> Option<&mut T> {
        self.windows
            .get_mut(id)?
            .user_data
            .as_deref_mut()?
            .downcast_mut::<T>()
    }

    /// Set the click-config provider. Handlers receive the window itself as
    /// click context.
    pub fn window_set_click_config_provider(
        &mut self,
        id: WindowId,
        provider: ClickConfigProvider,
    ) {
        self.set_click_config_provider(id, provider, None);
    }

    /// Set the click-config provider together with the context handed to it
    /// and to the click handlers.
    pub fn window_set_click_config_provider_with_context(
        &mut self,
        id: WindowId,
        provider: ClickConfigProvider,
        context: ClickContext,
    ) {
        self.set_click_config_provider(id, provider, Some(context));
    }

    fn set_click_config_provider(
        &mut self,
        id: WindowId,
        provider: ClickConfigProvider,
        context: Option<ClickContext>,
    ) {
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };
        window.click_config_provider = Some(provider);
        window.click_config_context = context;

        // The active window picks up the new subscriptions right away.
        if self.window_stack_get_top_window() == Some(id) {
            self.install_click_config(id);
        }
    }

    pub fn window_get_click_config_provider(&self, id: WindowId) -> Option<ClickConfigProvider> {
        self.windows.get(id)?.click_config_provider
    }

    pub fn window_get_click_config_context(&self, id: WindowId) -> Option<ClickContext> {
        self.windows.get(id)?.click_config_context
    }

    // ---------------------------------------------------------------------
    // Window stack
    // ---------------------------------------------------------------------

    /// Make `id` the active window.
    ///
    /// The previous top is unloaded, `id` is loaded, gets its click
    /// configuration and is scheduled for drawing. A window already on the
    /// stack is moved to the top. `animated` is accepted for API parity; no
    /// transition animation is performed.
    pub fn window_stack_push(&mut self, id: WindowId, animated: bool) -> UiResult<()> {
        if self.windows.get(id).is_none() {
            warn!("window_stack_push: invalid window {:?}", id);
            return Err(UiError::InvalidWindow);
        }

        let previous = self.window_stack_get_top_window();
        if previous == Some(id) {
            return Ok(());
        }

        match self.stack.iter().position(|entry| *entry == id) {
            Some(pos) => {
                self.stack.remove(pos);
            }
            None if self.stack.is_full() => {
                warn!("Window stack full (max: {})", MAX_WINDOW_STACK);
                return Err(UiError::StackFull {
                    max: MAX_WINDOW_STACK,
                });
            }
            None => {}
        }
        self.stack.push(id).map_err(|_| UiError::StackFull {
            max: MAX_WINDOW_STACK,
        })?;

        info!("Push window {:?} (animated: {})", id, animated);

        if let Some(previous) = previous {
            self.unload_window(previous);
        }
        self.activate_top();
        Ok(())
    }

    /// Remove the top window and activate the one below it.
    ///
    /// The popped window is unloaded but not destroyed.
    pub fn window_stack_pop(&mut self, animated: bool) -> Option<WindowId> {
        let top = self.stack.pop()?;
        info!("Pop window {:?} (animated: {})", top, animated);

        self.unload_window(top);
        self.activate_top();
        Some(top)
    }

    /// Remove `id` wherever it is on the stack. Removing the top behaves like
    /// a pop. Returns `false` if the window was not on the stack.
    pub fn window_stack_remove(&mut self, id: WindowId, animated: bool) -> bool {
        let Some(pos) = self.stack.iter().position(|entry| *entry == id) else {
            return false;
        };
        let was_top = pos + 1 == self.stack.len();
        self.stack.remove(pos);
        info!("Remove window {:?} (animated: {})", id, animated);

        self.unload_window(id);
        if was_top {
            self.activate_top();
        }
        true
    }

    pub fn window_stack_get_top_window(&self) -> Option<WindowId> {
        self.stack.last().copied()
    }

    pub fn window_stack_contains_window(&self, id: WindowId) -> bool {
        self.stack.contains(&id)
    }

    pub fn window_stack_count(&self) -> usize {
        self.stack.len()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Run the top window's `load` handler unless it is already loaded.
    pub fn window_load_proc(&mut self) {
        if let Some(top) = self.window_stack_get_top_window() {
            self.load_window(top);
        }
    }

    /// Rebuild the top window's click configuration from its provider.
    pub fn window_load_click_config(&mut self) {
        if let Some(top) = self.window_stack_get_top_window() {
            self.install_click_config(top);
        }
    }

    /// Bring the current top window into the active state.
    fn activate_top(&mut self) {
        self.recognizers = [ButtonRecognizer::default(); ButtonId::COUNT];

        let Some(top) = self.window_stack_get_top_window() else {
            debug!("Window stack is empty");
            return;
        };

        self.load_window(top);
        // `load` may itself have changed the stack; that change did its own
        // activation.
        if self.window_stack_get_top_window() != Some(top) {
            return;
        }

        self.install_click_config(top);
        self.window_dirty(true);
    }

    fn install_click_config(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };
        let context = window.effective_click_context(id);
        window.click_config.clear();
        if let Some(provider) = window.click_config_provider {
            provider(&mut window.click_config, context);
        }
    }

    fn load_window(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };
        if window.is_loaded {
            return;
        }
        window.is_loaded = true;
        debug!("Load window {:?}", id);

        if let Some(mut handlers) = window.handlers.take() {
            handlers.load(self, id);
            self.restore_handlers(id, handlers);
        }
    }

    pub(crate) fn unload_window(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };
        if !window.is_loaded {
            return;
        }
        window.is_loaded = false;
        window.render_state = RenderState::Clean;
        debug!("Unload window {:?}", id);

        if let Some(mut handlers) = window.handlers.take() {
            handlers.unload(self, id);
            self.restore_handlers(id, handlers);
        }
    }

    /// Put handlers back after a call, unless the window is gone or the
    /// handler installed replacements.
    fn restore_handlers(&mut self, id: WindowId, handlers: Box<dyn WindowHandlers>) {
        if let Some(window) = self.windows.get_mut(id)
            && window.handlers.is_none()
        {
            window.handlers = Some(handlers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::click::{ClickConfig, ClickRecognizer};
    use alloc::rc::Rc;
    use alloc::vec::Vec as StdVec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<StdVec<&'static str>>>;

    struct Recorder {
        log: Log,
        load: &'static str,
        unload: &'static str,
    }

    impl WindowHandlers for Recorder {
        fn load(&mut self, _wm: &mut WindowManager, _window: WindowId) {
            self.log.borrow_mut().push(self.load);
        }

        fn unload(&mut self, _wm: &mut WindowManager, _window: WindowId) {
            self.log.borrow_mut().push(self.unload);
        }
    }

    fn window_with_log(
        wm: &mut WindowManager,
        log: &Log,
        load: &'static str,
        unload: &'static str,
    ) -> WindowId {
        let id = wm.window_create().unwrap();
        wm.window_set_window_handlers(
            id,
            Recorder {
                log: log.clone(),
                load,
                unload,
            },
        );
        id
    }

    fn noop(_: &mut WindowManager, _: &ClickRecognizer) {}

    fn select_provider(config: &mut ClickConfig, _context: ClickContext) {
        config.single_click_subscribe(ButtonId::Select, noop);
    }

    #[test]
    fn test_window_create_defaults() {
        let mut wm = WindowManager::default();
        let id = wm.window_create().unwrap();

        let root = wm.window_get_root_layer(id).unwrap();
        assert_eq!(wm.layers().frame(root), Some(wm.config().display_bounds()));
        assert_eq!(wm.window_get_background_color(id), Some(crate::ui::colors::WHITE));
        assert!(!wm.window_is_loaded(id));
        assert!(!wm.window_is_render_scheduled(id));
        assert!(wm.window_get_click_config_provider(id).is_none());
    }

    #[test]
    fn test_window_capacity() {
        let mut wm = WindowManager::default();
        for _ in 0..MAX_WINDOWS {
            wm.window_create().unwrap();
        }

        assert_eq!(
            wm.window_create(),
            Err(UiError::WindowCapacity { max: MAX_WINDOWS })
        );
        // The root layer of the failed window was released.
        assert_eq!(wm.layers().len(), MAX_WINDOWS);
    }

    #[test]
    fn test_destroyed_window_handle_is_stale() {
        let mut wm = WindowManager::default();
        let id = wm.window_create().unwrap();
        let root = wm.window_get_root_layer(id).unwrap();

        wm.window_destroy(id);

        assert!(wm.window(id).is_none());
        assert!(!wm.layers().is_alive(root));
        assert_eq!(wm.window_get_root_layer(id), None);
        wm.window_set_background_color(id, crate::ui::colors::RED);
        assert_eq!(wm.window_stack_push(id, false), Err(UiError::InvalidWindow));

        // The slot is reused under a new generation.
        let other = wm.window_create().unwrap();
        assert_ne!(other, id);
        assert!(wm.window(id).is_none());
    }

    #[test]
    fn test_push_pop_lifecycle_order() {
        let mut wm = WindowManager::default();
        let log: Log = Rc::default();
        let a = window_with_log(&mut wm, &log, "a.load", "a.unload");
        let b = window_with_log(&mut wm, &log, "b.load", "b.unload");

        wm.window_stack_push(a, true).unwrap();
        wm.window_stack_push(b, true).unwrap();
        assert_eq!(wm.window_stack_get_top_window(), Some(b));
        assert!(!wm.window_is_loaded(a));
        assert!(wm.window_is_loaded(b));

        assert_eq!(wm.window_stack_pop(true), Some(b));
        assert_eq!(wm.window_stack_get_top_window(), Some(a));

        assert_eq!(
            log.borrow().as_slice(),
            &["a.load", "a.unload", "b.load", "b.unload", "a.load"]
        );
    }

    #[test]
    fn test_push_existing_window_moves_it_to_top() {
        let mut wm = WindowManager::default();
        let a = wm.window_create().unwrap();
        let b = wm.window_create().unwrap();

        wm.window_stack_push(a, false).unwrap();
        wm.window_stack_push(b, false).unwrap();
        wm.window_stack_push(a, false).unwrap();

        assert_eq!(wm.window_stack_count(), 2);
        assert_eq!(wm.window_stack_get_top_window(), Some(a));
        assert!(wm.window_is_loaded(a));
        assert!(!wm.window_is_loaded(b));
    }

    #[test]
    fn test_stack_full() {
        let mut wm = WindowManager::default();
        for _ in 0..MAX_WINDOW_STACK {
            let id = wm.window_create().unwrap();
            wm.window_stack_push(id, false).unwrap();
        }
        let top = wm.window_stack_get_top_window();
        let extra = wm.window_create().unwrap();

        assert_eq!(
            wm.window_stack_push(extra, false),
            Err(UiError::StackFull {
                max: MAX_WINDOW_STACK
            })
        );
        assert_eq!(wm.window_stack_get_top_window(), top);
        assert!(!wm.window_is_loaded(extra));
    }

    #[test]
    fn test_remove_non_top_keeps_active_window() {
        let mut wm = WindowManager::default();
        let log: Log = Rc::default();
        let a = window_with_log(&mut wm, &log, "a.load", "a.unload");
        let b = window_with_log(&mut wm, &log, "b.load", "b.unload");
        wm.window_stack_push(a, false).unwrap();
        wm.window_stack_push(b, false).unwrap();
        log.borrow_mut().clear();

        assert!(wm.window_stack_remove(a, false));
        assert!(!wm.window_stack_contains_window(a));
        assert_eq!(wm.window_stack_get_top_window(), Some(b));
        assert!(log.borrow().is_empty());

        assert!(!wm.window_stack_remove(a, false));
    }

    #[test]
    fn test_destroy_top_window_unloads_and_activates_next() {
        let mut wm = WindowManager::default();
        let log: Log = Rc::default();
        let a = window_with_log(&mut wm, &log, "a.load", "a.unload");
        let b = window_with_log(&mut wm, &log, "b.load", "b.unload");
        wm.window_stack_push(a, false).unwrap();
        wm.window_stack_push(b, false).unwrap();
        log.borrow_mut().clear();

        wm.window_destroy(b);

        assert_eq!(log.borrow().as_slice(), &["b.unload", "a.load"]);
        assert_eq!(wm.window_stack_get_top_window(), Some(a));
    }

    struct SelfDestruct;

    impl WindowHandlers for SelfDestruct {
        fn unload(&mut self, wm: &mut WindowManager, window: WindowId) {
            wm.window_destroy(window);
        }
    }

    #[test]
    fn test_unload_handler_may_destroy_its_window() {
        let mut wm = WindowManager::default();
        let a = wm.window_create().unwrap();
        let b = wm.window_create().unwrap();
        wm.window_set_window_handlers(b, SelfDestruct);
        wm.window_stack_push(a, false).unwrap();
        wm.window_stack_push(b, false).unwrap();

        assert_eq!(wm.window_stack_pop(false), Some(b));

        assert!(wm.window(b).is_none());
        assert_eq!(wm.window_stack_get_top_window(), Some(a));
        assert_eq!(wm.layers().len(), 1);
    }

    #[test]
    fn test_load_proc_is_idempotent() {
        let mut wm = WindowManager::default();
        let log: Log = Rc::default();
        let a = window_with_log(&mut wm, &log, "a.load", "a.unload");
        wm.window_stack_push(a, false).unwrap();

        wm.window_load_proc();
        wm.window_load_proc();

        assert_eq!(log.borrow().as_slice(), &["a.load"]);
    }

    #[test]
    fn test_click_config_installed_when_window_becomes_top() {
        let mut wm = WindowManager::default();
        let a = wm.window_create().unwrap();
        wm.window_set_click_config_provider(a, select_provider);
        assert!(
            wm.window(a)
                .unwrap()
                .click_config()
                .subscription(ButtonId::Select)
                .is_empty()
        );

        wm.window_stack_push(a, false).unwrap();

        let config = wm.window(a).unwrap().click_config();
        assert!(!config.subscription(ButtonId::Select).is_empty());
        assert!(config.subscription(ButtonId::Back).is_empty());
    }

    #[test]
    fn test_provider_context_defaults_to_window() {
        let mut wm = WindowManager::default();
        let a = wm.window_create().unwrap();
        wm.window_set_click_config_provider(a, select_provider);
        assert_eq!(wm.window_get_click_config_context(a), None);

        wm.window_set_click_config_provider_with_context(a, select_provider, ClickContext::Value(3));
        assert_eq!(
            wm.window_get_click_config_context(a),
            Some(ClickContext::Value(3))
        );
    }

    #[test]
    fn test_user_data_roundtrip_by_type() {
        let mut wm = WindowManager::default();
        let a = wm.window_create().unwrap();

        wm.window_set_user_data(a, 41u32);
        *wm.window_user_data_mut::<u32>(a).unwrap() += 1;

        assert_eq!(wm.window_user_data::<u32>(a), Some(&42));
        assert_eq!(wm.window_user_data::<i64>(a), None);
    }

    #[test]
    fn test_push_schedules_draw() {
        let mut wm = WindowManager::default();
        let a = wm.window_create().unwrap();

        wm.window_stack_push(a, false).unwrap();

        assert!(wm.window_is_render_scheduled(a));
        assert_eq!(wm.try_next_message(), Some(AppMessage::Draw));
        assert_eq!(wm.try_next_message(), None);
    }
}
