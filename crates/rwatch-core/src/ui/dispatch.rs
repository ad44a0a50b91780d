//! App message queue and button dispatch.
//!
//! Hosts feed [`AppMessage`]s into the manager's queue (button edges from an
//! input task or ISR, ticks from a timer) and drain it either synchronously
//! with [`WindowManager::process_pending`] or with the async
//! [`WindowManager::run`] loop.

use core::ops::ControlFlow;
use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use log::{debug, info, warn};

use crate::ui::click::{ClickRecognizer, Fires};
use crate::ui::core::{AppMessage, ButtonAction, ButtonEvent, ButtonId, ClickContext};
use crate::ui::window::WindowId;
use crate::ui::window_manager::WindowManager;

impl WindowManager {
    /// Queue a message. Returns `false` if the queue is full.
    pub fn post_message(&self, message: AppMessage) -> bool {
        match self.queue.try_send(message) {
            Ok(()) => true,
            Err(_) => {
                warn!("App queue full, dropping {:?}", message);
                false
            }
        }
    }

    pub fn post_button_event(&self, event: ButtonEvent) -> bool {
        self.post_message(AppMessage::Button(event))
    }

    pub fn post_tick(&self, now: Instant) -> bool {
        self.post_message(AppMessage::Tick(now))
    }

    /// Ask the run loop to stop.
    pub fn request_quit(&self) -> bool {
        self.post_message(AppMessage::Quit)
    }

    pub fn try_next_message(&self) -> Option<AppMessage> {
        self.queue.try_receive().ok()
    }

    /// Route a raw button edge to the top window's click handlers.
    ///
    /// Without any Back subscription on the top window, releasing Back pops
    /// the window; popping the last window requests quit.
    pub fn handle_button(&mut self, event: ButtonEvent) {
        let Some(top) = self.window_stack_get_top_window() else {
            debug!("Button {:?} with no active window", event.button);
            return;
        };
        let Some(window) = self.windows.get(top) else {
            return;
        };
        let subscription = *window.click_config.subscription(event.button);

        if event.button == ButtonId::Back && subscription.is_empty() {
            if event.action == ButtonAction::Up {
                self.default_back();
            }
            return;
        }

        let context = subscription
            .context
            .unwrap_or_else(|| window.effective_click_context(top));

        let mut fires = Fires::new();
        let recognizer = &mut self.recognizers[event.button.index()];
        match event.action {
            ButtonAction::Down => recognizer.on_down(&subscription, event.at, &mut fires),
            ButtonAction::Up => recognizer.on_up(&subscription, event.at, &mut fires),
        }

        self.invoke(top, event.button, context, &fires);
    }

    /// Advance click timing: long presses, repeats and multi-click timeouts.
    pub fn tick(&mut self, now: Instant) {
        for button in ButtonId::ALL {
            let Some(top) = self.window_stack_get_top_window() else {
                return;
            };
            let Some(window) = self.windows.get(top) else {
                return;
            };
            let subscription = *window.click_config.subscription(button);
            if subscription.is_empty() {
                continue;
            }
            let context = subscription
                .context
                .unwrap_or_else(|| window.effective_click_context(top));

            let mut fires = Fires::new();
            self.recognizers[button.index()].on_tick(&subscription, now, &mut fires);
            self.invoke(top, button, context, &fires);
        }
    }

    fn invoke(&mut self, top: WindowId, button: ButtonId, context: ClickContext, fires: &Fires) {
        for fire in fires {
            // A handler that changed the stack ends this click.
            if self.window_stack_get_top_window() != Some(top) {
                debug!("Active window changed, dropping remaining {:?} clicks", button);
                return;
            }
            let recognizer =
                ClickRecognizer::new(button, fire.click_count, fire.is_repeating, context);
            (fire.handler)(self, &recognizer);
        }
    }

    fn default_back(&mut self) {
        if let Some(popped) = self.window_stack_pop(true) {
            info!("Back: popped {:?}", popped);
        }
        if self.stack.is_empty() {
            info!("Window stack empty, quitting");
            self.request_quit();
        }
    }

    /// Handle one message. Returns `Break` for [`AppMessage::Quit`].
    pub fn dispatch_message<D>(
        &mut self,
        message: AppMessage,
        display: &mut D,
    ) -> Result<ControlFlow<()>, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        match message {
            AppMessage::Draw => {
                self.draw(display)?;
            }
            AppMessage::Button(event) => self.handle_button(event),
            AppMessage::Tick(now) => self.tick(now),
            AppMessage::Quit => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Drain every queued message without waiting, including messages posted
    /// by the handlers that run.
    pub fn process_pending<D>(&mut self, display: &mut D) -> Result<ControlFlow<()>, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        while let Some(message) = self.try_next_message() {
            if self.dispatch_message(message, display)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Run the app loop until [`AppMessage::Quit`] is received.
    pub async fn run<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        info!("App loop started");
        loop {
            let message = self.queue.receive().await;
            if self.dispatch_message(message, display)?.is_break() {
                info!("App loop finished");
                return Ok(());
            }
        }
    }
}
