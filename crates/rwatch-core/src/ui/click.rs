//! Click configuration and recognition.
//!
//! A window's click-config provider fills a [`ClickConfig`], the window's own
//! per-button subscription table, when the window becomes the top of the
//! stack. Raw button edges and ticks then run through a small per-button
//! state machine ([`ButtonRecognizer`]) that decides which subscribed handlers
//! fire:
//!
//! | Subscription       | Fires                                            |
//! |--------------------|--------------------------------------------------|
//! | single             | on release                                       |
//! | single, repeating  | on press, then every interval while held         |
//! | multi              | per click in `[min, max]`, or once after timeout |
//! | long               | down handler after the delay, up on release      |
//! | raw                | on every press and release                       |
//!
//! A release that ends a long click fires neither single nor multi handlers.

use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::config::ClickTiming;
use crate::ui::core::{ButtonId, ClickContext};
use crate::ui::window_manager::WindowManager;

/// Handler invoked when a subscribed click is recognized.
pub type ClickHandler = fn(&mut WindowManager, &ClickRecognizer);

/// Window callback that performs the button subscriptions.
pub type ClickConfigProvider = fn(&mut ClickConfig, ClickContext);

/// What a click handler learns about the click that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickRecognizer {
    button: ButtonId,
    click_count: u8,
    is_repeating: bool,
    context: ClickContext,
}

impl ClickRecognizer {
    pub(crate) fn new(
        button: ButtonId,
        click_count: u8,
        is_repeating: bool,
        context: ClickContext,
    ) -> Self {
        Self {
            button,
            click_count,
            is_repeating,
            context,
        }
    }

    pub fn button(&self) -> ButtonId {
        self.button
    }

    /// Clicks counted so far (multi-click count or repeat number).
    pub fn click_count(&self) -> u8 {
        self.click_count
    }

    pub fn is_repeating(&self) -> bool {
        self.is_repeating
    }

    pub fn context(&self) -> ClickContext {
        self.context
    }
}

#[derive(Clone, Copy)]
pub struct SingleClick {
    pub handler: ClickHandler,
    /// `Some` for repeating subscriptions.
    pub repeat_interval: Option<Duration>,
}

#[derive(Clone, Copy)]
pub struct MultiClick {
    pub handler: ClickHandler,
    pub min_clicks: u8,
    pub max_clicks: u8,
    pub timeout: Duration,
    pub last_click_only: bool,
}

#[derive(Clone, Copy)]
pub struct LongClick {
    pub delay: Duration,
    pub down: Option<ClickHandler>,
    pub up: Option<ClickHandler>,
}

#[derive(Clone, Copy)]
pub struct RawClick {
    pub down: Option<ClickHandler>,
    pub up: Option<ClickHandler>,
}

/// Everything subscribed on one button.
#[derive(Clone, Copy, Default)]
pub struct ButtonSubscription {
    pub single: Option<SingleClick>,
    pub multi: Option<MultiClick>,
    pub long: Option<LongClick>,
    pub raw: Option<RawClick>,
    /// Overrides the window's click context for this button.
    pub context: Option<ClickContext>,
}

impl ButtonSubscription {
    /// No handler of any kind is subscribed.
    pub fn is_empty(&self) -> bool {
        self.single.is_none() && self.multi.is_none() && self.long.is_none() && self.raw.is_none()
    }
}

/// Per-window button subscription table.
///
/// Subscribing twice to the same kind on the same button replaces the first
/// subscription.
#[derive(Clone, Copy)]
pub struct ClickConfig {
    buttons: [ButtonSubscription; ButtonId::COUNT],
    timing: ClickTiming,
}

impl ClickConfig {
    pub fn new(timing: ClickTiming) -> Self {
        Self {
            buttons: [ButtonSubscription::default(); ButtonId::COUNT],
            timing,
        }
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.buttons = [ButtonSubscription::default(); ButtonId::COUNT];
    }

    pub fn subscription(&self, button: ButtonId) -> &ButtonSubscription {
        &self.buttons[button.index()]
    }

    fn subscription_mut(&mut self, button: ButtonId) -> &mut ButtonSubscription {
        &mut self.buttons[button.index()]
    }

    /// Fire `handler` when `button` is pressed and released.
    pub fn single_click_subscribe(&mut self, button: ButtonId, handler: ClickHandler) {
        self.subscription_mut(button).single = Some(SingleClick {
            handler,
            repeat_interval: None,
        });
    }

    /// Fire `handler` on press and then every `repeat_interval` while held.
    ///
    /// A zero interval subscribes a plain single click.
    pub fn single_repeating_click_subscribe(
        &mut self,
        button: ButtonId,
        repeat_interval: Duration,
        handler: ClickHandler,
    ) {
        let repeat_interval = (repeat_interval > Duration::from_ticks(0)).then_some(repeat_interval);
        self.subscription_mut(button).single = Some(SingleClick {
            handler,
            repeat_interval,
        });
    }

    /// Fire `handler` for click sequences of `min_clicks..=max_clicks`.
    ///
    /// Zero values take the configured defaults: `min_clicks` from
    /// [`ClickTiming`], `max_clicks` = `min_clicks`, `timeout` from
    /// [`ClickTiming`]. With `last_click_only` the handler fires once per
    /// sequence, when it ends (timeout or `max_clicks` reached).
    pub fn multi_click_subscribe(
        &mut self,
        button: ButtonId,
        min_clicks: u8,
        max_clicks: u8,
        timeout: Duration,
        last_click_only: bool,
        handler: ClickHandler,
    ) {
        let min_clicks = if min_clicks == 0 {
            self.timing.multi_click_min
        } else {
            min_clicks
        };
        let max_clicks = max_clicks.max(min_clicks);
        let timeout = if timeout == Duration::from_ticks(0) {
            self.timing.multi_click_timeout()
        } else {
            timeout
        };

        self.subscription_mut(button).multi = Some(MultiClick {
            handler,
            min_clicks,
            max_clicks,
            timeout,
            last_click_only,
        });
    }

    /// Fire `down` once the button has been held for `delay`, and `up` when
    /// it is released after that. A zero delay takes the configured default.
    pub fn long_click_subscribe(
        &mut self,
        button: ButtonId,
        delay: Duration,
        down: Option<ClickHandler>,
        up: Option<ClickHandler>,
    ) {
        let delay = if delay == Duration::from_ticks(0) {
            self.timing.long_click_delay()
        } else {
            delay
        };
        self.subscription_mut(button).long = Some(LongClick { delay, down, up });
    }

    /// Fire `down`/`up` on every raw edge. A given context also becomes the
    /// button's click context.
    pub fn raw_click_subscribe(
        &mut self,
        button: ButtonId,
        down: Option<ClickHandler>,
        up: Option<ClickHandler>,
        context: Option<ClickContext>,
    ) {
        let subscription = self.subscription_mut(button);
        subscription.raw = Some(RawClick { down, up });
        if context.is_some() {
            subscription.context = context;
        }
    }

    /// Override the context handed to this button's handlers.
    pub fn set_click_context(&mut self, button: ButtonId, context: ClickContext) {
        self.subscription_mut(button).context = Some(context);
    }
}

/// A handler the recognizer decided to fire.
#[derive(Clone, Copy)]
pub(crate) struct ClickFire {
    pub handler: ClickHandler,
    pub click_count: u8,
    pub is_repeating: bool,
}

/// Handlers fired by a single event; at most raw + long down + long up.
pub(crate) type Fires = Vec<ClickFire, 4>;

fn fire(out: &mut Fires, handler: ClickHandler, click_count: u8, is_repeating: bool) {
    out.push(ClickFire {
        handler,
        click_count,
        is_repeating,
    })
    .ok();
}

/// Recognition state of one button of the active window.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ButtonRecognizer {
    pressed_at: Option<Instant>,
    last_repeat_at: Option<Instant>,
    repeat_count: u8,
    long_fired: bool,
    click_count: u8,
    last_up_at: Option<Instant>,
}

impl ButtonRecognizer {
    pub(crate) fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub(crate) fn on_down(&mut self, sub: &ButtonSubscription, at: Instant, out: &mut Fires) {
        if let Some(RawClick {
            down: Some(handler),
            ..
        }) = sub.raw
        {
            fire(out, handler, 1, false);
        }

        self.expire_sequence(sub, at, out);

        self.pressed_at = Some(at);
        self.long_fired = false;
        self.repeat_count = 0;
        self.last_repeat_at = None;

        if let Some(SingleClick {
            handler,
            repeat_interval: Some(_),
        }) = sub.single
        {
            self.repeat_count = 1;
            self.last_repeat_at = Some(at);
            fire(out, handler, 1, false);
        }
    }

    pub(crate) fn on_tick(&mut self, sub: &ButtonSubscription, now: Instant, out: &mut Fires) {
        let Some(pressed_at) = self.pressed_at else {
            self.expire_sequence(sub, now, out);
            return;
        };

        if let Some(long) = sub.long
            && !self.long_fired
            && now.saturating_duration_since(pressed_at) >= long.delay
        {
            self.long_fired = true;
            if let Some(handler) = long.down {
                fire(out, handler, 1, false);
            }
        }

        if let Some(SingleClick {
            handler,
            repeat_interval: Some(interval),
        }) = sub.single
            && let Some(last) = self.last_repeat_at
            && now.saturating_duration_since(last) >= interval
        {
            self.repeat_count = self.repeat_count.saturating_add(1);
            self.last_repeat_at = Some(now);
            fire(out, handler, self.repeat_count, true);
        }
    }

    pub(crate) fn on_up(&mut self, sub: &ButtonSubscription, at: Instant, out: &mut Fires) {
        if let Some(RawClick {
            up: Some(handler), ..
        }) = sub.raw
        {
            fire(out, handler, 1, false);
        }

        // A release without a recognized press (e.g. pressed on another window).
        let Some(pressed_at) = self.pressed_at.take() else {
            return;
        };
        self.last_repeat_at = None;

        if let Some(long) = sub.long {
            if !self.long_fired && at.saturating_duration_since(pressed_at) >= long.delay {
                self.long_fired = true;
                if let Some(handler) = long.down {
                    fire(out, handler, 1, false);
                }
            }
            if self.long_fired {
                self.long_fired = false;
                if let Some(handler) = long.up {
                    fire(out, handler, 1, false);
                }
                return;
            }
        }

        if let Some(SingleClick {
            handler,
            repeat_interval: None,
        }) = sub.single
        {
            fire(out, handler, 1, false);
        }

        if let Some(multi) = sub.multi {
            self.click_count = self.click_count.saturating_add(1);
            self.last_up_at = Some(at);
            let count = self.click_count;

            if count >= multi.max_clicks {
                fire(out, multi.handler, count, false);
                self.click_count = 0;
                self.last_up_at = None;
            } else if !multi.last_click_only && count >= multi.min_clicks {
                fire(out, multi.handler, count, false);
            }
        }
    }

    /// End a multi-click sequence that has been idle for its timeout.
    fn expire_sequence(&mut self, sub: &ButtonSubscription, now: Instant, out: &mut Fires) {
        let (Some(multi), Some(last_up)) = (sub.multi, self.last_up_at) else {
            return;
        };
        if now.saturating_duration_since(last_up) < multi.timeout {
            return;
        }
        if multi.last_click_only && self.click_count >= multi.min_clicks {
            fire(out, multi.handler, self.click_count, false);
        }
        self.click_count = 0;
        self.last_up_at = None;
    }
}
