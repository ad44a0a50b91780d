//! Timeline: a window showing one event at a time from a fixed list.
//!
//! Up/Down step through the events. Back uses the default behavior (pop);
//! the window destroys itself once it has left the stack.

extern crate alloc;

use alloc::rc::Rc;
use core::cell::RefCell;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_7X13_BOLD};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;
use heapless::{String, Vec};
use log::{debug, warn};
use thiserror_no_std::Error;

use crate::error::UiResult;
use crate::graphics::GContext;
use crate::ui::click::{ClickConfig, ClickRecognizer};
use crate::ui::colors::{BLACK, ISLAMIC_GREEN, RED, VIVID_CERULEAN, WHITE};
use crate::ui::core::{ButtonId, ClickContext};
use crate::ui::layer::{LayerId, LayerInfo};
use crate::ui::window::{WindowHandlers, WindowId};
use crate::ui::window_manager::WindowManager;

/// Maximum number of events a timeline holds.
pub const MAX_TIMELINE_EVENTS: usize = 8;

pub const TITLE_CAPACITY: usize = 32;
pub const DESCRIPTION_CAPACITY: usize = 128;

/// Width of the colored bar on the right edge.
const SIDEBAR_WIDTH: u32 = 25;
const TITLE_HEIGHT: u32 = 36;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Timeline is full (max: {max})")]
    Full { max: usize },

    #[error("Event text does not fit")]
    TextTooLong,
}

/// A calendar date (day and month are 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl Date {
    pub const fn new(day: u8, month: u8, year: u16) -> Self {
        Self { year, month, day }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    pub title: String<TITLE_CAPACITY>,
    pub description: String<DESCRIPTION_CAPACITY>,
    pub date: Date,
    pub color: Rgb565,
}

impl TimelineEvent {
    pub fn new(
        title: &str,
        description: &str,
        date: Date,
        color: Rgb565,
    ) -> Result<Self, TimelineError> {
        Ok(Self {
            title: String::try_from(title).map_err(|_| TimelineError::TextTooLong)?,
            description: String::try_from(description).map_err(|_| TimelineError::TextTooLong)?,
            date,
            color,
        })
    }
}

/// Fixed-capacity list of events in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineEvents {
    events: Vec<TimelineEvent, MAX_TIMELINE_EVENTS>,
}

impl TimelineEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Fails with [`TimelineError::Full`] at capacity.
    pub fn add(&mut self, event: TimelineEvent) -> Result<(), TimelineError> {
        self.events.push(event).map_err(|_| TimelineError::Full {
            max: MAX_TIMELINE_EVENTS,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TimelineEvent> {
        self.events.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter()
    }

    /// First event on the given date.
    pub fn on_date(&self, date: Date) -> Option<&TimelineEvent> {
        self.events.iter().find(|event| event.date == date)
    }

    /// The events of one month, in order.
    pub fn in_month(&self, month: u8, year: u16) -> Self {
        let mut events = Vec::new();
        for event in self
            .events
            .iter()
            .filter(|event| event.date.month == month && event.date.year == year)
        {
            // Same capacity as `self`, so this cannot overflow.
            events.push(event.clone()).ok();
        }
        Self { events }
    }
}

const DEMO_EVENTS: [(&str, &str, Date, Rgb565); 3] = [
    (
        "RWS Launch\n5:00pm",
        "Organizer: Katharine Berry\nInvitees: Rebblers\n\nEveryone will be there.\nYou should too!",
        Date::new(1, 1, 2018),
        RED,
    ),
    ("Meeting\n6:00pm", "Other content", Date::new(10, 1, 2018), VIVID_CERULEAN),
    (
        "RebbleOS\n7:00pm",
        "This is a ways away",
        Date::new(23, 1, 2018),
        ISLAMIC_GREEN,
    ),
];

/// The sample events shown by the demo apps (January 2018).
pub fn demo_events() -> TimelineEvents {
    let mut events = TimelineEvents::new();
    for (title, description, date, color) in DEMO_EVENTS {
        let added = TimelineEvent::new(title, description, date, color)
            .and_then(|event| events.add(event));
        if let Err(err) = added {
            warn!("Skipping demo event {:?}: {}", title, err);
        }
    }
    events
}

struct TimelineState {
    events: TimelineEvents,
    selected: usize,
}

type SharedTimeline = Rc<RefCell<TimelineState>>;

struct TimelineHandlers {
    state: SharedTimeline,
    layer: Option<LayerId>,
}

impl WindowHandlers for TimelineHandlers {
    fn load(&mut self, wm: &mut WindowManager, window: WindowId) {
        let Some(root) = wm.window_get_root_layer(window) else {
            return;
        };
        let Some(frame) = wm.layers().bounds(root) else {
            return;
        };

        let layer = match wm.layers_mut().create(frame) {
            Ok(layer) => layer,
            Err(err) => {
                warn!("Timeline layer not created: {}", err);
                return;
            }
        };
        let state = self.state.clone();
        wm.layers_mut()
            .set_update_proc(layer, move |info: &LayerInfo, ctx: &mut GContext| {
                draw_event(&state.borrow(), info, ctx);
            });
        if let Err(err) = wm.layers_mut().add_child(root, layer) {
            warn!("Timeline layer not attached: {}", err);
            wm.layers_mut().destroy(layer);
            return;
        }
        self.layer = Some(layer);
    }

    fn unload(&mut self, wm: &mut WindowManager, window: WindowId) {
        if let Some(layer) = self.layer.take() {
            wm.layers_mut().destroy(layer);
        }
        if !wm.window_stack_contains_window(window) {
            debug!("Timeline {:?} left the stack, destroying", window);
            wm.window_destroy(window);
        }
    }
}

fn draw_event(state: &TimelineState, info: &LayerInfo, ctx: &mut GContext) {
    let bounds = info.bounds;
    let width = bounds.size.width;
    let height = bounds.size.height;

    ctx.set_fill_color(WHITE);
    ctx.fill_rect(bounds);
    ctx.set_text_color(BLACK);

    let Some(event) = state.events.get(state.selected) else {
        ctx.draw_text("No events", &FONT_7X13_BOLD, bounds, Alignment::Center);
        return;
    };

    let bar_x = width.saturating_sub(SIDEBAR_WIDTH) as i32;
    ctx.set_fill_color(event.color);
    ctx.fill_rect(Rectangle::new(
        Point::new(bar_x, 0),
        Size::new(SIDEBAR_WIDTH, height),
    ));
    ctx.fill_path(&[
        Point::new(bar_x, 5),
        Point::new(bar_x, 25),
        Point::new(bar_x - 5, 15),
    ]);

    let text_width = width.saturating_sub(SIDEBAR_WIDTH);
    ctx.draw_text(
        &event.title,
        &FONT_7X13_BOLD,
        Rectangle::new(bounds.top_left, Size::new(text_width, TITLE_HEIGHT)),
        Alignment::Left,
    );
    ctx.draw_text(
        &event.description,
        &FONT_6X10,
        Rectangle::new(
            bounds.top_left + Point::new(0, TITLE_HEIGHT as i32),
            Size::new(text_width, height.saturating_sub(TITLE_HEIGHT)),
        ),
        Alignment::Left,
    );
}

fn timeline_state(
    wm: &WindowManager,
    recognizer: &ClickRecognizer,
) -> Option<(WindowId, SharedTimeline)> {
    let ClickContext::Window(window) = recognizer.context() else {
        return None;
    };
    let state = wm.window_user_data::<SharedTimeline>(window)?.clone();
    Some((window, state))
}

fn select_previous(wm: &mut WindowManager, recognizer: &ClickRecognizer) {
    let Some((_, state)) = timeline_state(wm, recognizer) else {
        return;
    };
    {
        let mut state = state.borrow_mut();
        state.selected = state.selected.saturating_sub(1);
    }
    wm.window_dirty(true);
}

fn select_next(wm: &mut WindowManager, recognizer: &ClickRecognizer) {
    let Some((_, state)) = timeline_state(wm, recognizer) else {
        return;
    };
    {
        let mut state = state.borrow_mut();
        if state.selected + 1 < state.events.len() {
            state.selected += 1;
        }
    }
    wm.window_dirty(true);
}

fn timeline_click_config(config: &mut ClickConfig, _context: ClickContext) {
    config.single_click_subscribe(ButtonId::Up, select_previous);
    config.single_click_subscribe(ButtonId::Down, select_next);
}

/// Create a timeline window for `events` without pushing it.
pub fn timeline_window_create(
    wm: &mut WindowManager,
    events: TimelineEvents,
) -> UiResult<WindowId> {
    let window = wm.window_create()?;
    let state = Rc::new(RefCell::new(TimelineState {
        events,
        selected: 0,
    }));

    wm.window_set_user_data(window, state.clone());
    wm.window_set_window_handlers(window, TimelineHandlers { state, layer: None });
    wm.window_set_click_config_provider(window, timeline_click_config);
    Ok(window)
}

/// Create a timeline window and make it the active window.
pub fn push_timeline(wm: &mut WindowManager, events: TimelineEvents) -> UiResult<WindowId> {
    let window = timeline_window_create(wm, events)?;
    if let Err(err) = wm.window_stack_push(window, true) {
        wm.window_destroy(window);
        return Err(err);
    }
    Ok(window)
}

/// Index of the event currently shown, `None` for a stale window.
pub fn selected_event(wm: &WindowManager, window: WindowId) -> Option<usize> {
    wm.window_user_data::<SharedTimeline>(window)
        .map(|state| state.borrow().selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingDisplay;
    use crate::ui::core::ButtonEvent;
    use embassy_time::Instant;

    fn press(wm: &mut WindowManager, button: ButtonId, at: u64) {
        wm.handle_button(ButtonEvent::down(button, Instant::from_millis(at)));
        wm.handle_button(ButtonEvent::up(button, Instant::from_millis(at + 20)));
    }

    #[test]
    fn test_demo_events() {
        let events = demo_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events.get(0).unwrap().title.as_str(), "RWS Launch\n5:00pm");
        assert_eq!(
            events.on_date(Date::new(10, 1, 2018)).unwrap().color,
            VIVID_CERULEAN
        );
        assert!(events.on_date(Date::new(11, 1, 2018)).is_none());
    }

    #[test]
    fn test_add_past_capacity_fails() {
        let mut events = TimelineEvents::new();
        let event = TimelineEvent::new("a", "b", Date::new(1, 1, 2018), RED).unwrap();
        for _ in 0..MAX_TIMELINE_EVENTS {
            events.add(event.clone()).unwrap();
        }

        assert_eq!(
            events.add(event),
            Err(TimelineError::Full {
                max: MAX_TIMELINE_EVENTS
            })
        );
    }

    #[test]
    fn test_text_too_long() {
        let long = [b'x'; TITLE_CAPACITY + 1];
        let title = core::str::from_utf8(&long).unwrap();

        assert_eq!(
            TimelineEvent::new(title, "", Date::new(1, 1, 2018), RED),
            Err(TimelineError::TextTooLong)
        );
    }

    #[test]
    fn test_in_month_filters() {
        let mut events = demo_events();
        events
            .add(TimelineEvent::new("Later", "", Date::new(2, 2, 2018), RED).unwrap())
            .unwrap();

        assert_eq!(events.in_month(1, 2018).len(), 3);
        assert_eq!(events.in_month(2, 2018).len(), 1);
        assert!(events.in_month(1, 2019).is_empty());
    }

    #[test]
    fn test_up_down_move_selection_within_bounds() {
        let mut wm = WindowManager::default();
        let window = push_timeline(&mut wm, demo_events()).unwrap();

        press(&mut wm, ButtonId::Up, 0);
        assert_eq!(selected_event(&wm, window), Some(0));

        for i in 0..5 {
            press(&mut wm, ButtonId::Down, 100 + i * 100);
        }
        assert_eq!(selected_event(&wm, window), Some(2));
    }

    #[test]
    fn test_draws_selected_event_with_color_bar() {
        let mut wm = WindowManager::default();
        push_timeline(&mut wm, demo_events()).unwrap();
        let mut display = RecordingDisplay::new();

        assert_eq!(wm.draw(&mut display), Ok(true));
        assert_eq!(display.pixel(Point::new(143, 100)), Some(RED));

        press(&mut wm, ButtonId::Down, 0);
        wm.draw(&mut display).unwrap();
        assert_eq!(display.pixel(Point::new(143, 100)), Some(VIVID_CERULEAN));
    }

    #[test]
    fn test_back_pops_and_destroys_timeline() {
        let mut wm = WindowManager::default();
        let calendar = wm.window_create().unwrap();
        wm.window_stack_push(calendar, false).unwrap();
        let timeline = push_timeline(&mut wm, demo_events()).unwrap();
        let layers_with_timeline = wm.layers().len();
        assert_eq!(layers_with_timeline, 3);

        press(&mut wm, ButtonId::Back, 0);

        assert!(wm.window(timeline).is_none());
        assert_eq!(wm.window_stack_get_top_window(), Some(calendar));
        assert_eq!(wm.layers().len(), 1);
    }

    #[test]
    fn test_empty_timeline_draws_placeholder() {
        let mut wm = WindowManager::default();
        let window = push_timeline(&mut wm, TimelineEvents::new()).unwrap();
        let mut display = RecordingDisplay::new();

        press(&mut wm, ButtonId::Down, 0);
        assert_eq!(selected_event(&wm, window), Some(0));
        assert_eq!(wm.draw(&mut display), Ok(true));
        assert_eq!(display.pixel(Point::new(143, 100)), Some(WHITE));
    }
}
