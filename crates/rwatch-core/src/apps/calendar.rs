//! Calendar: a month grid.
//!
//! Up/Down move to the previous/next month (and repeat while held), Select
//! opens the timeline with the shown month's events, Back pops (default
//! behavior). Days with an event are filled with the event's color.

extern crate alloc;

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::Write;
use embassy_time::Duration;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_7X13_BOLD};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::Alignment;
use heapless::String;
use log::{info, warn};

use crate::apps::timeline::{Date, TimelineEvents, demo_events, push_timeline};
use crate::error::UiResult;
use crate::graphics::GContext;
use crate::ui::click::{ClickConfig, ClickRecognizer};
use crate::ui::colors::{BLACK, LIGHT_GRAY, WHITE};
use crate::ui::core::{ButtonId, ClickContext};
use crate::ui::layer::{LayerId, LayerInfo};
use crate::ui::window::{WindowHandlers, WindowId};
use crate::ui::window_manager::WindowManager;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_INITIALS: [&str; 7] = ["S", "M", "T", "W", "T", "F", "S"];

const HEADER_HEIGHT: i32 = 24;
const GRID_TOP: i32 = 36;
const MONTH_REPEAT_INTERVAL: Duration = Duration::from_millis(400);

pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12); 0 for an invalid month.
pub fn days_in_month(month: u8, year: u16) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        1..=12 => 31,
        _ => 0,
    }
}

/// Day of the week (0 = Sunday) by Zeller's congruence.
pub fn weekday(day: u8, month: u8, year: u16) -> u8 {
    // January and February count as months 13 and 14 of the previous year.
    let (m, y) = if month <= 2 {
        (month as i32 + 12, year as i32 - 1)
    } else {
        (month as i32, year as i32)
    };
    let h = (day as i32 + (13 * (m + 1)) / 5 + y + y / 4 - y / 100 + y / 400) % 7;
    // Zeller counts from Saturday.
    ((h + 6) % 7) as u8
}

/// Month and year following `month`/`year`.
fn next_month(month: u8, year: u16) -> (u8, u16) {
    if month >= 12 {
        (1, year.saturating_add(1))
    } else {
        (month + 1, year)
    }
}

fn previous_month(month: u8, year: u16) -> (u8, u16) {
    if month <= 1 {
        (12, year.saturating_sub(1))
    } else {
        (month - 1, year)
    }
}

/// The month shown by a calendar window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarState {
    pub year: u16,
    pub month: u8,
    pub events: TimelineEvents,
}

impl CalendarState {
    pub fn new(month: u8, year: u16, events: TimelineEvents) -> Self {
        Self {
            year,
            month: month.clamp(1, 12),
            events,
        }
    }

    pub fn days(&self) -> u8 {
        days_in_month(self.month, self.year)
    }

    /// Blank cells before the 1st (weekday of the 1st, Sunday first).
    pub fn leading_days(&self) -> u8 {
        weekday(1, self.month, self.year)
    }

    pub fn advance(&mut self) {
        (self.month, self.year) = next_month(self.month, self.year);
    }

    pub fn go_back(&mut self) {
        (self.month, self.year) = previous_month(self.month, self.year);
    }
}

type SharedCalendar = Rc<RefCell<CalendarState>>;

/// Header text such as "January 2018".
fn month_title(month: u8, year: u16) -> String<24> {
    // The longest month name plus a five-digit year fits.
    let mut title = String::new();
    let name = MONTH_NAMES[(month as usize).saturating_sub(1) % 12];
    write!(title, "{} {}", name, year).ok();
    title
}

fn draw_month(state: &CalendarState, info: &LayerInfo, ctx: &mut GContext) {
    let bounds = info.bounds;
    let cell = (bounds.size.width / 7) as i32;

    ctx.set_fill_color(WHITE);
    ctx.fill_rect(bounds);
    ctx.set_text_color(BLACK);

    let title = month_title(state.month, state.year);
    ctx.draw_text(
        &title,
        &FONT_7X13_BOLD,
        Rectangle::new(
            bounds.top_left,
            Size::new(bounds.size.width, HEADER_HEIGHT as u32),
        ),
        Alignment::Center,
    );

    for (column, initial) in WEEKDAY_INITIALS.iter().enumerate() {
        let rect = Rectangle::new(
            Point::new(column as i32 * cell, HEADER_HEIGHT),
            Size::new(cell as u32, (GRID_TOP - HEADER_HEIGHT) as u32),
        );
        ctx.draw_text(initial, &FONT_6X10, rect, Alignment::Center);
    }

    let leading = state.leading_days() as i32;
    let (prev_month, prev_year) = previous_month(state.month, state.year);
    let prev_days = days_in_month(prev_month, prev_year) as i32;

    for slot in 0..leading + state.days() as i32 {
        let rect = Rectangle::new(
            Point::new((slot % 7) * cell, GRID_TOP + (slot / 7) * cell),
            Size::new(cell as u32, cell as u32),
        );

        // Day numbers are at most two digits.
        let mut label: String<4> = String::new();
        if slot < leading {
            // Trailing days of the previous month.
            write!(label, "{}", prev_days - leading + slot + 1).ok();
            ctx.set_text_color(LIGHT_GRAY);
        } else {
            let day = (slot - leading + 1) as u8;
            write!(label, "{}", day).ok();
            let event = state.events.on_date(Date::new(day, state.month, state.year));
            match event {
                Some(event) => {
                    ctx.set_fill_color(event.color);
                    ctx.fill_rect(rect);
                    ctx.set_text_color(WHITE);
                }
                None => ctx.set_text_color(BLACK),
            }
        }

        let text_box = Rectangle::new(rect.top_left + Point::new(0, 5), rect.size);
        ctx.draw_text(&label, &FONT_6X10, text_box, Alignment::Center);
    }
}

struct CalendarHandlers {
    state: SharedCalendar,
    grid: Option<LayerId>,
}

impl WindowHandlers for CalendarHandlers {
    fn load(&mut self, wm: &mut WindowManager, window: WindowId) {
        let Some(root) = wm.window_get_root_layer(window) else {
            return;
        };
        let Some(frame) = wm.layers().bounds(root) else {
            return;
        };

        let grid = match wm.layers_mut().create(frame) {
            Ok(grid) => grid,
            Err(err) => {
                warn!("Calendar grid not created: {}", err);
                return;
            }
        };
        let state = self.state.clone();
        wm.layers_mut()
            .set_update_proc(grid, move |info: &LayerInfo, ctx: &mut GContext| {
                draw_month(&state.borrow(), info, ctx);
            });
        if let Err(err) = wm.layers_mut().add_child(root, grid) {
            warn!("Calendar grid not attached: {}", err);
            wm.layers_mut().destroy(grid);
            return;
        }
        self.grid = Some(grid);
    }

    fn unload(&mut self, wm: &mut WindowManager, _window: WindowId) {
        if let Some(grid) = self.grid.take() {
            wm.layers_mut().destroy(grid);
        }
    }
}

fn calendar_state(wm: &WindowManager, recognizer: &ClickRecognizer) -> Option<SharedCalendar> {
    let ClickContext::Window(window) = recognizer.context() else {
        return None;
    };
    wm.window_user_data::<SharedCalendar>(window).cloned()
}

fn show_previous_month(wm: &mut WindowManager, recognizer: &ClickRecognizer) {
    if let Some(state) = calendar_state(wm, recognizer) {
        state.borrow_mut().go_back();
        wm.window_dirty(true);
    }
}

fn show_next_month(wm: &mut WindowManager, recognizer: &ClickRecognizer) {
    if let Some(state) = calendar_state(wm, recognizer) {
        state.borrow_mut().advance();
        wm.window_dirty(true);
    }
}

fn open_timeline(wm: &mut WindowManager, recognizer: &ClickRecognizer) {
    let Some(state) = calendar_state(wm, recognizer) else {
        return;
    };
    let events = {
        let state = state.borrow();
        state.events.in_month(state.month, state.year)
    };
    info!("Opening timeline with {} events", events.len());
    if let Err(err) = push_timeline(wm, events) {
        warn!("Timeline not opened: {}", err);
    }
}

fn calendar_click_config(config: &mut ClickConfig, _context: ClickContext) {
    config.single_repeating_click_subscribe(
        ButtonId::Up,
        MONTH_REPEAT_INTERVAL,
        show_previous_month,
    );
    config.single_repeating_click_subscribe(
        ButtonId::Down,
        MONTH_REPEAT_INTERVAL,
        show_next_month,
    );
    config.single_click_subscribe(ButtonId::Select, open_timeline);
}

/// Create a calendar window showing `month`/`year` without pushing it.
pub fn calendar_window_create(
    wm: &mut WindowManager,
    month: u8,
    year: u16,
    events: TimelineEvents,
) -> UiResult<WindowId> {
    let window = wm.window_create()?;
    let state = Rc::new(RefCell::new(CalendarState::new(month, year, events)));

    wm.window_set_user_data(window, state.clone());
    wm.window_set_window_handlers(window, CalendarHandlers { state, grid: None });
    wm.window_set_click_config_provider(window, calendar_click_config);
    Ok(window)
}

/// Start the calendar on January 2018 with the demo events.
pub fn launch(wm: &mut WindowManager) -> UiResult<WindowId> {
    let window = calendar_window_create(wm, 1, 2018, demo_events())?;
    if let Err(err) = wm.window_stack_push(window, true) {
        wm.window_destroy(window);
        return Err(err);
    }
    Ok(window)
}

/// The month shown by a calendar window, `None` for other windows.
pub fn shown_month(wm: &WindowManager, window: WindowId) -> Option<(u8, u16)> {
    wm.window_user_data::<SharedCalendar>(window).map(|state| {
        let state = state.borrow();
        (state.month, state.year)
    })
}
