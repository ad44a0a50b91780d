//! End-to-end scenarios through the public API.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use rwatch_core::GContext;
use rwatch_core::ui::colors::{BLACK, VIVID_CERULEAN};
use rwatch_core::ui::{
    ButtonEvent, ButtonId, ClickConfig, ClickContext, ClickRecognizer, LayerInfo, WindowManager,
};

/// Records presented regions.
#[derive(Default)]
struct RegionDisplay {
    regions: Vec<Rectangle>,
}

impl OriginDimensions for RegionDisplay {
    fn size(&self) -> Size {
        Size::new(144, 168)
    }
}

impl DrawTarget for RegionDisplay {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, _colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.regions.push(*area);
        Ok(())
    }
}

#[test]
fn background_fill_then_root_update_with_window_frame_offset() {
    let mut wm = WindowManager::default();
    let a = wm.window_create().unwrap();
    wm.window_set_background_color(a, VIVID_CERULEAN);

    let seen: Rc<RefCell<Option<(Rectangle, Rgb565)>>> = Rc::default();
    let record = seen.clone();
    let root = wm.window_get_root_layer(a).unwrap();
    wm.layers_mut()
        .set_update_proc(root, move |_: &LayerInfo, ctx: &mut GContext| {
            // The background is already filled when the root draws.
            let corner = ctx.pixel(Point::new(0, 0)).unwrap();
            *record.borrow_mut() = Some((ctx.offset(), corner));
        });

    wm.window_stack_push(a, true).unwrap();
    wm.window_dirty(true);
    let mut display = RegionDisplay::default();

    assert_eq!(wm.draw(&mut display), Ok(true));
    let frame = wm.layers().frame(root).unwrap();
    assert_eq!(*seen.borrow(), Some((frame, VIVID_CERULEAN)));
    assert_eq!(display.regions.len(), 1);
    assert_eq!(wm.graphics().pixel(Point::new(100, 100)), Some(VIVID_CERULEAN));
}

#[test]
fn first_draw_presents_whole_frame_even_when_black() {
    let mut wm = WindowManager::default();
    let a = wm.window_create().unwrap();
    wm.window_set_background_color(a, BLACK);
    wm.window_stack_push(a, false).unwrap();
    wm.window_dirty(true);
    let mut display = RegionDisplay::default();

    assert_eq!(wm.draw(&mut display), Ok(true));
    let frame = wm.layers().frame(wm.window_get_root_layer(a).unwrap()).unwrap();
    assert_eq!(display.regions, [frame]);
}

#[test]
fn repeated_dirty_posts_one_draw_and_draw_is_idempotent() {
    let mut wm = WindowManager::default();
    let a = wm.window_create().unwrap();
    wm.window_stack_push(a, false).unwrap();
    for _ in 0..10 {
        wm.window_dirty(true);
    }

    let mut posted = 0;
    while wm.try_next_message().is_some() {
        posted += 1;
    }
    assert_eq!(posted, 1);

    let mut display = RegionDisplay::default();
    assert_eq!(wm.draw(&mut display), Ok(true));
    assert!(!wm.window_is_render_scheduled(a));
    assert_eq!(wm.draw(&mut display), Ok(false));
    assert_eq!(display.regions.len(), 1);
}

#[test]
fn create_then_destroy_leaves_no_top_window() {
    let mut wm = WindowManager::default();
    let a = wm.window_create().unwrap();
    wm.window_stack_push(a, false).unwrap();
    wm.window_destroy(a);

    assert_eq!(wm.window_stack_get_top_window(), None);
    let mut display = RegionDisplay::default();
    assert_eq!(wm.draw(&mut display), Ok(false));
    assert_eq!(display.regions.len(), 0);
}

thread_local! {
    static SELECT_CONTEXTS: RefCell<Vec<ClickContext>> = const { RefCell::new(Vec::new()) };
}

fn on_select(_wm: &mut WindowManager, recognizer: &ClickRecognizer) {
    SELECT_CONTEXTS.with(|contexts| contexts.borrow_mut().push(recognizer.context()));
}

fn select_provider(config: &mut ClickConfig, _context: ClickContext) {
    config.single_click_subscribe(ButtonId::Select, on_select);
}

#[test]
fn select_click_reaches_handler_with_window_then_explicit_context() {
    let mut wm = WindowManager::default();
    let a = wm.window_create().unwrap();
    wm.window_set_click_config_provider(a, select_provider);
    wm.window_stack_push(a, false).unwrap();
    wm.window_load_click_config();

    wm.handle_button(ButtonEvent::down(ButtonId::Select, Instant::from_millis(0)));
    wm.handle_button(ButtonEvent::up(ButtonId::Select, Instant::from_millis(40)));

    wm.window_set_click_config_provider_with_context(a, select_provider, ClickContext::Value(9));
    wm.handle_button(ButtonEvent::down(ButtonId::Select, Instant::from_millis(500)));
    wm.handle_button(ButtonEvent::up(ButtonId::Select, Instant::from_millis(540)));

    let contexts = SELECT_CONTEXTS.with(|contexts| contexts.borrow().clone());
    assert_eq!(contexts, [ClickContext::Window(a), ClickContext::Value(9)]);
}
