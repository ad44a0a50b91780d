//! Shared graphics context with origin offset, clipping and change detection.
//!
//! All layer drawing targets this RAM framebuffer instead of the display.
//! The render scheduler installs an origin offset (the frame of the layer
//! being drawn) before each update procedure runs, so update procedures draw
//! in layer-local coordinates. After composition only the rectangular region
//! containing changed pixels is presented to the hardware display.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle, Triangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::debug;

/// Bounding box of pixels that have changed since the last present.
#[derive(Debug, Clone, Copy)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    /// Expand the dirty region to include the given pixel coordinate.
    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }
}

/// The drawing context handed to layer update procedures.
///
/// Implements `DrawTarget<Color = Rgb565>`, so any `embedded-graphics`
/// primitive can be drawn into it. Coordinates are translated by the current
/// offset origin and clipped to the current clip rectangle (screen space).
///
/// The `fill_*`/`draw_*` helpers mirror the watch graphics API and use the
/// context's current fill, stroke and text colors.
pub struct GContext {
    width: usize,
    height: usize,
    pixels: Vec<Rgb565>,
    dirty: Option<DirtyRect>,
    offset: Rectangle,
    clip: Rectangle,
    fill_color: Rgb565,
    stroke_color: Rgb565,
    text_color: Rgb565,
}

impl GContext {
    /// Allocate a framebuffer of the given size filled with black pixels.
    ///
    /// The panel contents are unknown until the first present, so the whole
    /// screen starts out dirty.
    pub fn new(size: Size) -> Self {
        let screen = Rectangle::new(Point::zero(), size);
        let (width, height) = (size.width as usize, size.height as usize);
        let dirty = (width > 0 && height > 0).then(|| DirtyRect {
            min_x: 0,
            min_y: 0,
            max_x: width - 1,
            max_y: height - 1,
        });
        Self {
            width,
            height,
            pixels: vec![Rgb565::BLACK; width * height],
            dirty,
            offset: screen,
            clip: screen,
            fill_color: Rgb565::BLACK,
            stroke_color: Rgb565::BLACK,
            text_color: Rgb565::BLACK,
        }
    }

    fn screen(&self) -> Rectangle {
        Rectangle::new(
            Point::zero(),
            Size::new(self.width as u32, self.height as u32),
        )
    }

    /// Install a new origin offset. The clip is reset to the offset rectangle.
    pub fn set_offset(&mut self, offset: Rectangle) {
        self.offset = offset;
        self.clip = offset.intersection(&self.screen());
    }

    /// Current origin offset (screen space).
    pub fn offset(&self) -> Rectangle {
        self.offset
    }

    /// Narrow the clip rectangle to `area` (screen space).
    pub fn restrict_clip(&mut self, area: &Rectangle) {
        self.clip = self.clip.intersection(area);
    }

    /// Current clip rectangle (screen space).
    pub fn clip(&self) -> Rectangle {
        self.clip
    }

    /// Restore a full-screen offset and clip.
    pub fn reset_offset(&mut self) {
        let screen = self.screen();
        self.offset = screen;
        self.clip = screen;
    }

    pub fn set_fill_color(&mut self, color: Rgb565) {
        self.fill_color = color;
    }

    pub fn fill_color(&self) -> Rgb565 {
        self.fill_color
    }

    pub fn set_stroke_color(&mut self, color: Rgb565) {
        self.stroke_color = color;
    }

    pub fn set_text_color(&mut self, color: Rgb565) {
        self.text_color = color;
    }

    /// Fill `rect` (offset-local) with the fill color.
    pub fn fill_rect(&mut self, rect: Rectangle) {
        let color = self.fill_color;
        let Ok(()) = self.fill_solid(&rect, color);
    }

    /// Outline `rect` (offset-local) with a 1px stroke in the stroke color.
    pub fn draw_rect(&mut self, rect: Rectangle) {
        let style = PrimitiveStyle::with_stroke(self.stroke_color, 1);
        let Ok(()) = rect.into_styled(style).draw(self);
    }

    /// Fill a three-point path with the fill color.
    pub fn fill_triangle(&mut self, a: Point, b: Point, c: Point) {
        let style = PrimitiveStyle::with_fill(self.fill_color);
        let Ok(()) = Triangle::new(a, b, c).into_styled(style).draw(self);
    }

    /// Fill a closed convex path with the fill color.
    ///
    /// Paths with fewer than three points draw nothing.
    pub fn fill_path(&mut self, points: &[Point]) {
        let Some((&first, rest)) = points.split_first() else {
            return;
        };
        for pair in rest.windows(2) {
            self.fill_triangle(first, pair[0], pair[1]);
        }
    }

    /// Draw `text` inside `rect` (offset-local) with the text color.
    ///
    /// The text is anchored to the top of the box and clipped to it; line
    /// breaks (`\n`) are honored, wrapping is not.
    pub fn draw_text(
        &mut self,
        text: &str,
        font: &MonoFont<'_>,
        rect: Rectangle,
        alignment: Alignment,
    ) {
        let character_style = MonoTextStyle::new(font, self.text_color);
        let text_style = TextStyleBuilder::new()
            .alignment(alignment)
            .baseline(Baseline::Top)
            .build();

        let x = match alignment {
            Alignment::Left => rect.top_left.x,
            Alignment::Center => rect.center().x,
            Alignment::Right => rect.top_left.x + rect.size.width as i32 - 1,
        };
        let position = Point::new(x, rect.top_left.y);

        let Ok(_) = Text::with_text_style(text, position, character_style, text_style)
            .draw(&mut self.clipped(&rect));
    }

    /// Read back a pixel in screen coordinates.
    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as usize, point.y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Whether any pixel changed since the last present.
    pub fn has_changes(&self) -> bool {
        self.dirty.is_some()
    }

    /// Write a single pixel (screen space), expanding the dirty rect only if
    /// the color changed.
    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, color: Rgb565) {
        let idx = y * self.width + x;
        if self.pixels[idx] != color {
            self.pixels[idx] = color;
            match &mut self.dirty {
                Some(rect) => rect.expand(x, y),
                None => self.dirty = Some(DirtyRect::from_point(x, y)),
            }
        }
    }

    /// Present the changed region to a hardware display, then reset the
    /// dirty state.
    ///
    /// Returns `Ok(false)` without touching the display if nothing changed.
    pub fn present<D>(&mut self, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let Some(rect) = self.dirty.take() else {
            return Ok(false);
        };

        let width = rect.max_x - rect.min_x + 1;
        let height = rect.max_y - rect.min_y + 1;

        debug!(
            "Presenting {}x{} changed region at ({}, {})",
            width, height, rect.min_x, rect.min_y
        );

        let area = Rectangle::new(
            Point::new(rect.min_x as i32, rect.min_y as i32),
            Size::new(width as u32, height as u32),
        );

        let pixels = &self.pixels;
        let stride = self.width;
        let pixel_iter = (rect.min_y..=rect.max_y).flat_map(move |y| {
            let row_start = y * stride + rect.min_x;
            pixels[row_start..row_start + width].iter().copied()
        });

        display.fill_contiguous(&area, pixel_iter)?;
        Ok(true)
    }
}

impl OriginDimensions for GContext {
    /// The drawable size is the size of the installed offset rectangle.
    fn size(&self) -> Size {
        self.offset.size
    }
}

impl DrawTarget for GContext {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let origin = self.offset.top_left;
        let clip = self.clip;

        for Pixel(coord, color) in pixels {
            let p = coord + origin;
            if clip.contains(p) {
                self.set_pixel(p.x as usize, p.y as usize, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let translated = Rectangle::new(area.top_left + self.offset.top_left, area.size);
        let target = translated.intersection(&self.clip);
        if target.size.width == 0 || target.size.height == 0 {
            return Ok(());
        }

        let x_start = target.top_left.x as usize;
        let y_start = target.top_left.y as usize;
        let x_end = x_start + target.size.width as usize;
        let y_end = y_start + target.size.height as usize;

        for y in y_start..y_end {
            for x in x_start..x_end {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }
}
