//! Test doubles shared by the unit tests.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::config::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// A display that records every presented region and keeps the pixels.
pub struct RecordingDisplay {
    pub fills: Vec<Rectangle>,
    pixels: Vec<Rgb565>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self {
            fills: Vec::new(),
            pixels: vec![Rgb565::BLACK; DISPLAY_WIDTH_PX as usize * DISPLAY_HEIGHT_PX as usize],
        }
    }

    pub fn pixel(&self, point: Point) -> Option<Rgb565> {
        self.bounding_box()
            .contains(point)
            .then(|| self.pixels[point.y as usize * DISPLAY_WIDTH_PX as usize + point.x as usize])
    }
}

impl OriginDimensions for RecordingDisplay {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32)
    }
}

impl DrawTarget for RecordingDisplay {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = self.bounding_box();
        for Pixel(point, color) in pixels {
            if bounds.contains(point) {
                self.pixels[point.y as usize * DISPLAY_WIDTH_PX as usize + point.x as usize] = color;
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.fills.push(*area);
        self.draw_iter(
            area.points()
                .zip(colors)
                .map(|(point, color)| Pixel(point, color)),
        )
    }
}
