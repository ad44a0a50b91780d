//! Watch color palette in RGB565
//!
//! The watch palette is defined in 8-bit RGB; constants here are converted
//! to RGB565 with R>>3, G>>2, B>>3.

use embedded_graphics::pixelcolor::Rgb565;

/// Pure white - default window background
pub const WHITE: Rgb565 = Rgb565::new(31, 63, 31);

/// Pure black
pub const BLACK: Rgb565 = Rgb565::new(0, 0, 0);

/// Light gray - days outside the current month
pub const LIGHT_GRAY: Rgb565 = Rgb565::new(170 >> 3, 170 >> 2, 170 >> 3);

/// Red
pub const RED: Rgb565 = Rgb565::new(255 >> 3, 0, 0);

/// Vivid cerulean - highlight color
pub const VIVID_CERULEAN: Rgb565 = Rgb565::new(0, 170 >> 2, 255 >> 3);

/// Islamic green
pub const ISLAMIC_GREEN: Rgb565 = Rgb565::new(0, 170 >> 2, 0);
