//! Toolkit configuration: display geometry, capacities and click timing.
//!
//! Capacities are compile-time constants (the arenas are fixed-size), while
//! display size and click timing live in [`ToolkitConfig`] so a host can
//! override them.

use embassy_time::Duration;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use serde::{Deserialize, Serialize};

/// Display width in pixels.
pub const DISPLAY_WIDTH_PX: u16 = 144;

/// Display height in pixels.
pub const DISPLAY_HEIGHT_PX: u16 = 168;

/// Maximum number of live windows.
pub const MAX_WINDOWS: usize = 16;

/// Maximum depth of the window stack.
pub const MAX_WINDOW_STACK: usize = 8;

/// Maximum number of live layers across all windows.
pub const MAX_LAYERS: usize = 64;

/// Maximum number of direct children of a single layer.
pub const MAX_CHILDREN: usize = 16;

/// Capacity of the app message queue.
pub const APP_QUEUE_CAPACITY: usize = 16;

/// Timing defaults used when a click subscription passes zero values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickTiming {
    /// Inactivity after which a multi-click sequence ends.
    pub multi_click_timeout_ms: u16,
    /// Minimum clicks for a multi-click when the subscription passes 0.
    pub multi_click_min: u8,
    /// Hold time before a long click fires.
    pub long_click_delay_ms: u16,
}

impl Default for ClickTiming {
    fn default() -> Self {
        Self {
            multi_click_timeout_ms: 300,
            multi_click_min: 2,
            long_click_delay_ms: 500,
        }
    }
}

impl ClickTiming {
    pub fn multi_click_timeout(&self) -> Duration {
        Duration::from_millis(self.multi_click_timeout_ms as u64)
    }

    pub fn long_click_delay(&self) -> Duration {
        Duration::from_millis(self.long_click_delay_ms as u64)
    }
}

/// Runtime configuration of the toolkit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolkitConfig {
    pub display_width: u16,
    pub display_height: u16,
    pub click: ClickTiming,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            display_width: DISPLAY_WIDTH_PX,
            display_height: DISPLAY_HEIGHT_PX,
            click: ClickTiming::default(),
        }
    }
}

impl ToolkitConfig {
    /// Full-screen rectangle; every window's root layer starts with this frame.
    pub fn display_bounds(&self) -> Rectangle {
        Rectangle::new(
            Point::zero(),
            Size::new(self.display_width as u32, self.display_height as u32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_display_bounds() {
        let config = ToolkitConfig::default();
        assert_eq!(
            config.display_bounds(),
            Rectangle::new(Point::zero(), Size::new(144, 168))
        );
    }

    #[test]
    fn test_click_timing_durations() {
        let timing = ClickTiming {
            multi_click_timeout_ms: 250,
            multi_click_min: 3,
            long_click_delay_ms: 800,
        };
        assert_eq!(timing.multi_click_timeout(), Duration::from_millis(250));
        assert_eq!(timing.long_click_delay(), Duration::from_millis(800));
    }
}
