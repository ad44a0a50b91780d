//! Demo apps built on the UI core.
//!
//! - [`calendar`]: month grid, opens the timeline for the shown month
//! - [`timeline`]: one event at a time with a colored side bar

pub mod calendar;
pub mod timeline;
