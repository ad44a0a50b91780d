//! Hardware-independent core library for the rwatch UI toolkit
//!
//! This crate contains the platform-agnostic parts of the watch UI: the
//! layer tree, windows and the window stack, dirty-driven render scheduling,
//! button click recognition and dispatch, and the shared graphics context.
//! A couple of small demo apps (calendar, timeline) live in [`apps`].
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod apps;
pub mod config;
pub mod error;
pub mod graphics;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ToolkitConfig;
pub use error::{UiError, UiResult};
pub use graphics::GContext;
