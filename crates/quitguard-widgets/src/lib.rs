//! ratatui presentation for **quitguard**.
//!
//! The termination pipeline never draws anything itself; it publishes
//! [`WarnBeforeQuitState`](quitguard_core::WarnBeforeQuitState) changes.
//! This crate turns those into a prompt the user can see and click.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`hold_overlay`] | The hold-to-quit prompt with progress gauge |
//! | [`overlay`] | Centering and clearing helpers for floating boxes |

pub mod hold_overlay;
pub mod overlay;

pub use hold_overlay::{HoldToQuitOverlay, OverlayStyle};
