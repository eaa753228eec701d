/*
 *  display/mod.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - lines, board, panel protocol and the shared service
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;

// Hardware access
pub mod lines;
pub mod button;
pub mod board;

// Panel protocol
pub mod cmd;
pub mod lut;
pub mod panel;

// Shared facade
pub mod service;

#[cfg(test)]
pub mod mock;

// Re-exports for convenience
pub use traits::{EpaperDisplay, SharedDisplay};
pub use error::DisplayError;
pub use framebuffer::Frame;
pub use button::Button;
pub use board::Board;
pub use panel::{Orientation, PanelDriver, PanelState, RefreshMode, BG_BLACK, BG_WHITE};
pub use service::{DisplayService, ExitAction, Lifecycle};
