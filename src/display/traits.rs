/*
 *  display/traits.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display seam between the page scheduler and the panel hardware
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

use std::sync::Arc;

use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::panel::RefreshMode;

/// Operations the scheduler and shutdown path need from the panel.
///
/// Every method takes `&self`: implementations serialize the rendering
/// path internally so the handle can be shared between the control loop,
/// the background task and signal glue. Fan and LED writes must not wait
/// on an in-flight refresh.
pub trait EpaperDisplay: Send + Sync {
    /// Connect the board. Idempotent while connected.
    fn init_board(&self) -> Result<(), DisplayError>;

    fn is_connected(&self) -> bool;

    /// Program the full or partial waveform table.
    ///
    /// Partial requires a prior full init since the last board connect.
    fn init(&self, mode: RefreshMode) -> Result<(), DisplayError>;

    /// Timed reset pulse
    fn reset(&self) -> Result<(), DisplayError>;

    /// Fill the panel with `bg` (0xFF white, 0x00 black) and refresh
    fn clear(&self, bg: u8) -> Result<(), DisplayError>;

    /// Stream a frame and activate it with the current refresh mode
    fn display(&self, frame: &Frame) -> Result<(), DisplayError>;

    /// Deep sleep, releases the bus
    fn sleep(&self) -> Result<(), DisplayError>;

    fn set_fan(&self, on: bool) -> Result<(), DisplayError>;

    fn set_led(&self, on: bool) -> Result<(), DisplayError>;

    fn init_full(&self) -> Result<(), DisplayError> {
        self.init(RefreshMode::Full)
    }

    fn init_partial(&self) -> Result<(), DisplayError> {
        self.init(RefreshMode::Partial)
    }
}

/// Shared display handle
pub type SharedDisplay = Arc<dyn EpaperDisplay>;
