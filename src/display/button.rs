/*
 *  display/button.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  The four front panel keys
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

use crate::display::error::DisplayError;
use crate::display::lines::{BoxedLine, Level, LineRole};

/// Front panel key identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Ok,
    Back,
    /// previous
    Add,
    /// next
    Sub,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::Ok, Button::Back, Button::Add, Button::Sub];

    pub fn role(&self) -> LineRole {
        match self {
            Button::Ok => LineRole::KeyOk,
            Button::Back => LineRole::KeyBack,
            Button::Add => LineRole::KeyAdd,
            Button::Sub => LineRole::KeySub,
        }
    }
}

/// An edge-triggered key input, owned by exactly one poller
pub struct ButtonLine {
    button: Button,
    line: BoxedLine,
}

impl ButtonLine {
    pub fn new(button: Button, line: BoxedLine) -> Self {
        Self { button, line }
    }

    pub fn button(&self) -> Button {
        self.button
    }

    /// Block until the line changes, then report whether the key is down.
    ///
    /// Keys pull the line low while pressed.
    pub fn wait_pressed(&mut self) -> Result<bool, DisplayError> {
        self.line.wait_edge()?;
        Ok(self.line.read()? == Level::Low)
    }
}
