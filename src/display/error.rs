/*
 *  display/error.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display subsystem
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

use std::fmt;
use std::error::Error;

/// Unified error type for all display and board operations
#[derive(Debug)]
pub enum DisplayError {
    /// Bus or line setup failed while connecting the board
    HardwareInit(String),

    /// A display operation was attempted before the board was connected
    NotConnected,

    /// GPIO line error
    Gpio(String),

    /// SPI communication error
    Spi(String),

    /// OS level I/O error
    Io(std::io::Error),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::HardwareInit(msg) =>
                write!(f, "Board initialization failed: {}", msg),
            DisplayError::NotConnected =>
                write!(f, "The board is not connected, connect it before drawing"),
            DisplayError::Gpio(msg) =>
                write!(f, "GPIO error: {}", msg),
            DisplayError::Spi(msg) =>
                write!(f, "SPI communication error: {}", msg),
            DisplayError::Io(err) =>
                write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Io(err)
    }
}

// sysfs_gpio errors carry no useful source chain, flatten to text
impl From<linux_embedded_hal::sysfs_gpio::Error> for DisplayError {
    fn from(err: linux_embedded_hal::sysfs_gpio::Error) -> Self {
        DisplayError::Gpio(err.to_string())
    }
}
