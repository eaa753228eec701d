/*
 *  display/lines.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Physical signal lines and the serial bus the panel hangs off
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

use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use linux_embedded_hal::sysfs_gpio::{Direction, Edge, Pin, PinPoller};
use log::debug;

use crate::display::error::DisplayError;

/// Logic level of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_bool(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Every line the board knows about, used for naming and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineRole {
    Reset,
    DataCommand,
    ChipSelect,
    Busy,
    KeyOk,
    KeyBack,
    KeyAdd,
    KeySub,
    Fan,
    Led,
}

impl LineRole {
    pub fn name(&self) -> &'static str {
        match self {
            LineRole::Reset => "rst",
            LineRole::DataCommand => "dc",
            LineRole::ChipSelect => "cs",
            LineRole::Busy => "busy",
            LineRole::KeyOk => "key_ok",
            LineRole::KeyBack => "key_back",
            LineRole::KeyAdd => "key_add",
            LineRole::KeySub => "key_sub",
            LineRole::Fan => "fan",
            LineRole::Led => "led",
        }
    }
}

/// Capability set of a single physical line.
///
/// Outputs only ever see `set_high`/`set_low`, inputs only `read` and
/// `wait_edge`. `wait_edge` blocks with no timeout until the line changes.
pub trait Line: Send {
    fn set_high(&mut self) -> Result<(), DisplayError>;

    fn set_low(&mut self) -> Result<(), DisplayError>;

    fn read(&mut self) -> Result<Level, DisplayError>;

    fn wait_edge(&mut self) -> Result<(), DisplayError>;

    fn write(&mut self, level: Level) -> Result<(), DisplayError> {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }

    /// Return the line to the OS. Default is a no-op.
    fn release(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Raw full-duplex byte transfer over the serial bus
pub trait SerialBus: Send {
    fn transfer(&mut self, bytes: &[u8]) -> Result<(), DisplayError>;

    fn close(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

pub type BoxedLine = Box<dyn Line>;
pub type BoxedBus = Box<dyn SerialBus>;

/// Source of lines and bus handles for a given target platform
pub trait LinePlatform: Send {
    fn open_bus(&mut self, path: &str, speed_hz: u32) -> Result<BoxedBus, DisplayError>;

    fn open_output(&mut self, role: LineRole, pin: u32) -> Result<BoxedLine, DisplayError>;

    /// Open an input; `edges` requests both-edge notification for `wait_edge`.
    fn open_input(&mut self, role: LineRole, pin: u32, edges: bool) -> Result<BoxedLine, DisplayError>;
}

/// Linux sysfs GPIO line
pub struct SysfsLine {
    role: LineRole,
    pin: Pin,
    poller: Option<PinPoller>,
}

impl SysfsLine {
    fn open(role: LineRole, number: u32, direction: Direction, edges: bool) -> Result<Self, DisplayError> {
        let pin = Pin::new(number as u64);
        pin.export()?;
        pin.set_direction(direction)?;

        let poller = if edges {
            pin.set_edge(Edge::BothEdges)?;
            Some(pin.get_poller()?)
        } else {
            None
        };

        debug!("Opened {} on GPIO{}", role.name(), number);
        Ok(Self { role, pin, poller })
    }
}

impl Line for SysfsLine {
    fn set_high(&mut self) -> Result<(), DisplayError> {
        self.pin.set_value(1).map_err(DisplayError::from)
    }

    fn set_low(&mut self) -> Result<(), DisplayError> {
        self.pin.set_value(0).map_err(DisplayError::from)
    }

    fn read(&mut self) -> Result<Level, DisplayError> {
        Ok(Level::from_bool(self.pin.get_value()? != 0))
    }

    fn wait_edge(&mut self) -> Result<(), DisplayError> {
        let role = self.role;
        let poller = self.poller.as_mut().ok_or_else(|| {
            DisplayError::Gpio(format!("{} was not opened for edge detection", role.name()))
        })?;
        // -1 blocks forever
        while poller.poll(-1)?.is_none() {}
        Ok(())
    }

    fn release(&mut self) -> Result<(), DisplayError> {
        self.pin.unexport().map_err(DisplayError::from)
    }
}

/// Linux spidev bus
pub struct SpidevBus {
    spi: Spidev,
}

impl SpidevBus {
    pub fn open(path: &str, speed_hz: u32) -> Result<Self, DisplayError> {
        let mut spi = Spidev::open(path)
            .map_err(|e| DisplayError::Spi(format!("Failed to open {}: {}", path, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| DisplayError::Spi(format!("Failed to configure {}: {}", path, e)))?;
        Ok(Self { spi })
    }
}

impl SerialBus for SpidevBus {
    fn transfer(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        let mut rx = vec![0u8; bytes.len()];
        let mut transfer = SpidevTransfer::read_write(bytes, &mut rx);
        self.spi.transfer(&mut transfer)
            .map_err(|e| DisplayError::Spi(e.to_string()))
    }
}

/// Raspberry Pi style target: sysfs GPIO plus spidev
#[derive(Debug, Default)]
pub struct SysfsPlatform;

impl LinePlatform for SysfsPlatform {
    fn open_bus(&mut self, path: &str, speed_hz: u32) -> Result<BoxedBus, DisplayError> {
        Ok(Box::new(SpidevBus::open(path, speed_hz)?))
    }

    fn open_output(&mut self, role: LineRole, pin: u32) -> Result<BoxedLine, DisplayError> {
        Ok(Box::new(SysfsLine::open(role, pin, Direction::Low, false)?))
    }

    fn open_input(&mut self, role: LineRole, pin: u32, edges: bool) -> Result<BoxedLine, DisplayError> {
        Ok(Box::new(SysfsLine::open(role, pin, Direction::In, edges)?))
    }
}
