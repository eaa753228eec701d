/*
 *  display/board.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Board wiring: panel control lines, SPI bus, keys, fan and LED
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

use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;
use linux_embedded_hal::Delay;
use log::{debug, info, warn};

use crate::config::BoardConfig;
use crate::display::button::{Button, ButtonLine};
use crate::display::error::DisplayError;
use crate::display::lines::{BoxedBus, BoxedLine, Level, LinePlatform, LineRole};

/// An output line that can be written from outside the display lock.
///
/// Holds `None` while the board is disconnected; writes are then ignored.
#[derive(Clone)]
pub struct SharedLine {
    role: LineRole,
    inner: Arc<Mutex<Option<BoxedLine>>>,
}

impl SharedLine {
    fn new(role: LineRole) -> Self {
        Self { role, inner: Arc::new(Mutex::new(None)) }
    }

    pub fn write(&self, level: Level) -> Result<(), DisplayError> {
        let mut guard = self.inner.lock()
            .map_err(|_| DisplayError::Gpio(format!("{} lock poisoned", self.role.name())))?;
        match guard.as_mut() {
            Some(line) => line.write(level),
            None => Ok(()),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn attach(&self, line: BoxedLine) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(line);
        }
    }

    fn detach(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
    }
}

/// Lines that only exist while connected
struct PanelLines {
    bus: BoxedBus,
    rst: BoxedLine,
    dc: BoxedLine,
    cs: BoxedLine,
    busy: BoxedLine,
}

/// Owns every line on the HAT and the SPI bus
pub struct Board {
    platform: Box<dyn LinePlatform>,
    config: BoardConfig,
    delay: Box<dyn DelayNs + Send>,
    lines: Option<PanelLines>,
    fan: SharedLine,
    led: SharedLine,
    buttons: Vec<ButtonLine>,
    buttons_opened: bool,
}

impl Board {
    pub fn new(platform: Box<dyn LinePlatform>, config: BoardConfig) -> Self {
        Self::with_delay(platform, config, Box::new(Delay {}))
    }

    pub fn with_delay(
        platform: Box<dyn LinePlatform>,
        config: BoardConfig,
        delay: Box<dyn DelayNs + Send>,
    ) -> Self {
        Self {
            platform,
            config,
            delay,
            lines: None,
            fan: SharedLine::new(LineRole::Fan),
            led: SharedLine::new(LineRole::Led),
            buttons: Vec::new(),
            buttons_opened: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lines.is_some()
    }

    /// Open the bus and every line. Key inputs are only opened once; after a
    /// sleep/reconnect cycle the pollers keep the lines they already own.
    pub fn connect(&mut self) -> Result<(), DisplayError> {
        if self.is_connected() {
            return Ok(());
        }

        let cfg = self.config.clone();
        info!("Connecting board on {} at {} Hz", cfg.spi_bus, cfg.spi_speed_hz);

        let bus = self.platform.open_bus(&cfg.spi_bus, cfg.spi_speed_hz).map_err(hw_init)?;
        let rst = self.platform.open_output(LineRole::Reset, cfg.rst_pin).map_err(hw_init)?;
        let dc = self.platform.open_output(LineRole::DataCommand, cfg.dc_pin).map_err(hw_init)?;
        let cs = self.platform.open_output(LineRole::ChipSelect, cfg.cs_pin).map_err(hw_init)?;
        let busy = self.platform.open_input(LineRole::Busy, cfg.busy_pin, false).map_err(hw_init)?;

        if !self.buttons_opened {
            for button in Button::ALL {
                let line = self.platform
                    .open_input(button.role(), cfg.key_pin(button), true)
                    .map_err(hw_init)?;
                self.buttons.push(ButtonLine::new(button, line));
            }
            self.buttons_opened = true;
        }

        let fan = self.platform.open_output(LineRole::Fan, cfg.fan_pin).map_err(hw_init)?;
        let led = self.platform.open_output(LineRole::Led, cfg.led_pin).map_err(hw_init)?;
        self.fan.attach(fan);
        self.led.attach(led);

        self.lines = Some(PanelLines { bus, rst, dc, cs, busy });
        info!("Board connected");
        Ok(())
    }

    /// Hand the key inputs to their pollers. Returns an empty list on the
    /// second call.
    pub fn take_buttons(&mut self) -> Vec<ButtonLine> {
        std::mem::take(&mut self.buttons)
    }

    pub fn fan_line(&self) -> SharedLine {
        self.fan.clone()
    }

    pub fn led_line(&self) -> SharedLine {
        self.led.clone()
    }

    fn lines(&mut self) -> Result<&mut PanelLines, DisplayError> {
        self.lines.as_mut().ok_or(DisplayError::NotConnected)
    }

    pub fn write_rst(&mut self, level: Level) -> Result<(), DisplayError> {
        self.lines()?.rst.write(level)
    }

    pub fn write_dc(&mut self, level: Level) -> Result<(), DisplayError> {
        self.lines()?.dc.write(level)
    }

    pub fn write_cs(&mut self, level: Level) -> Result<(), DisplayError> {
        self.lines()?.cs.write(level)
    }

    pub fn transfer(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.lines()?.bus.transfer(bytes)
    }

    /// Poll BUSY until the panel releases it. There is no timeout; a stuck
    /// BUSY line hangs the caller.
    pub fn wait_busy(&mut self) -> Result<(), DisplayError> {
        let poll_ms = self.config.busy_poll_ms;
        loop {
            let level = self.lines()?.busy.read()?;
            if level == Level::Low {
                return Ok(());
            }
            self.delay.delay_ms(poll_ms);
        }
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    pub fn write_fan(&self, on: bool) -> Result<(), DisplayError> {
        self.fan.write(Level::from_bool(on))
    }

    pub fn write_led(&self, on: bool) -> Result<(), DisplayError> {
        self.led.write(Level::from_bool(on))
    }

    /// Drive everything to a safe state and release the bus. Errors are
    /// logged, cleanup always completes.
    pub fn cleanup(&mut self) {
        debug!("Board cleanup");
        if let Err(e) = self.write_fan(false) {
            warn!("Failed to stop fan during cleanup: {}", e);
        }
        if let Err(e) = self.write_led(false) {
            warn!("Failed to switch LED off during cleanup: {}", e);
        }
        self.fan.detach();
        self.led.detach();

        if let Some(mut lines) = self.lines.take() {
            if let Err(e) = lines.rst.set_low() {
                warn!("Failed to drop RST during cleanup: {}", e);
            }
            if let Err(e) = lines.dc.set_low() {
                warn!("Failed to drop DC during cleanup: {}", e);
            }
            if let Err(e) = lines.bus.close() {
                warn!("Failed to close SPI bus: {}", e);
            }
        }
        info!("Board released");
    }
}

fn hw_init(err: DisplayError) -> DisplayError {
    match err {
        DisplayError::HardwareInit(_) => err,
        other => DisplayError::HardwareInit(other.to_string()),
    }
}
