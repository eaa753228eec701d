/*
 *  display/service.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Thread safe display facade, key pollers and the shutdown path
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

use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::BoardConfig;
use crate::display::board::{Board, SharedLine};
use crate::display::button::{Button, ButtonLine};
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::lines::{Level, SysfsPlatform};
use crate::display::panel::{BG_WHITE, PanelDriver, RefreshMode};
use crate::display::traits::{EpaperDisplay, SharedDisplay};

/// Serializes every rendering call on one panel. Fan and LED lines are
/// written without taking the panel lock.
pub struct DisplayService {
    panel: Mutex<PanelDriver>,
    fan: SharedLine,
    led: SharedLine,
}

impl DisplayService {
    pub fn new(board: Board) -> Self {
        let fan = board.fan_line();
        let led = board.led_line();
        Self {
            panel: Mutex::new(PanelDriver::new(board)),
            fan,
            led,
        }
    }

    /// Service on the Linux spidev/sysfs stack
    pub fn open(config: BoardConfig) -> Self {
        Self::new(Board::new(Box::new(SysfsPlatform), config))
    }

    // a panicked renderer leaves the driver in a consistent enough state
    // for shutdown to run, so poisoning is ignored
    fn lock(&self) -> MutexGuard<'_, PanelDriver> {
        self.panel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connected(&self) -> Result<MutexGuard<'_, PanelDriver>, DisplayError> {
        let guard = self.lock();
        if !guard.board().is_connected() {
            return Err(DisplayError::NotConnected);
        }
        Ok(guard)
    }

    /// Start one poller per key on the runtime's blocking pool. Each waits
    /// on its line and sends the key on a press. A poller finishes with the
    /// line error that stopped it, or `Ok` once the receiver is gone. Keys
    /// are handed out once; a second call starts nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_button_pollers(
        &self,
        events: mpsc::Sender<Button>,
    ) -> Result<JoinSet<Result<(), DisplayError>>, DisplayError> {
        let buttons = self.connected()?.board_mut().take_buttons();
        if buttons.is_empty() {
            warn!("Key pollers already running");
        }

        let mut pollers = JoinSet::new();
        for line in buttons {
            let tx = events.clone();
            pollers.spawn_blocking(move || poll_button(line, tx));
        }
        Ok(pollers)
    }
}

fn poll_button(mut line: ButtonLine, events: mpsc::Sender<Button>) -> Result<(), DisplayError> {
    let button = line.button();
    loop {
        match line.wait_pressed() {
            Ok(true) => {
                debug!("Key {:?} pressed", button);
                if events.blocking_send(button).is_err() {
                    // receiver gone, the scheduler has stopped
                    return Ok(());
                }
            }
            Ok(false) => {}
            Err(e) => {
                error!("Key {:?} poller stopped: {}", button, e);
                return Err(e);
            }
        }
    }
}

impl EpaperDisplay for DisplayService {
    fn init_board(&self) -> Result<(), DisplayError> {
        self.lock().init_board()
    }

    fn is_connected(&self) -> bool {
        self.lock().board().is_connected()
    }

    fn init(&self, mode: RefreshMode) -> Result<(), DisplayError> {
        self.connected()?.init(mode)
    }

    fn reset(&self) -> Result<(), DisplayError> {
        self.connected()?.reset()
    }

    fn clear(&self, bg: u8) -> Result<(), DisplayError> {
        self.connected()?.clear(bg)
    }

    fn display(&self, frame: &Frame) -> Result<(), DisplayError> {
        self.connected()?.display(frame)
    }

    fn sleep(&self) -> Result<(), DisplayError> {
        self.connected()?.sleep()
    }

    fn set_fan(&self, on: bool) -> Result<(), DisplayError> {
        self.fan.write(Level::from_bool(on))
    }

    fn set_led(&self, on: bool) -> Result<(), DisplayError> {
        self.led.write(Level::from_bool(on))
    }
}

/// What to do with the machine once the panel is asleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    Exit,
    Reboot,
    PowerOff,
}

impl ExitAction {
    /// Run the system command for this action. `Exit` does nothing.
    pub fn run(&self) -> std::io::Result<()> {
        let program = match self {
            ExitAction::Exit => return Ok(()),
            ExitAction::Reboot => "reboot",
            ExitAction::PowerOff => "poweroff",
        };
        info!("Running {}", program);
        let status = Command::new(program).status()?;
        if !status.success() {
            return Err(std::io::Error::other(format!("{program} exited with {status}")));
        }
        Ok(())
    }
}

/// The single way out of the process: stop the fan, blank the panel
/// and put it to sleep. Every exit route goes through `shutdown`.
///
/// While the scheduler loop runs it is the only caller of `shutdown`.
/// Other tasks ask it to stop with `request_stop` and wait for the loop
/// to finish, so no draw can land on the blanked panel.
pub struct Lifecycle {
    display: SharedDisplay,
    action: Mutex<Option<ExitAction>>,
    stopping: AtomicBool,
    done: AtomicBool,
}

impl Lifecycle {
    pub fn new(display: SharedDisplay) -> Self {
        Self {
            display,
            action: Mutex::new(None),
            stopping: AtomicBool::new(false),
            done: AtomicBool::new(false),
        }
    }

    /// Ask the scheduler loop to shut the panel down and return
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn display(&self) -> &SharedDisplay {
        &self.display
    }

    /// Record `action` (first request wins) and shut down.
    pub fn request(&self, action: ExitAction) -> Result<(), DisplayError> {
        {
            let mut slot = self.action.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(action);
            }
        }
        self.shutdown()
    }

    pub fn requested(&self) -> Option<ExitAction> {
        *self.action.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shut_down(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Runs once; later calls return immediately.
    pub fn shutdown(&self) -> Result<(), DisplayError> {
        if self.done.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Shutting down display");
        if let Err(e) = self.display.set_fan(false) {
            warn!("Failed to stop fan: {}", e);
        }

        if !self.display.is_connected() {
            debug!("Board never connected, nothing to blank");
            return Ok(());
        }

        self.display.init_full()?;
        self.display.clear(BG_WHITE)?;
        self.display.reset()?;
        self.display.sleep()
    }
}
