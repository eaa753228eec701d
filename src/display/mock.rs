/*
 *  display/mock.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Recording line platform for testing without hardware
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

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::display::error::DisplayError;
use crate::display::lines::{BoxedBus, BoxedLine, Level, Line, LinePlatform, LineRole, SerialBus};

/// Everything the mock saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(LineRole, Level),
    Bus(Vec<u8>),
    BusClosed,
    Delay(u32),
}

/// Shared state for the mock platform (inspected by tests)
#[derive(Debug, Default)]
pub struct MockState {
    pub events: Vec<Event>,
    /// Levels returned by successive BUSY reads, Low once exhausted
    pub busy_script: VecDeque<bool>,
    /// Pending key edges, each carrying the level read after the edge
    pub edges: HashMap<LineRole, VecDeque<Level>>,
    pub last_edge_level: HashMap<LineRole, Level>,
    /// Lines whose next edge wait fails
    pub failing_edges: HashSet<LineRole>,
    pub fail_bus_open: bool,
}

/// Mock platform recording every line write, bus transfer and delay.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    pub fn fail_bus_open(&self) {
        self.state.lock().unwrap().fail_bus_open = true;
    }

    pub fn script_busy(&self, levels: &[bool]) {
        self.state.lock().unwrap().busy_script.extend(levels.iter().copied());
    }

    pub fn push_edge(&self, role: LineRole, level: Level) {
        self.state.lock().unwrap().edges.entry(role).or_default().push_back(level);
    }

    pub fn fail_edge(&self, role: LineRole) {
        self.state.lock().unwrap().failing_edges.insert(role);
    }

    pub fn delay(&self) -> Box<dyn DelayNs + Send> {
        Box::new(MockDelay { state: Arc::clone(&self.state) })
    }

    /// Every byte written over the bus, flattened
    pub fn bus_bytes(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Bus(bytes) => Some(bytes),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Bus transfers tagged with the DC level at the time (false = command)
    pub fn transfers(&self) -> Vec<(bool, Vec<u8>)> {
        let mut dc = false;
        let mut out = Vec::new();
        for event in self.events() {
            match event {
                Event::Line(LineRole::DataCommand, level) => dc = level == Level::High,
                Event::Bus(bytes) => out.push((dc, bytes)),
                _ => {}
            }
        }
        out
    }

    /// Command opcodes in the order they were sent
    pub fn commands(&self) -> Vec<u8> {
        self.transfers()
            .into_iter()
            .filter(|(data, _)| !data)
            .flat_map(|(_, bytes)| bytes)
            .collect()
    }
}

impl LinePlatform for MockPlatform {
    fn open_bus(&mut self, _path: &str, _speed_hz: u32) -> Result<BoxedBus, DisplayError> {
        if self.state.lock().unwrap().fail_bus_open {
            return Err(DisplayError::Spi("no such device".to_string()));
        }
        Ok(Box::new(MockBus { state: Arc::clone(&self.state) }))
    }

    fn open_output(&mut self, role: LineRole, _pin: u32) -> Result<BoxedLine, DisplayError> {
        Ok(Box::new(MockLine { role, state: Arc::clone(&self.state) }))
    }

    fn open_input(&mut self, role: LineRole, _pin: u32, _edges: bool) -> Result<BoxedLine, DisplayError> {
        Ok(Box::new(MockLine { role, state: Arc::clone(&self.state) }))
    }
}

struct MockLine {
    role: LineRole,
    state: Arc<Mutex<MockState>>,
}

impl Line for MockLine {
    fn set_high(&mut self) -> Result<(), DisplayError> {
        self.state.lock().unwrap().events.push(Event::Line(self.role, Level::High));
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), DisplayError> {
        self.state.lock().unwrap().events.push(Event::Line(self.role, Level::Low));
        Ok(())
    }

    fn read(&mut self) -> Result<Level, DisplayError> {
        let mut state = self.state.lock().unwrap();
        if self.role == LineRole::Busy {
            let busy = state.busy_script.pop_front().unwrap_or(false);
            return Ok(Level::from_bool(busy));
        }
        Ok(state.last_edge_level.get(&self.role).copied().unwrap_or(Level::High))
    }

    // blocks forever once the scripted edges run out
    fn wait_edge(&mut self) -> Result<(), DisplayError> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if state.failing_edges.remove(&self.role) {
                    return Err(DisplayError::Gpio(format!("{} edge wait failed", self.role.name())));
                }
                let next = state.edges.get_mut(&self.role).and_then(|q| q.pop_front());
                if let Some(level) = next {
                    state.last_edge_level.insert(self.role, level);
                    return Ok(());
                }
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl SerialBus for MockBus {
    fn transfer(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.state.lock().unwrap().events.push(Event::Bus(bytes.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        self.state.lock().unwrap().events.push(Event::BusClosed);
        Ok(())
    }
}

struct MockDelay {
    state: Arc<Mutex<MockState>>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.state.lock().unwrap().events.push(Event::Delay(ms));
    }
}
