/*
 *  pages/fan.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Case fan control off the SoC temperature
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

use std::time::Duration;

use anyhow::Context;
use log::{debug, info};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::FanConfig;
use crate::display::traits::SharedDisplay;
use crate::metrics;

/// Two-threshold switch. Between the thresholds the fan keeps its state.
#[derive(Debug, Clone, PartialEq)]
pub struct FanControl {
    on_at: f64,
    off_at: f64,
    running: Option<bool>,
}

impl FanControl {
    pub fn new(on_at: f64, off_at: f64) -> Self {
        Self { on_at, off_at, running: None }
    }

    pub fn running(&self) -> Option<bool> {
        self.running
    }

    /// New fan state for `temp`, or None when the line should be left alone
    pub fn decide(&mut self, temp: f64) -> Option<bool> {
        let want = if temp >= self.on_at {
            true
        } else if temp <= self.off_at {
            false
        } else {
            // unknown state inside the band settles to off
            self.running.unwrap_or(false)
        };

        if self.running == Some(want) {
            return None;
        }
        self.running = Some(want);
        Some(want)
    }
}

impl From<&FanConfig> for FanControl {
    fn from(cfg: &FanConfig) -> Self {
        Self::new(cfg.on_celsius, cfg.off_celsius)
    }
}

/// Poll the temperature every `period_secs` and switch the fan line.
/// Runs until a temperature read or fan write fails.
pub async fn run_fan_control(display: SharedDisplay, cfg: FanConfig) -> anyhow::Result<()> {
    let mut control = FanControl::from(&cfg);
    let mut ticker = interval(Duration::from_secs(cfg.period_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Fan control on at {}°C, off at {}°C", cfg.on_celsius, cfg.off_celsius);
    loop {
        ticker.tick().await;

        let temp = metrics::cpu_temp().context("reading CPU temperature")?;

        if let Some(on) = control.decide(temp) {
            debug!("Fan {} at {:.1}°C", if on { "on" } else { "off" }, temp);
            display
                .set_fan(on)
                .with_context(|| format!("switching fan {}", if on { "on" } else { "off" }))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_band() {
        let mut fan = FanControl::new(55.0, 43.0);
        assert_eq!(fan.decide(50.0), Some(false));
        assert_eq!(fan.decide(54.9), None);
        assert_eq!(fan.decide(55.0), Some(true));
        assert_eq!(fan.decide(60.0), None);
        // stays on while cooling through the band
        assert_eq!(fan.decide(44.0), None);
        assert_eq!(fan.running(), Some(true));
        assert_eq!(fan.decide(43.0), Some(false));
        assert_eq!(fan.decide(30.0), None);
    }

    #[test]
    fn hot_start_switches_on() {
        let mut fan = FanControl::new(55.0, 43.0);
        assert_eq!(fan.decide(70.0), Some(true));
    }
}
