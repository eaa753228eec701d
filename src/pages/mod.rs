/*
 *  pages/mod.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Stock pages and the scheduler built from the configuration
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
use std::time::Duration;

use local_ip_address::local_ip;
use log::warn;

use crate::config::Config;
use crate::display::service::Lifecycle;
use crate::ui::scheduler::PageScheduler;

pub mod render;
pub mod disk;
pub mod load;
pub mod menu;
pub mod fan;

pub use disk::disk_pages;
pub use fan::{run_fan_control, FanControl};
pub use load::load_page;
pub use menu::default_menu;

const NO_ADDRESS: &str = "no network";

/// Address shown in the page headers
pub fn host_address() -> String {
    match local_ip() {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            warn!("Local address unavailable: {}", e);
            NO_ADDRESS.to_string()
        }
    }
}

/// Disk pages in the order configured, then the load page, plus the menu
pub fn build_scheduler(cfg: &Config, lifecycle: Arc<Lifecycle>) -> PageScheduler {
    let mut scheduler = PageScheduler::new(lifecycle)
        .with_orientation(cfg.ui.orientation.into())
        .with_idle_tick(Duration::from_millis(cfg.ui.idle_tick_ms))
        .with_index_page(cfg.ui.index_page.clone())
        .with_menu(default_menu(cfg.ui.menu_per_page));

    scheduler.add_pages(disk_pages(&cfg.disks, cfg.group_disks));
    scheduler.add_page(load_page());
    scheduler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::board::Board;
    use crate::display::mock::MockPlatform;
    use crate::display::service::DisplayService;
    use crate::display::traits::SharedDisplay;

    #[test]
    fn pages_follow_config_order() {
        let cfg = Config {
            disks: vec!["/".into(), "/srv".into(), "/mnt/usb".into()],
            ..Config::default()
        };
        let board = Board::new(Box::new(MockPlatform::new()), cfg.board.clone());
        let display: SharedDisplay = Arc::new(DisplayService::new(board));
        let scheduler = build_scheduler(&cfg, Arc::new(Lifecycle::new(display)));

        let names: Vec<&str> = scheduler.pages().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Disk 1&2", "Disk 3", "Load"]);
        assert_eq!(scheduler.menu().map(|m| m.items().len()), Some(4));
    }
}
