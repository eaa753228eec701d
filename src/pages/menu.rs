/*
 *  pages/menu.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Menu page and the reboot, power off, uptime and exit items
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

use chrono::Local;
use log::info;

use crate::display::service::ExitAction;
use crate::metrics;
use crate::pages::render;
use crate::ui::menu::Menu;
use crate::ui::page::Page;

/// Page that shows `notice` on arrival and carries out `action` on its
/// next refresh.
pub fn action_page(
    label: &str,
    title: &str,
    notice: &str,
    action: ExitAction,
    refresh_interval: f64,
) -> Page {
    let name = label.to_string();
    let title = title.to_string();
    let notice = vec![notice.to_string()];

    Page::new(label, refresh_interval, move |ctx| {
        let current = ctx.current_page().ok_or("no current page is set")?;

        // already shown once, this refresh is the go-ahead
        if current.name == name && !current.first_time {
            info!("Menu action {:?}", action);
            ctx.lifecycle().request(action)?;
            return Ok(None);
        }

        Ok(Some(render::action_text(ctx.new_frame(), &title, &notice)?))
    })
}

pub fn uptime_page() -> Page {
    Page::new("Uptime", 0.5, |ctx| {
        let up = metrics::up_time_secs()?;
        let mut lines = metrics::uptime_lines(up);
        if let Some(boot) = metrics::boot_time(Local::now(), up) {
            lines.push(boot.format("since %d %b %H:%M").to_string());
        }
        Ok(Some(render::action_text(ctx.new_frame(), "Menu: uptime", &lines)?))
    })
}

pub fn menu_page() -> Page {
    Page::new("Menu page", 2.0, |ctx| {
        let view = ctx.menu().ok_or("menu page shown without a menu")?;
        Ok(Some(render::menu(ctx.new_frame(), view)?))
    })
}

pub fn default_menu(per_page: usize) -> Menu {
    let mut menu = Menu::new("Menu", menu_page())
        .with_item(
            "Reboot Device",
            Some(action_page("Reboot Device", "Menu: reboot", "Rebooting ...", ExitAction::Reboot, 2.0)),
        )
        .with_item(
            "Power off",
            Some(action_page("Power off", "Menu: power off", "Power off ...", ExitAction::PowerOff, 2.0)),
        )
        .with_item("Uptime", Some(uptime_page()))
        .with_item("Exit", Some(action_page("Exit", "Menu: exit", "Bye!", ExitAction::Exit, 0.5)));
    menu.set_per_page(per_page);
    menu
}
