/*
 *  ui/mod.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Page scheduling and menu navigation
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

pub mod page;
pub mod menu;
pub mod scheduler;

pub use page::{ContentError, ContentResult, Page, PageContext, ShownPage};
pub use menu::{Menu, MenuItem, MenuView};
pub use scheduler::{DisplayMode, PageRef, PageScheduler, SchedulerError, Tick};
