/*
 *  pages/load.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  CPU, temperature and memory usage page
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

use crate::metrics::MetricsSampler;
use crate::pages::{host_address, render};
use crate::ui::page::Page;

pub const LOAD_PAGE: &str = "Load";

pub fn load_page() -> Page {
    let mut sampler = MetricsSampler::new();

    Page::new(LOAD_PAGE, 0.5, move |ctx| {
        let metrics = sampler.check()?;
        Ok(Some(render::resources(ctx.new_frame(), "Usage", &host_address(), &metrics)?))
    })
}
