/*
 *  pages/disk.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Disk usage pages, one or two mount points each
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

use crate::metrics;
use crate::pages::{host_address, render};
use crate::ui::page::Page;

pub const DISK_REFRESH_SECS: f64 = 0.8;

/// Mount points split into pages: pairs while grouping, then singles.
/// Disks are numbered from 1 in the order given.
pub fn disk_groups(disks: &[String], group: bool) -> Vec<Vec<(usize, String)>> {
    let numbered: Vec<(usize, String)> = disks
        .iter()
        .enumerate()
        .map(|(i, d)| (i + 1, d.clone()))
        .collect();
    let size = if group { 2 } else { 1 };
    numbered.chunks(size).map(<[_]>::to_vec).collect()
}

fn group_label(group: &[(usize, String)]) -> String {
    let numbers: Vec<String> = group.iter().map(|(n, _)| n.to_string()).collect();
    format!("Disk {}", numbers.join("&"))
}

pub fn disk_page(group: Vec<(usize, String)>) -> Page {
    let label = group_label(&group);
    let title = label.clone();

    Page::new(label, DISK_REFRESH_SECS, move |ctx| {
        let address = host_address();
        let frame = match group.as_slice() {
            [(_, path)] => {
                let usage = metrics::disk_usage(path)?;
                render::disk_one(ctx.new_frame(), &title, &address, &usage)?
            }
            [(n1, p1), (n2, p2)] => {
                let u1 = metrics::disk_usage(p1)?;
                let u2 = metrics::disk_usage(p2)?;
                render::disk_two(ctx.new_frame(), &title, &address, [(*n1, &u1), (*n2, &u2)])?
            }
            _ => return Err(format!("{title}: unexpected disk group size {}", group.len()).into()),
        };
        Ok(Some(frame))
    })
}

pub fn disk_pages(disks: &[String], group: bool) -> Vec<Page> {
    disk_groups(disks, group).into_iter().map(disk_page).collect()
}
