/*
 *  pages/render.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layouts for the stock pages: header, menu, notices, disks and load
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

use embedded_graphics::mono_font::iso_8859_1::{FONT_6X10, FONT_7X13, FONT_7X13_BOLD};
use embedded_graphics::prelude::*;
use embedded_text::alignment::HorizontalAlignment;

use crate::display::framebuffer::Frame;
use crate::draw::{draw_gauge, draw_text, draw_text_align, fill_rect, INK, PAPER};
use crate::metrics::{human_bytes, DiskUsage, MachineMetrics};
use crate::ui::menu::MenuView;
use crate::ui::page::ContentError;

const HEADER_H: i32 = 20;
const MENU_ROW_H: i32 = 32;

fn width(frame: &Frame) -> i32 {
    frame.width() as i32
}

fn height(frame: &Frame) -> i32 {
    frame.height() as i32
}

/// Title on the left, address on a black tab to the right, rule below
pub fn page_header(frame: &mut Frame, label: &str, address: &str) -> Result<(), ContentError> {
    let w = width(frame);
    let tab_w = address.len() as i32 * FONT_6X10.character_size.width as i32 + 8;
    let tab_x = (w - tab_w).max(w / 2);

    draw_text(frame, label, 0, 3, &FONT_7X13_BOLD, INK)?;
    fill_rect(frame, Point::new(tab_x, 0), Size::new((w - tab_x) as u32, HEADER_H as u32), INK)?;
    draw_text(frame, address, tab_x + 4, 5, &FONT_6X10, PAPER)?;
    fill_rect(frame, Point::new(0, HEADER_H), Size::new(w as u32, 1), INK)?;
    Ok(())
}

fn title_rule(frame: &mut Frame, label: &str) -> Result<(), ContentError> {
    let w = width(frame) as u32;
    draw_text(frame, label, 0, 3, &FONT_7X13_BOLD, INK)?;
    fill_rect(frame, Point::new(0, 18), Size::new(w, 1), INK)?;
    Ok(())
}

/// Title plus a few lines of text, used by the menu actions
pub fn action_text(mut frame: Frame, label: &str, lines: &[String]) -> Result<Frame, ContentError> {
    title_rule(&mut frame, label)?;
    for (idx, line) in lines.iter().enumerate() {
        let y = 26 + idx as i32 * 18;
        draw_text(&mut frame, line.trim_matches(|c| c == '\n' || c == ' '), 14, y, &FONT_7X13, INK)?;
    }
    Ok(frame)
}

/// One screen of menu items, the highlighted one boxed
pub fn menu(mut frame: Frame, view: &MenuView) -> Result<Frame, ContentError> {
    let w = width(&frame);
    title_rule(&mut frame, &view.label)?;
    draw_text_align(
        &mut frame,
        &format!("{}/{}", view.screen(), view.screens()),
        Point::new(w - 48, 3),
        48,
        HorizontalAlignment::Right,
        &FONT_7X13,
        INK,
    )?;

    for (row, (idx, label)) in view.visible().enumerate() {
        let top = 22 + row as i32 * MENU_ROW_H;
        if idx == view.index {
            fill_rect(&mut frame, Point::new(8, top), Size::new((w - 16) as u32, 28), INK)?;
            fill_rect(&mut frame, Point::new(9, top + 1), Size::new((w - 18) as u32, 26), PAPER)?;
        }
        draw_text(&mut frame, &format!("{}.{}", idx + 1, label), 14, top + 8, &FONT_7X13, INK)?;
    }
    Ok(frame)
}

pub fn disk_one(mut frame: Frame, label: &str, address: &str, disk: &DiskUsage) -> Result<Frame, ContentError> {
    let (w, h) = (width(&frame), height(&frame));
    page_header(&mut frame, label, address)?;

    draw_text(&mut frame, &format!("Path: {}", disk.path), 0, 28, &FONT_7X13, INK)?;
    draw_gauge(&mut frame, Point::new(0, 48), Size::new(w as u32, 18), disk.used_percent)?;
    draw_text(
        &mut frame,
        &format!("U: {} from {}", human_bytes(disk.used), human_bytes(disk.total)),
        0,
        72,
        &FONT_7X13,
        INK,
    )?;

    fill_rect(&mut frame, Point::new(0, h - 20), Size::new(110.min(w as u32), 20), INK)?;
    draw_text(&mut frame, &format!("F: {}", human_bytes(disk.free)), 2, h - 16, &FONT_7X13, PAPER)?;
    Ok(frame)
}

fn compact(n: u64) -> String {
    human_bytes(n).replace(' ', "")
}

/// Two disks stacked, each with its number, path, gauge and sizes
pub fn disk_two(
    mut frame: Frame,
    label: &str,
    address: &str,
    disks: [(usize, &DiskUsage); 2],
) -> Result<Frame, ContentError> {
    let w = width(&frame);
    page_header(&mut frame, label, address)?;

    for (slot, (number, disk)) in disks.iter().enumerate() {
        let pan = slot as i32 * 50;
        fill_rect(&mut frame, Point::new(0, 24 + pan), Size::new(16, 14), INK)?;
        draw_text(&mut frame, &number.to_string(), 4, 26 + pan, &FONT_6X10, PAPER)?;
        draw_text(&mut frame, &disk.path, 20, 26 + pan, &FONT_6X10, INK)?;
        draw_gauge(&mut frame, Point::new(0, 40 + pan), Size::new(w as u32, 14), disk.used_percent)?;
        draw_text(
            &mut frame,
            &format!("{}/{} F:{}", compact(disk.used), compact(disk.total), compact(disk.free)),
            0,
            56 + pan,
            &FONT_6X10,
            INK,
        )?;
    }
    Ok(frame)
}

/// CPU load and temperature, RAM share and usage
pub fn resources(mut frame: Frame, label: &str, address: &str, m: &MachineMetrics) -> Result<Frame, ContentError> {
    page_header(&mut frame, label, address)?;

    let rows = [
        ("CPU", format!("{:.2}%, {:.2}°C", m.cpu_load, m.cpu_temp)),
        ("RAM", format!("{:.2}%, {}", m.mem.used_percent, human_bytes(m.mem.used))),
    ];
    for (n, (tag, value)) in rows.iter().enumerate() {
        let top = 32 + n as i32 * 42;
        fill_rect(&mut frame, Point::new(10, top), Size::new(28, 28), INK)?;
        draw_text(&mut frame, tag, 14, top + 9, &FONT_6X10, PAPER)?;
        draw_text(&mut frame, value, 44, top + 8, &FONT_7X13, INK)?;
    }
    Ok(frame)
}
