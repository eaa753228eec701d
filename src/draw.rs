/*
 *  draw.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drawing helpers over embedded-graphics targets
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

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle},
    text::{Baseline, Text},
};

use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment}, style::TextBoxStyleBuilder, TextBox
};

/// Foreground
pub const INK: Rgb888 = Rgb888::BLACK;
/// Background
pub const PAPER: Rgb888 = Rgb888::WHITE;

pub fn fill_rect<D>(
    target: &mut D,
    top_left: Point,
    size: Size,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Rectangle::new(top_left, size)
        .into_styled(PrimitiveStyleBuilder::new().fill_color(color).build())
        .draw(target)
}

pub fn draw_text<D>(
    target: &mut D,
    text: &str,
    x: i32,
    y: i32,
    font: &MonoFont,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Text::with_baseline(
        text,
        Point::new(x, y),
        MonoTextStyleBuilder::new()
            .font(font)
            .text_color(color)
            .build(),
        Baseline::Top,
    )
    .draw(target)?;
    Ok(())
}

pub fn draw_text_align<D>(
    target: &mut D,
    text: &str,
    top_left: Point,
    length: u32,
    align: HorizontalAlignment,
    font: &MonoFont,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let h = font.character_size.height;
    let size = Size::new(length, h);
    let character_style = MonoTextStyle::new(font, color);
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(align)
        .vertical_alignment(VerticalAlignment::Middle)
        .build();
    let label_rect = Rectangle::new(top_left, size);
    let label_box = TextBox::with_textbox_style(text, label_rect, character_style, textbox_style);
    label_box.draw(target)?;
    Ok(())
}

/// Pixel length of the filled bar inside a gauge of `width`
pub fn gauge_fill(width: u32, percent: f64) -> u32 {
    let max = width.saturating_sub(3) as f64;
    let len = (max / 100.0 * percent).clamp(3.0_f64.min(max), max);
    len as u32
}

/// Framed horizontal bar, `percent` of the inner width filled
pub fn draw_gauge<D>(
    target: &mut D,
    top_left: Point,
    size: Size,
    percent: f64,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let (w, h) = (size.width, size.height);
    fill_rect(target, top_left, size, INK)?;
    fill_rect(target, top_left + Point::new(2, 2), Size::new(w.saturating_sub(4), h.saturating_sub(4)), PAPER)?;
    let len = gauge_fill(w, percent);
    fill_rect(target, top_left + Point::new(3, 3), Size::new(len.saturating_sub(3), h.saturating_sub(6)), INK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::framebuffer::Frame;
    use embedded_graphics::mono_font::iso_8859_1::FONT_6X10;

    #[test]
    fn gauge_fill_is_clamped() {
        assert_eq!(gauge_fill(250, 0.0), 3);
        assert_eq!(gauge_fill(250, 50.0), 123);
        assert_eq!(gauge_fill(250, 150.0), 247);
    }

    #[test]
    fn gauge_draws_frame_and_bar() {
        let mut frame = Frame::new(100, 14);
        draw_gauge(&mut frame, Point::zero(), Size::new(100, 14), 50.0).unwrap();
        assert_eq!(frame.get(0, 0), Some([0, 0, 0, 0xFF]));
        assert_eq!(frame.get(2, 2), Some([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(frame.get(10, 7), Some([0, 0, 0, 0xFF]));
        assert_eq!(frame.get(90, 7), Some([0xFF, 0xFF, 0xFF, 0xFF]));
    }

    #[test]
    fn text_marks_pixels() {
        let mut frame = Frame::new(40, 12);
        draw_text(&mut frame, "HI", 0, 0, &FONT_6X10, INK).unwrap();
        let dark = (0..40).flat_map(|x| (0..12).map(move |y| (x, y)))
            .filter(|&(x, y)| frame.get(x, y) == Some([0, 0, 0, 0xFF]))
            .count();
        assert!(dark > 0);
    }
}
