/*
 *  display/framebuffer.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime sized RGBA frame that pages render into
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

use core::convert::Infallible;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;

/// 8-bit RGBA pixels, row major. Pixels outside the frame read as
/// transparent black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    buf: Vec<[u8; 4]>,
    w: usize,
    h: usize,
}

impl Frame {
    /// New frame filled with opaque white
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0xFF, 0xFF, 0xFF, 0xFF])
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![rgba; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn get(&self, x: i64, y: i64) -> Option<[u8; 4]> {
        self.idx(x, y).map(|i| self.buf[i])
    }

    pub fn set(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        if let Some(i) = self.idx(x, y) {
            self.buf[i] = rgba;
        }
    }

    /// Colour at (x, y) widened to 16 bits per channel (0..=0xFFFF).
    /// Out of bounds reads as zero.
    pub fn rgb16(&self, x: i64, y: i64) -> (u32, u32, u32) {
        match self.get(x, y) {
            Some([r, g, b, _]) => (widen(r), widen(g), widen(b)),
            None => (0, 0, 0),
        }
    }

    #[inline]
    fn idx(&self, x: i64, y: i64) -> Option<usize> {
        if x >= 0 && y >= 0 {
            let (x, y) = (x as usize, y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    /// Write the frame as a plain PBM, 1 = dark pixel
    pub fn save_pbm(&self, path: &Path) -> std::io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "P1")?;
        writeln!(file, "{} {}", self.w, self.h)?;

        for (i, &[r, g, b, _]) in self.buf.iter().enumerate() {
            let dark = (r as u32 + g as u32 + b as u32) < 3 * 128;
            write!(file, "{}", if dark { "1" } else { "0" })?;
            if (i + 1) % self.w == 0 {
                writeln!(file)?;
            } else {
                write!(file, " ")?;
            }
        }

        file.flush()
    }
}

#[inline]
fn widen(c: u8) -> u32 {
    (c as u32) * 0x101
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            self.set(p.x as i64, p.y as i64, [c.r(), c.g(), c.b(), 0xFF]);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill([color.r(), color.g(), color.b(), 0xFF]);
        Ok(())
    }
}
