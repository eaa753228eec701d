/*
 *  display/panel.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  2.13" 122x250 e-paper panel driver: init sequences, RAM writes, sleep
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

use log::{debug, info, warn};

use crate::display::board::Board;
use crate::display::cmd::{Cmd, Flag};
use crate::display::error::DisplayError;
use crate::display::framebuffer::Frame;
use crate::display::lines::Level;
use crate::display::lut;

/// Native panel width in pixels (source lines)
pub const WIDTH: usize = 122;
/// Native panel height in pixels (gate lines)
pub const HEIGHT: usize = 250;
/// Bytes streamed per row; the column loop runs 0..=WIDTH/8
pub const ROW_BYTES: usize = WIDTH / 8 + 1;

/// Background fill for `clear`
pub const BG_WHITE: u8 = 0xFF;
pub const BG_BLACK: u8 = 0x00;

/// Half of the 16-bit luminance range. Pixels at or above it pack to a
/// set bit, and a set bit is a white pixel on this panel (see `BG_WHITE`).
const LUMA_THRESHOLD: u32 = 0x7FFF;

/// Which waveform table the controller was last programmed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Uninitialized,
    FullInit,
    PartialInit,
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Full,
    Partial,
}

/// Scan direction derived from the frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// 122x250, rows map 1:1
    Vertical,
    /// 250x122, row index mirrored
    Horizontal,
}

impl Orientation {
    pub fn of(frame: &Frame) -> Self {
        if frame.width() == WIDTH && frame.height() == HEIGHT {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }

    /// Frame dimensions that render natively in this orientation
    pub fn frame_size(&self) -> (u32, u32) {
        match self {
            Orientation::Vertical => (WIDTH as u32, HEIGHT as u32),
            Orientation::Horizontal => (HEIGHT as u32, WIDTH as u32),
        }
    }
}

/// Rec. 601 luma over 16-bit channels, rounded
#[inline]
pub fn luminance(r: u32, g: u32, b: u32) -> u32 {
    (r * 299 + g * 587 + b * 114 + 500) / 1000
}

/// Pack 8 pixels along the scan axis, MSB first. `line` is the frame row
/// (vertical) or frame column (horizontal) being scanned, `column` the
/// output byte index.
pub fn pack_byte(frame: &Frame, line: usize, column: usize, orientation: Orientation) -> u8 {
    let mut b = 0u8;
    for bit in 0..8 {
        let along = (column * 8 + bit) as i64;
        let (x, y) = match orientation {
            Orientation::Vertical => (along, line as i64),
            Orientation::Horizontal => (line as i64, along),
        };
        let (r, g, bl) = frame.rgb16(x, y);
        if luminance(r, g, bl) >= LUMA_THRESHOLD {
            b |= 1 << (7 - bit);
        }
    }
    b
}

/// Bytes for physical row `y`
pub fn pack_row(frame: &Frame, y: usize, orientation: Orientation) -> [u8; ROW_BYTES] {
    let line = match orientation {
        Orientation::Vertical => y,
        Orientation::Horizontal => HEIGHT - 1 - y,
    };
    let mut row = [0u8; ROW_BYTES];
    for (column, byte) in row.iter_mut().enumerate() {
        *byte = pack_byte(frame, line, column, orientation);
    }
    row
}

/// Whole panel RAM image, top physical row first
pub fn pack_frame(frame: &Frame) -> Vec<[u8; ROW_BYTES]> {
    let orientation = Orientation::of(frame);
    (0..HEIGHT).map(|y| pack_row(frame, y, orientation)).collect()
}

/// Command level driver for the panel
pub struct PanelDriver {
    board: Board,
    state: PanelState,
    full_init_seen: bool,
}

impl PanelDriver {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            state: PanelState::Uninitialized,
            full_init_seen: false,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Connect the board if needed. Waking from sleep leaves the panel
    /// uninitialized; a full init must follow.
    pub fn init_board(&mut self) -> Result<(), DisplayError> {
        if !self.board.is_connected() {
            self.board.connect()?;
            self.state = PanelState::Uninitialized;
        }
        Ok(())
    }

    pub fn init(&mut self, mode: RefreshMode) -> Result<(), DisplayError> {
        if !self.board.is_connected() {
            return Err(DisplayError::NotConnected);
        }

        match mode {
            RefreshMode::Full => {
                info!("Panel full init");
                self.init_lut_full()?;
                self.full_init_seen = true;
                self.state = PanelState::FullInit;
            }
            RefreshMode::Partial => {
                if !self.full_init_seen {
                    warn!("Partial init requested before any full init, panel output is undefined");
                }
                debug!("Panel partial init");
                self.init_lut_partial()?;
                self.state = PanelState::PartialInit;
            }
        }
        Ok(())
    }

    pub fn clear(&mut self, bg: u8) -> Result<(), DisplayError> {
        self.set_window(0, 0, (WIDTH - 1) as u16, (HEIGHT - 1) as u16)?;
        let row = [bg; ROW_BYTES];
        for y in 0..HEIGHT {
            self.set_cursor(0, y as u16)?;
            self.send_cmd(Cmd::WRITE_BW_DATA)?;
            self.send_data(&row)?;
        }
        self.turn_on_display()
    }

    pub fn display(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        self.set_window(0, 0, (WIDTH - 1) as u16, (HEIGHT - 1) as u16)?;

        let orientation = Orientation::of(frame);
        for y in 0..HEIGHT {
            self.set_cursor(0, y as u16)?;
            self.send_cmd(Cmd::WRITE_BW_DATA)?;
            let row = pack_row(frame, y, orientation);
            self.send_data(&row)?;
        }

        if self.state == PanelState::PartialInit {
            self.turn_on_display_partial()
        } else {
            self.turn_on_display()
        }
    }

    /// Enter deep sleep and release the board. Waking needs
    /// `init_board` followed by a full init.
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        self.send_cmd(Cmd::DEEP_SLEEP)?;
        self.send_data(&[Flag::DEEP_SLEEP_MODE_1])?;
        self.board.cleanup();
        self.state = PanelState::Sleeping;
        self.full_init_seen = false;
        info!("Panel sleeping");
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), DisplayError> {
        self.board.write_rst(Level::High)?;
        self.board.delay_ms(200);
        self.board.write_rst(Level::Low)?;
        self.board.delay_ms(10);
        self.board.write_rst(Level::High)?;
        self.board.delay_ms(200);
        Ok(())
    }

    fn init_lut_full(&mut self) -> Result<(), DisplayError> {
        let table = &lut::LUT_FULL_UPDATE;

        self.reset()?;
        self.board.wait_busy()?;
        self.send_cmd(Cmd::SW_RESET)?;
        self.board.wait_busy()?;

        self.command(Cmd::ANALOG_BLOCK_CTRL, &[Flag::ANALOG_BLOCK])?;
        self.command(Cmd::DIGITAL_BLOCK_CTRL, &[Flag::DIGITAL_BLOCK])?;
        self.command(Cmd::DRIVER_OUTPUT_CTRL, &Flag::DRIVER_OUTPUT)?;
        self.command(Cmd::DATA_ENTRY_MODE, &[Flag::DATA_ENTRY_INCRX_DECRY])?;
        self.command(Cmd::SET_RAMXPOS, &[0x00, 0x0F])?;
        self.command(Cmd::SET_RAMYPOS, &[0xF9, 0x00, 0x00, 0x00])?;
        self.command(Cmd::BORDER_WAVEFORM_CTRL, &[Flag::BORDER_WAVEFORM])?;
        self.command(Cmd::WRITE_VCOM_REG, &[Flag::VCOM])?;

        self.command(Cmd::GATE_VOLTAGE_CTRL, &[table[lut::GATE_VOLTAGE]])?;
        let [s0, s1, s2] = lut::SOURCE_VOLTAGE;
        self.command(Cmd::SOURCE_VOLTAGE_CTRL, &[table[s0], table[s1], table[s2]])?;
        self.command(Cmd::DUMMY_LINE_PERIOD, &[table[lut::DUMMY_LINE]])?;
        self.command(Cmd::GATE_LINE_WIDTH, &[table[lut::GATE_LINE_WIDTH]])?;

        self.command(Cmd::WRITE_LUT_REG, table)?;

        self.command(Cmd::SET_RAMX_COUNTER, &[0x00])?;
        self.command(Cmd::SET_RAMY_COUNTER, &[0xF9, 0x00])?;
        self.board.wait_busy()
    }

    fn init_lut_partial(&mut self) -> Result<(), DisplayError> {
        self.reset()?;
        self.board.wait_busy()?;

        self.command(Cmd::WRITE_LUT_REG, &lut::LUT_PARTIAL_UPDATE)?;
        self.command(Cmd::WRITE_OTP_SELECTION, &Flag::OTP_SELECTION_PARTIAL)?;
        self.command(Cmd::DISPLAY_UPDATE_CTRL2, &[Flag::PARTIAL_LOAD])?;
        self.send_cmd(Cmd::MASTER_ACTIVATE)?;
        self.board.wait_busy()
    }

    fn turn_on_display(&mut self) -> Result<(), DisplayError> {
        self.activate(Flag::DISPLAY_MODE_FULL)
    }

    fn turn_on_display_partial(&mut self) -> Result<(), DisplayError> {
        self.activate(Flag::DISPLAY_MODE_PARTIAL)
    }

    fn activate(&mut self, mode: u8) -> Result<(), DisplayError> {
        self.command(Cmd::DISPLAY_UPDATE_CTRL2, &[mode])?;
        self.send_cmd(Cmd::MASTER_ACTIVATE)?;
        self.send_cmd(Cmd::NOP)?;
        self.board.wait_busy()
    }

    // x must be a multiple of 8, the low 3 bits are dropped
    fn set_window(&mut self, x_start: u16, y_start: u16, x_end: u16, y_end: u16) -> Result<(), DisplayError> {
        self.command(Cmd::SET_RAMXPOS, &[(x_start >> 3) as u8, (x_end >> 3) as u8])?;
        self.command(Cmd::SET_RAMYPOS, &[
            (y_start & 0xFF) as u8,
            (y_start >> 8) as u8,
            (y_end & 0xFF) as u8,
            (y_end >> 8) as u8,
        ])
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<(), DisplayError> {
        self.command(Cmd::SET_RAMX_COUNTER, &[(x >> 3) as u8])?;
        self.command(Cmd::SET_RAMY_COUNTER, &[(y & 0xFF) as u8, (y >> 8) as u8])?;
        self.board.wait_busy()
    }

    fn command(&mut self, cmd: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.send_cmd(cmd)?;
        self.send_data(data)
    }

    fn send_cmd(&mut self, cmd: u8) -> Result<(), DisplayError> {
        self.board.write_dc(Level::Low)?;
        self.board.write_cs(Level::Low)?;
        self.board.transfer(&[cmd])?;
        self.board.write_cs(Level::High)
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.board.write_dc(Level::High)?;
        self.board.write_cs(Level::Low)?;
        self.board.transfer(data)?;
        self.board.write_cs(Level::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::display::lines::LineRole;
    use crate::display::mock::{Event, MockPlatform};

    fn driver(platform: &MockPlatform) -> PanelDriver {
        let board = Board::with_delay(Box::new(platform.clone()), BoardConfig::default(), platform.delay());
        PanelDriver::new(board)
    }

    fn connected(platform: &MockPlatform) -> PanelDriver {
        let mut d = driver(platform);
        d.init_board().unwrap();
        platform.clear_events();
        d
    }

    #[test]
    fn row_stride_is_sixteen_bytes() {
        assert_eq!(ROW_BYTES, 16);
        assert_eq!(ROW_BYTES, WIDTH.div_ceil(8));
    }

    #[test]
    fn luminance_threshold() {
        assert_eq!(luminance(0xFFFF, 0xFFFF, 0xFFFF), 0xFFFF);
        assert_eq!(luminance(0, 0, 0), 0);
        // mid grey 0x80 widened is above half range
        assert!(luminance(0x8080, 0x8080, 0x8080) >= LUMA_THRESHOLD);
        assert!(luminance(0x7F7F, 0x7F7F, 0x7F7F) < LUMA_THRESHOLD);
    }

    #[test]
    fn white_frame_sets_every_in_frame_bit() {
        let frame = Frame::new(WIDTH as u32, HEIGHT as u32);
        let rows = pack_frame(&frame);
        assert_eq!(rows.len(), HEIGHT);
        for row in &rows {
            assert!(row[..15].iter().all(|&b| b == 0xFF));
            // columns 120, 121 are in the frame, 122..128 fall outside
            assert_eq!(row[15], 0b1100_0000);
        }
    }

    #[test]
    fn black_frame_packs_to_zero() {
        let frame = Frame::filled(WIDTH as u32, HEIGHT as u32, [0, 0, 0, 0xFF]);
        assert!(pack_frame(&frame).iter().all(|row| row.iter().all(|&b| b == 0)));
    }

    #[test]
    fn msb_is_the_first_pixel() {
        let mut frame = Frame::filled(WIDTH as u32, HEIGHT as u32, [0, 0, 0, 0xFF]);
        frame.set(0, 0, [0xFF, 0xFF, 0xFF, 0xFF]);
        frame.set(9, 0, [0xFF, 0xFF, 0xFF, 0xFF]);
        let row = pack_row(&frame, 0, Orientation::Vertical);
        assert_eq!(row[0], 0x80);
        assert_eq!(row[1], 0x40);
        assert!(row[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn vertical_frame_is_not_mirrored() {
        let mut frame = Frame::filled(WIDTH as u32, HEIGHT as u32, [0, 0, 0, 0xFF]);
        frame.set(0, 3, [0xFF, 0xFF, 0xFF, 0xFF]);
        let rows = pack_frame(&frame);
        assert_eq!(rows[3][0], 0x80);
        assert_eq!(rows[HEIGHT - 1 - 3][0], 0x00);
    }

    #[test]
    fn horizontal_frame_mirrors_rows() {
        // 250 wide, 122 high
        let mut frame = Frame::filled(HEIGHT as u32, WIDTH as u32, [0, 0, 0, 0xFF]);
        frame.set(3, 0, [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(Orientation::of(&frame), Orientation::Horizontal);
        let rows = pack_frame(&frame);
        // frame column 3 lands on physical row H-1-3, scanned down the frame
        assert_eq!(rows[HEIGHT - 1 - 3][0], 0x80);
        assert_eq!(rows[3][0], 0x00);
    }

    #[test]
    fn orientation_frame_sizes() {
        assert_eq!(Orientation::Vertical.frame_size(), (122, 250));
        assert_eq!(Orientation::Horizontal.frame_size(), (250, 122));
    }

    #[test]
    fn init_requires_connection() {
        let platform = MockPlatform::new();
        let mut d = driver(&platform);
        assert!(matches!(d.init(RefreshMode::Full), Err(DisplayError::NotConnected)));
        assert!(matches!(d.display(&Frame::new(1, 1)), Err(DisplayError::NotConnected)));
    }

    #[test]
    fn reset_pulse_timing() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.reset().unwrap();
        assert_eq!(platform.events(), vec![
            Event::Line(LineRole::Reset, Level::High),
            Event::Delay(200),
            Event::Line(LineRole::Reset, Level::Low),
            Event::Delay(10),
            Event::Line(LineRole::Reset, Level::High),
            Event::Delay(200),
        ]);
    }

    #[test]
    fn full_init_command_sequence() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.init(RefreshMode::Full).unwrap();
        assert_eq!(d.state(), PanelState::FullInit);
        assert_eq!(platform.commands(), vec![
            0x12, 0x74, 0x7E, 0x01, 0x11, 0x44, 0x45, 0x3C, 0x2C,
            0x03, 0x04, 0x3A, 0x3B, 0x32, 0x4E, 0x4F,
        ]);

        let transfers = platform.transfers();
        let after = |cmd: u8| -> Vec<u8> {
            let i = transfers.iter().position(|(data, b)| !data && b == &vec![cmd]).unwrap();
            transfers[i + 1].1.clone()
        };
        assert_eq!(after(0x01), vec![0xF9, 0x00, 0x00]);
        assert_eq!(after(0x04), vec![0x41, 0xA8, 0x32]);
        assert_eq!(after(0x3A), vec![0x2C]);
        assert_eq!(after(0x3B), vec![0x0B]);
        assert_eq!(after(0x32).len(), lut::LUT_LEN);
        assert_eq!(after(0x4F), vec![0xF9, 0x00]);
    }

    #[test]
    fn partial_init_command_sequence() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.init(RefreshMode::Full).unwrap();
        platform.clear_events();
        d.init(RefreshMode::Partial).unwrap();
        assert_eq!(d.state(), PanelState::PartialInit);
        assert_eq!(platform.commands(), vec![0x32, 0x37, 0x22, 0x20]);
        let transfers = platform.transfers();
        assert_eq!(transfers[1].1, lut::LUT_PARTIAL_UPDATE.to_vec());
        assert_eq!(transfers[3].1, vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00]);
        assert_eq!(transfers[5].1, vec![0xC0]);
    }

    #[test]
    fn display_streams_every_row_and_activates() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.init(RefreshMode::Full).unwrap();
        platform.clear_events();

        d.display(&Frame::new(WIDTH as u32, HEIGHT as u32)).unwrap();

        let commands = platform.commands();
        assert_eq!(&commands[..2], &[0x44, 0x45]);
        assert_eq!(commands.iter().filter(|&&c| c == 0x24).count(), HEIGHT);
        assert_eq!(&commands[commands.len() - 3..], &[0x22, 0x20, 0xFF]);

        let transfers = platform.transfers();
        assert_eq!(transfers[1].1, vec![0x00, 0x0F]);
        assert_eq!(transfers[3].1, vec![0x00, 0x00, 0xF9, 0x00]);
        let rows: Vec<_> = transfers.iter()
            .filter(|(data, b)| *data && b.len() == ROW_BYTES)
            .collect();
        assert_eq!(rows.len(), HEIGHT);
        // full activation
        let n = transfers.len();
        assert_eq!(transfers[n - 3].1, vec![0xC7]);
    }

    #[test]
    fn partial_mode_uses_partial_activation() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.init(RefreshMode::Full).unwrap();
        d.init(RefreshMode::Partial).unwrap();
        platform.clear_events();
        d.display(&Frame::new(WIDTH as u32, HEIGHT as u32)).unwrap();
        let transfers = platform.transfers();
        let n = transfers.len();
        assert_eq!(transfers[n - 3].1, vec![0x0C]);
    }

    #[test]
    fn cursor_rows_count_up() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.clear(BG_WHITE).unwrap();
        let transfers = platform.transfers();
        let ys: Vec<Vec<u8>> = transfers.windows(2)
            .filter(|w| !w[0].0 && w[0].1 == vec![0x4F])
            .map(|w| w[1].1.clone())
            .collect();
        assert_eq!(ys.len(), HEIGHT);
        assert_eq!(ys[0], vec![0x00, 0x00]);
        assert_eq!(ys[249], vec![0xF9, 0x00]);
        assert!(transfers.iter().any(|(data, b)| *data && b == &vec![0xFF; ROW_BYTES]));
    }

    #[test]
    fn sleep_releases_board_and_requires_full_init() {
        let platform = MockPlatform::new();
        let mut d = connected(&platform);
        d.init(RefreshMode::Full).unwrap();
        platform.clear_events();
        d.sleep().unwrap();
        assert_eq!(d.state(), PanelState::Sleeping);
        assert!(!d.board().is_connected());
        assert_eq!(platform.commands(), vec![0x10]);
        assert!(platform.events().contains(&Event::BusClosed));

        assert!(matches!(d.init(RefreshMode::Full), Err(DisplayError::NotConnected)));
        d.init_board().unwrap();
        assert_eq!(d.state(), PanelState::Uninitialized);
    }
}
