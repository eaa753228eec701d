/*
 *  display/cmd.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Command opcodes and option bytes for the 2.13" 122x250 panel controller
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

pub struct Cmd;

#[allow(dead_code)]
impl Cmd {
    pub const DRIVER_OUTPUT_CTRL: u8 = 0x01;
    pub const GATE_VOLTAGE_CTRL: u8 = 0x03;
    pub const SOURCE_VOLTAGE_CTRL: u8 = 0x04;
    pub const BOOSTER_SOFT_START: u8 = 0x0C;
    pub const DEEP_SLEEP: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const MASTER_ACTIVATE: u8 = 0x20;
    pub const DISPLAY_UPDATE_CTRL2: u8 = 0x22;
    pub const WRITE_BW_DATA: u8 = 0x24;
    pub const WRITE_VCOM_REG: u8 = 0x2C;
    pub const WRITE_LUT_REG: u8 = 0x32;
    pub const WRITE_OTP_SELECTION: u8 = 0x37;
    pub const DUMMY_LINE_PERIOD: u8 = 0x3A;
    pub const GATE_LINE_WIDTH: u8 = 0x3B;
    pub const BORDER_WAVEFORM_CTRL: u8 = 0x3C;
    pub const SET_RAMXPOS: u8 = 0x44;
    pub const SET_RAMYPOS: u8 = 0x45;
    pub const SET_RAMX_COUNTER: u8 = 0x4E;
    pub const SET_RAMY_COUNTER: u8 = 0x4F;
    pub const ANALOG_BLOCK_CTRL: u8 = 0x74;
    pub const DIGITAL_BLOCK_CTRL: u8 = 0x7E;
    pub const NOP: u8 = 0xFF;
}

pub struct Flag;

#[allow(dead_code)]
impl Flag {
    pub const ANALOG_BLOCK: u8 = 0x54;
    pub const DIGITAL_BLOCK: u8 = 0x3B;
    /// gates - 1 = 249, low byte first
    pub const DRIVER_OUTPUT: [u8; 3] = [0xF9, 0x00, 0x00];
    pub const DATA_ENTRY_INCRX_DECRY: u8 = 0x01;
    pub const BORDER_WAVEFORM: u8 = 0x03;
    pub const VCOM: u8 = 0x50;
    pub const DEEP_SLEEP_MODE_1: u8 = 0x01;
    pub const DISPLAY_MODE_FULL: u8 = 0xC7;
    pub const DISPLAY_MODE_PARTIAL: u8 = 0x0C;
    pub const PARTIAL_LOAD: u8 = 0xC0;
    /// WS register of OTP selection, partial refresh only
    pub const OTP_SELECTION_PARTIAL: [u8; 7] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00];
}
