//! Serial real-time clock of the DS (and the extended DSi variant).
//!
//! Software talks to the chip by bit-banging the RTC I/O register: chip select
//! frames a transfer, every write with the clock line low moves one bit, and
//! the direction bit decides whether that bit goes to the chip or comes back
//! from it. The first byte of a transfer is a command; the remaining bytes are
//! register data.

use std::rc::Rc;

use anyhow::Result;
use log::debug;

use crate::core::config::{ConsoleType, DateTime};
use crate::core::hardware::rtc::command::Group;
use crate::core::savestate::{StateReader, StateWriter};
use crate::core::scheduler::{EventInfo, Scheduler};

mod clock;
mod command;
mod registers;
mod serial;

pub use clock::{bcd_increment, bcd_sanitize, ClockTimer, SYSTEM_CLOCK, TICKS_PER_SECOND};
pub use command::{normalize, reverse_command, CLASS_BASE, CLASS_EXTENDED};
pub use registers::{RegisterFile, Status1, Status2};
pub use serial::{RtcIo, SerialSession};

use registers::{STATUS1_AUTO_CLEAR, STATUS2_INTERRUPTS};

pub struct Rtc {
    console_type: ConsoleType,
    io: RtcIo,
    session: SerialSession,
    state: RegisterFile,
    timer: ClockTimer,
    tick_event: Rc<EventInfo>,
}

impl Rtc {
    /// Powers the chip on from nothing. The register file starts at its reset
    /// value with the power-lost flag raised, which firmware uses to ask the
    /// user for the date.
    pub fn new(console_type: ConsoleType) -> Self {
        let mut state = RegisterFile::new();
        state.status_reg1 = Status1(0).with_power_lost(true);

        Self {
            console_type,
            io: RtcIo(0),
            session: SerialSession::default(),
            state,
            timer: ClockTimer::default(),
            tick_event: Rc::default(),
        }
    }

    /// Resets the serial interface and restarts the oscillator. The register
    /// file is battery backed and survives.
    pub fn reset(&mut self, scheduler: &mut Scheduler) {
        self.session = SerialSession::default();
        self.timer.clock_count = 0;

        scheduler.cancel_event(&self.tick_event);
        self.tick_event = scheduler.register_event("RTC Tick", |system| system.rtc.clock_timer(&mut system.scheduler));
        self.schedule_timer(scheduler, true);
    }

    pub const fn console_type(&self) -> ConsoleType {
        self.console_type
    }

    pub fn set_console_type(&mut self, console_type: ConsoleType) {
        self.console_type = console_type;
    }

    pub const fn read_io(&self) -> u16 {
        self.io.0
    }

    /// 8-bit write to the low half of the I/O register.
    pub fn write_io_byte(&mut self, val: u8) {
        let mut io = self.io;
        io.set_byte0(val);
        self.write_io(io.0);
    }

    pub fn write_io(&mut self, val: u16) {
        let new = RtcIo(val);

        if new.select() {
            if !self.io.select() {
                self.session.begin();
            } else if !new.clock() {
                if new.write_direction() {
                    if let Some(byte) = self.session.shift_in(new.data()) {
                        self.byte_in(byte);
                        self.session.input_pos += 1;
                    }
                } else {
                    let bit = self.session.shift_out();
                    self.io.set_data(bit);
                }
            }
        }

        if new.write_direction() {
            self.io = new;
        } else {
            // the data line is driven by the chip, keep what it last put there
            self.io.0 = (self.io.0 & 0x0001) | (val & 0xFFFE);
        }
    }

    pub fn state(&self) -> RegisterFile {
        self.state
    }

    /// Installs a register file, repairing any date/time field that could not
    /// have been produced by the chip.
    pub fn set_state(&mut self, state: RegisterFile) {
        self.state = state;
        self.state.sanitize();
    }

    pub fn date_time(&self) -> DateTime {
        self.state.date_time()
    }

    pub fn set_date_time(&mut self, dt: DateTime) {
        self.state.set_date_time(dt);
    }

    pub fn session(&self) -> &SerialSession {
        &self.session
    }

    pub fn timer(&self) -> &ClockTimer {
        &self.timer
    }

    pub fn tick_event(&self) -> &Rc<EventInfo> {
        &self.tick_event
    }

    /// One period of the 32768Hz oscillator.
    pub fn clock_timer(&mut self, scheduler: &mut Scheduler) {
        if self.timer.tick() {
            self.state.count_second();
        }

        self.schedule_timer(scheduler, false);
    }

    fn schedule_timer(&mut self, scheduler: &mut Scheduler, first: bool) {
        let delay = self.timer.next_delay(first);
        if first {
            scheduler.add_event(delay, &self.tick_event);
        } else {
            scheduler.add_periodic_event(delay, &self.tick_event);
        }
    }

    fn byte_in(&mut self, val: u8) {
        if self.session.input_pos == 0 {
            self.session.cur_cmd = command::normalize(val, self.console_type);
            if command::is_read(self.session.cur_cmd) {
                self.cmd_read();
            }
            return;
        }

        self.cmd_write(val);
    }

    fn cmd_read(&mut self) {
        let cmd = self.session.cur_cmd;
        let Some(group) = command::decode(cmd, self.console_type) else {
            debug!("RTC: unknown read command {cmd:02X}");
            return;
        };

        let output = &mut self.session.output;
        let state = &mut self.state;
        match group {
            Group::Status1 => {
                output[0] = state.status_reg1.0;
                state.status_reg1.0 &= !STATUS1_AUTO_CLEAR;
            }
            Group::Status2 => output[0] = state.status_reg2.0,
            Group::DateTime => output[..7].copy_from_slice(&state.date_time),
            Group::Time => output[..3].copy_from_slice(&state.date_time[4..]),
            Group::Alarm1 => {
                if state.status_reg2.alarm1_date_form() {
                    output[..3].copy_from_slice(&state.alarm1);
                } else {
                    output[0] = state.alarm1[2];
                }
            }
            Group::Alarm2 => output[..3].copy_from_slice(&state.alarm2),
            Group::ClockAdjust => output[0] = state.clock_adjust,
            Group::FreeReg => output[0] = state.free_reg,
            Group::MinuteCount => output[..3].copy_from_slice(&state.minute_count.to_be_bytes()[1..]),
            Group::Fout1 => output[0] = state.fout1,
            Group::Fout2 => output[0] = state.fout2,
            Group::AlarmDate1 => output[..3].copy_from_slice(&state.alarm_date1),
            Group::AlarmDate2 => output[..3].copy_from_slice(&state.alarm_date2),
        }
    }

    fn cmd_write(&mut self, val: u8) {
        let cmd = self.session.cur_cmd;
        let Some(group) = command::decode(cmd, self.console_type) else {
            debug!("RTC: unknown write command {cmd:02X}");
            return;
        };

        // position of this byte within the data, 1 for the first one
        let pos = self.session.input_pos as usize;
        let state = &mut self.state;
        match group {
            Group::Status1 if pos == 1 => {
                let old = state.status_reg1;

                if val & 0x01 != 0 {
                    *state = RegisterFile::new();
                }

                state.status_reg1.0 = (state.status_reg1.0 & 0xF0) | (val & 0x0E);

                if state.status_reg1.hour_24() != old.hour_24() {
                    state.reinterpret_hour();
                }
            }
            Group::Status2 if pos == 1 => {
                state.status_reg2.0 = val;
                if val & STATUS2_INTERRUPTS != 0 {
                    debug!(
                        "RTC: interrupt on: {:02X}, {:02X} {:02X} {:02X}, {:02X} {:02X} {:02X}",
                        val,
                        state.alarm1[0],
                        state.alarm1[1],
                        state.alarm1[2],
                        state.alarm2[0],
                        state.alarm2[1],
                        state.alarm2[2]
                    );
                }
            }
            Group::DateTime if pos <= 7 => state.write_date_time(pos, val),
            Group::Time if pos <= 3 => state.write_date_time(pos + 4, val),
            Group::Alarm1 => {
                // a hardware quirk, alarm 2 has no single byte form
                if state.status_reg2.alarm1_date_form() {
                    if pos <= 3 {
                        state.alarm1[pos - 1] = val;
                    }
                } else if pos == 1 {
                    state.alarm1[2] = val;
                }
            }
            Group::Alarm2 if pos <= 3 => state.alarm2[pos - 1] = val,
            Group::ClockAdjust if pos == 1 => {
                state.clock_adjust = val;
                debug!("RTC: clock adjust = {val:02X}");
            }
            Group::FreeReg if pos == 1 => state.free_reg = val,
            Group::MinuteCount => debug!("RTC: trying to write read-only minute counter"),
            Group::Fout1 if pos == 1 => state.fout1 = val,
            Group::Fout2 if pos == 1 => state.fout2 = val,
            Group::AlarmDate1 if pos <= 3 => state.alarm_date1[pos - 1] = val,
            Group::AlarmDate2 if pos <= 3 => state.alarm_date2[pos - 1] = val,
            // data beyond the width of the group
            _ => {}
        }
    }

    pub fn save(&self, file: &mut StateWriter) {
        file.section(b"RTC.");

        file.var16(self.io.0);

        file.var8(self.session.input);
        file.var32(self.session.input_bit);
        file.var32(self.session.input_pos);
        file.var_array(&self.session.output);
        file.var32(self.session.output_bit);
        file.var32(self.session.output_pos);
        file.var8(self.session.cur_cmd);

        let state = &self.state;
        file.var8(state.status_reg1.0);
        file.var8(state.status_reg2.0);
        file.var_array(&state.date_time);
        file.var_array(&state.alarm1);
        file.var_array(&state.alarm2);
        file.var8(state.clock_adjust);
        file.var8(state.free_reg);
        file.var8(state.fout1);
        file.var8(state.fout2);
        file.var_array(&state.alarm_date1);
        file.var_array(&state.alarm_date2);
        file.var32(state.minute_count);

        file.var32(self.timer.timer_error as u32);
        file.var32(self.timer.clock_count);
    }

    /// Restores everything written by `save`. Nothing is modified unless the
    /// whole section could be read.
    pub fn load(&mut self, file: &mut StateReader) -> Result<()> {
        file.section(b"RTC.")?;

        let io = RtcIo(file.var16()?);

        let session = SerialSession {
            input: file.var8()?,
            input_bit: file.var32()? & 7,
            input_pos: file.var32()?,
            output: file.var_array()?,
            output_bit: file.var32()? & 7,
            output_pos: file.var32()?.min(7),
            cur_cmd: file.var8()?,
        };

        let state = RegisterFile {
            status_reg1: Status1(file.var8()?),
            status_reg2: Status2(file.var8()?),
            date_time: file.var_array()?,
            alarm1: file.var_array()?,
            alarm2: file.var_array()?,
            clock_adjust: file.var8()?,
            free_reg: file.var8()?,
            fout1: file.var8()?,
            fout2: file.var8()?,
            alarm_date1: file.var_array()?,
            alarm_date2: file.var_array()?,
            minute_count: file.var32()? & 0xFF_FFFF,
        };

        let timer = ClockTimer {
            timer_error: file.var32()? as i32,
            clock_count: file.var32()?,
        };

        self.io = io;
        self.session = session;
        self.set_state(state);
        self.timer = timer;
        Ok(())
    }
}
