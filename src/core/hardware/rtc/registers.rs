use crate::bitfield;
use crate::core::config::DateTime;
use crate::core::hardware::rtc::clock::bcd_sanitize;
use crate::util::{from_bcd, to_bcd};

bitfield! {
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct Status1(pub u8) {
        pub reset: bool => 0,
        pub hour_24: bool => 1,
        pub general: u8 => 2 | 3,
        pub int1_flag: bool => 4,
        pub int2_flag: bool => 5,
        pub battery_low: bool => 6,
        pub power_lost: bool => 7
    }
}

bitfield! {
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct Status2(pub u8) {
        pub int1_mode: u8 => 0 | 3,
        // alarm 1 takes a day/hour/minute triplet instead of a single byte
        pub alarm1_date_form: bool => 2,
        // 4 | 5
        pub int2_enable: bool => 6,
        pub test: bool => 7
    }
}

/// Bits of status register 1 that read back once and then clear themselves.
pub const STATUS1_AUTO_CLEAR: u8 = 0xF0;

/// Status register 2 bits that enable either interrupt line.
pub const STATUS2_INTERRUPTS: u8 = 0x4F;

/// Every register visible through the serial interface.
///
/// `date_time` is year, month, day, day of week, hour, minute, second, all in
/// BCD. Bit 6 of the hour byte is the PM flag.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    pub status_reg1: Status1,
    pub status_reg2: Status2,
    pub date_time: [u8; 7],
    pub alarm1: [u8; 3],
    pub alarm2: [u8; 3],
    pub clock_adjust: u8,
    pub free_reg: u8,
    pub fout1: u8,
    pub fout2: u8,
    pub alarm_date1: [u8; 3],
    pub alarm_date2: [u8; 3],
    /// 24-bit count of elapsed minutes
    pub minute_count: u32,
}

impl RegisterFile {
    /// Register contents after a reset: 2000-01-01 00:00:00, everything else clear.
    pub fn new() -> Self {
        let mut state = Self::default();
        state.date_time[1] = 1;
        state.date_time[2] = 1;
        state
    }

    /// Stores one byte of the date/time group. `num` counts from 1 (year) to
    /// 7 (second), matching the byte position within a serial transfer.
    pub fn write_date_time(&mut self, num: usize, val: u8) {
        match num {
            1 => self.date_time[0] = bcd_sanitize(val, 0x00, 0x99),
            2 => self.date_time[1] = bcd_sanitize(val & 0x1F, 0x01, 0x12),
            3 => {
                self.date_time[2] = bcd_sanitize(val & 0x3F, 0x01, 0x31);
                self.check_end_of_month();
            }
            4 => self.date_time[3] = bcd_sanitize(val & 0x07, 0x00, 0x06),
            5 => {
                let mut hour = val & 0x3F;
                let mut pm = val & 0x40;

                if self.status_reg1.hour_24() {
                    hour = bcd_sanitize(hour, 0x00, 0x23);
                    pm = if hour >= 0x12 { 0x40 } else { 0 };
                } else {
                    hour = bcd_sanitize(hour, 0x00, 0x11);
                }

                self.date_time[4] = hour | pm;
            }
            6 => self.date_time[5] = bcd_sanitize(val & 0x7F, 0x00, 0x59),
            7 => self.date_time[6] = bcd_sanitize(val & 0x7F, 0x00, 0x59),
            _ => {}
        }
    }

    /// Runs every date/time byte back through the write path.
    pub fn sanitize(&mut self) {
        let date_time = self.date_time;
        for (i, val) in date_time.into_iter().enumerate() {
            self.write_date_time(i + 1, val);
        }
    }

    /// Converts the stored hour after the 12/24-hour mode bit changed.
    pub fn reinterpret_hour(&mut self) {
        let mut hour = self.date_time[4] & 0x3F;
        let mut pm = self.date_time[4] & 0x40;

        if self.status_reg1.hour_24() {
            if pm != 0 {
                hour += 0x12;
                if (hour & 0x0F) >= 0x0A {
                    hour += 0x06;
                }
            }

            hour = bcd_sanitize(hour, 0x00, 0x23);
        } else {
            if hour >= 0x12 {
                pm = 0x40;

                hour -= 0x12;
                if (hour & 0x0F) >= 0x0A {
                    hour -= 0x06;
                }
            } else {
                pm = 0;
            }

            hour = bcd_sanitize(hour, 0x00, 0x11);
        }

        self.date_time[4] = hour | pm;
    }

    pub fn date_time(&self) -> DateTime {
        let mut hour = from_bcd(self.date_time[4] & 0x3F) as u32;
        if !self.status_reg1.hour_24() && self.date_time[4] & 0x40 != 0 {
            hour += 12;
        }

        DateTime {
            year: 2000 + from_bcd(self.date_time[0]) as i32,
            month: from_bcd(self.date_time[1] & 0x3F) as u32,
            day: from_bcd(self.date_time[2] & 0x3F) as u32,
            hour,
            minute: from_bcd(self.date_time[5] & 0x7F) as u32,
            second: from_bcd(self.date_time[6] & 0x7F) as u32,
        }
    }

    /// Loads a plain calendar value, replacing anything out of range with a default.
    pub fn set_date_time(&mut self, dt: DateTime) {
        let mut month_days = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

        // the chip only knows 2000-2099
        let year = (dt.year % 100).max(0) as u32;
        if year & 3 == 0 {
            month_days[2] = 29;
        }

        let month = if (1..=12).contains(&dt.month) { dt.month } else { 1 };
        let day = if dt.day >= 1 && dt.day <= month_days[month as usize] { dt.day } else { 1 };
        let mut hour = if dt.hour <= 23 { dt.hour } else { 0 };
        let minute = if dt.minute <= 59 { dt.minute } else { 0 };
        let second = if dt.second <= 59 { dt.second } else { 0 };

        // DS/DSi firmware counts the day of week from 0 = Sunday; 2000-01-01 was a Saturday
        let mut num_days = year * 365 + (year + 3) / 4;
        num_days += month_days[1..month as usize].iter().sum::<u32>();
        num_days += day - 1;
        let day_of_week = (6 + num_days) % 7;

        let pm = if hour >= 12 { 0x40 } else { 0 };
        if !self.status_reg1.hour_24() && pm != 0 {
            hour -= 12;
        }

        self.date_time = [
            to_bcd(year as u8),
            to_bcd(month as u8),
            to_bcd(day as u8),
            day_of_week as u8,
            to_bcd(hour as u8) | pm,
            to_bcd(minute as u8),
            to_bcd(second as u8),
        ];

        self.status_reg1.set_power_lost(false);
    }
}
