use crate::core::hardware::rtc::registers::RegisterFile;
use crate::util::from_bcd;

/// ARM7 bus clock in Hz, the unit of every scheduler delay.
pub const SYSTEM_CLOCK: i32 = 33_513_982;

/// The RTC oscillator runs at 32768Hz, so one tick is `SYSTEM_CLOCK >> 15` cycles
/// plus a fractional part that has to be carried between ticks.
pub const TICKS_PER_SECOND: u32 = 1 << 15;

const FRACTION_MASK: i32 = (TICKS_PER_SECOND - 1) as i32;

/// Adds one to a BCD value, carrying between the two digits.
pub const fn bcd_increment(val: u8) -> u8 {
    let mut val = val.wrapping_add(1);
    if (val & 0x0F) >= 0x0A {
        val = val.wrapping_add(0x06);
    }
    if (val & 0xF0) >= 0xA0 {
        val = val.wrapping_add(0x60);
    }
    val
}

/// Returns `val` if it is a valid BCD number within `min..=max`, otherwise `min`.
pub const fn bcd_sanitize(val: u8, min: u8, max: u8) -> u8 {
    if val < min || val > max || (val & 0x0F) >= 0x0A || (val & 0xF0) >= 0xA0 {
        min
    } else {
        val
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockTimer {
    pub clock_count: u32,
    pub timer_error: i32,
}

impl ClockTimer {
    /// Computes the delay in system cycles until the next oscillator tick.
    ///
    /// `cold` discards the carried fraction, which only happens when the
    /// timer is started from scratch.
    pub fn next_delay(&mut self, cold: bool) -> u64 {
        if cold {
            self.timer_error = 0;
        }

        let sysclock = SYSTEM_CLOCK + self.timer_error;
        let delay = sysclock >> 15;
        self.timer_error = sysclock & FRACTION_MASK;
        delay as u64
    }

    /// Counts one oscillator tick. Returns true when a whole second has passed.
    pub fn tick(&mut self) -> bool {
        self.clock_count = self.clock_count.wrapping_add(1);
        self.clock_count & (TICKS_PER_SECOND - 1) == 0
    }
}

impl RegisterFile {
    /// Length of the current month, in BCD. Zero for a month value that is not
    /// a valid BCD month.
    pub fn days_in_month(&self) -> u8 {
        match self.date_time[1] {
            0x01 | 0x03 | 0x05 | 0x07 | 0x08 | 0x10 | 0x12 => 0x31,
            0x04 | 0x06 | 0x09 | 0x11 => 0x30,
            0x02 => {
                // the year range is 2000-2099, so every fourth year is a leap year
                if from_bcd(self.date_time[0]) & 3 == 0 {
                    0x29
                } else {
                    0x28
                }
            }
            _ => 0,
        }
    }

    pub fn check_end_of_month(&mut self) {
        if self.date_time[2] > self.days_in_month() {
            self.date_time[2] = 1;
            self.count_month();
        }
    }

    pub fn count_second(&mut self) {
        self.date_time[6] = bcd_increment(self.date_time[6]);
        if self.date_time[6] >= 0x60 {
            self.date_time[6] = 0;
            self.count_minute();
        }
    }

    fn count_minute(&mut self) {
        self.minute_count = (self.minute_count + 1) & 0xFF_FFFF;
        self.date_time[5] = bcd_increment(self.date_time[5]);
        if self.date_time[5] >= 0x60 {
            self.date_time[5] = 0;
            self.count_hour();
        }
    }

    fn count_hour(&mut self) {
        let mut hour = bcd_increment(self.date_time[4] & 0x3F);
        let mut pm = self.date_time[4] & 0x40;

        if self.status_reg1.hour_24() {
            if hour >= 0x24 {
                hour = 0;
                self.count_day();
            }

            pm = if hour >= 0x12 { 0x40 } else { 0 };
        } else if hour >= 0x12 {
            hour = 0;
            if pm != 0 {
                self.count_day();
            }
            pm ^= 0x40;
        }

        self.date_time[4] = hour | pm;
    }

    fn count_day(&mut self) {
        // day of week is a plain counter, software decides which day 0 is
        self.date_time[3] += 1;
        if self.date_time[3] >= 7 {
            self.date_time[3] = 0;
        }

        self.date_time[2] = bcd_increment(self.date_time[2]);
        self.check_end_of_month();
    }

    fn count_month(&mut self) {
        self.date_time[1] = bcd_increment(self.date_time[1]);
        if self.date_time[1] > 0x12 {
            self.date_time[1] = 1;
            self.count_year();
        }
    }

    fn count_year(&mut self) {
        self.date_time[0] = bcd_increment(self.date_time[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hardware::rtc::registers::Status1;

    fn calendar(date_time: [u8; 7], hour_24: bool) -> RegisterFile {
        let mut state = RegisterFile::new();
        state.status_reg1 = Status1(0).with_hour_24(hour_24);
        state.date_time = date_time;
        state
    }

    #[test]
    fn increment_carries_decimal_digits() {
        assert_eq!(bcd_increment(0x00), 0x01);
        assert_eq!(bcd_increment(0x09), 0x10);
        assert_eq!(bcd_increment(0x19), 0x20);
        assert_eq!(bcd_increment(0x59), 0x60);
        assert_eq!(bcd_increment(0x99), 0x00);
    }

    #[test]
    fn sanitize_rejects_out_of_range_and_bad_nibbles() {
        assert_eq!(bcd_sanitize(0x23, 0x00, 0x59), 0x23);
        assert_eq!(bcd_sanitize(0x60, 0x00, 0x59), 0x00);
        assert_eq!(bcd_sanitize(0x1A, 0x00, 0x59), 0x00);
        assert_eq!(bcd_sanitize(0x00, 0x01, 0x12), 0x01);
        assert_eq!(bcd_sanitize(0xA0, 0x00, 0xFF), 0x00);
    }

    #[test]
    fn second_carries_into_minute() {
        let mut state = calendar([0x24, 0x05, 0x10, 0x02, 0x08, 0x30, 0x59], true);
        state.count_second();
        assert_eq!(state.date_time[6], 0x00);
        assert_eq!(state.date_time[5], 0x31);
        assert_eq!(state.minute_count, 1);
    }

    #[test]
    fn leap_years_have_long_february() {
        let leap = calendar([0x24, 0x02, 0x01, 0, 0, 0, 0], true);
        assert_eq!(leap.days_in_month(), 0x29);

        let common = calendar([0x23, 0x02, 0x01, 0, 0, 0, 0], true);
        assert_eq!(common.days_in_month(), 0x28);

        let century = calendar([0x00, 0x02, 0x01, 0, 0, 0, 0], true);
        assert_eq!(century.days_in_month(), 0x29);

        let invalid = calendar([0x00, 0x13, 0x01, 0, 0, 0, 0], true);
        assert_eq!(invalid.days_in_month(), 0);
    }

    #[test]
    fn month_lengths_match_chrono() {
        use chrono::{Datelike, NaiveDate};

        for year in [2023, 2024] {
            for month in 1..=12u32 {
                let state = calendar([crate::util::to_bcd((year - 2000) as u8), crate::util::to_bcd(month as u8), 1, 0, 0, 0, 0], true);
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
                .unwrap();
                let last = next.pred_opt().unwrap().day() as u8;
                assert_eq!(from_bcd(state.days_in_month()), last, "{year}-{month}");
            }
        }
    }

    #[test]
    fn new_year_rolls_every_field() {
        let mut state = calendar([0x99, 0x12, 0x31, 0x06, 0x23, 0x59, 0x59], true);
        state.count_second();
        assert_eq!(state.date_time, [0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn end_of_february_in_common_year() {
        let mut state = calendar([0x23, 0x02, 0x28, 0x02, 0x23, 0x59, 0x59], true);
        state.count_second();
        assert_eq!(&state.date_time[..4], &[0x23, 0x03, 0x01, 0x03]);
    }

    #[test]
    fn twenty_four_hour_mode_tracks_pm_flag() {
        let mut state = calendar([0x24, 0x01, 0x01, 0x00, 0x11, 0x59, 0x59], true);
        state.count_second();
        assert_eq!(state.date_time[4], 0x12 | 0x40);
        assert_eq!(state.date_time[2], 0x01);
    }

    #[test]
    fn twelve_hour_mode_counts_day_on_pm_to_am_only() {
        // 11:59:59 AM -> 12 o'clock PM, same day
        let mut state = calendar([0x24, 0x01, 0x01, 0x00, 0x11, 0x59, 0x59], false);
        state.count_second();
        assert_eq!(state.date_time[4], 0x40);
        assert_eq!(state.date_time[2], 0x01);

        // 11:59:59 PM -> 12 o'clock AM, next day
        let mut state = calendar([0x24, 0x01, 0x01, 0x00, 0x51, 0x59, 0x59], false);
        state.count_second();
        assert_eq!(state.date_time[4], 0x00);
        assert_eq!(state.date_time[2], 0x02);
        assert_eq!(state.date_time[3], 0x01);
    }

    #[test]
    fn minute_counter_is_independent_of_calendar() {
        let mut state = calendar([0x99, 0x12, 0x31, 0x06, 0x23, 0x59, 0x59], true);
        state.minute_count = 0xFF_FFFF;
        state.count_second();
        assert_eq!(state.minute_count, 0);
        state.date_time[6] = 0x59;
        state.count_second();
        assert_eq!(state.minute_count, 1);
    }

    #[test]
    fn delays_sum_to_one_second_without_drift() {
        let mut timer = ClockTimer::default();
        let mut total = timer.next_delay(true);
        for _ in 1..TICKS_PER_SECOND {
            total += timer.next_delay(false);
        }
        assert_eq!(total, SYSTEM_CLOCK as u64);
        assert_eq!(timer.timer_error, 0);

        // and keeps doing so over the following seconds
        for _ in 0..TICKS_PER_SECOND * 3 {
            total += timer.next_delay(false);
        }
        assert_eq!(total, 4 * SYSTEM_CLOCK as u64);
    }

    #[test]
    fn cold_restart_discards_fraction() {
        let mut timer = ClockTimer::default();
        timer.next_delay(true);
        assert_ne!(timer.timer_error, 0);
        timer.timer_error = 0x1234;
        assert_eq!(timer.next_delay(true), (SYSTEM_CLOCK >> 15) as u64);
        assert_eq!(timer.timer_error, SYSTEM_CLOCK & FRACTION_MASK);
    }

    #[test]
    fn second_elapses_every_32768_ticks() {
        let mut timer = ClockTimer::default();
        let seconds = (0..TICKS_PER_SECOND * 2).filter(|_| timer.tick()).count();
        assert_eq!(seconds, 2);
    }
}
