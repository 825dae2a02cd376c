use super::*;
use crate::core::config::{ConsoleType, DateTime};
use crate::core::hardware::rtc::SYSTEM_CLOCK;

const SECOND: u64 = SYSTEM_CLOCK as u64;

fn system_at(console_type: ConsoleType, dt: DateTime) -> System {
    System::new(Config {
        console_type,
        boot_date_time: Some(dt),
    })
}

fn dt(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime {
    DateTime { year, month, day, hour, minute, second }
}

#[test]
fn cold_boot_reports_power_loss() {
    let system = System::new(Config::default());
    assert!(system.rtc().state().status_reg1.power_lost());
    assert_eq!(system.rtc().date_time(), dt(2000, 1, 1, 0, 0, 0));
    assert_eq!(system.scheduler().pending(), 1);
}

#[test]
fn boot_date_clears_power_loss() {
    let system = system_at(ConsoleType::Ds, dt(2024, 5, 6, 7, 8, 9));
    assert!(!system.rtc().state().status_reg1.power_lost());
    assert_eq!(system.rtc().date_time(), dt(2024, 5, 6, 7, 8, 9));
}

#[test]
fn one_second_of_cycles_advances_the_clock() {
    let mut system = system_at(ConsoleType::Ds, dt(2024, 2, 28, 23, 59, 59));
    system.run(SECOND - 1);
    assert_eq!(system.rtc().date_time().second, 59);

    system.run(1);
    assert_eq!(system.rtc().date_time(), dt(2024, 2, 29, 0, 0, 0));
}

#[test]
fn clock_stays_exact_over_a_minute() {
    let mut system = system_at(ConsoleType::Dsi, dt(2023, 12, 31, 23, 59, 30));
    for _ in 0..61 {
        system.run(SECOND);
    }
    assert_eq!(system.rtc().date_time(), dt(2024, 1, 1, 0, 0, 31));
    assert_eq!(system.rtc().state().minute_count, 1);
    assert_eq!(system.scheduler().get_current_time(), 61 * SECOND);
    // the tick after the last one is already scheduled, one fraction in
    assert_eq!(system.rtc().timer().timer_error, SYSTEM_CLOCK & 0x7FFF);
}

#[test]
fn byte_write_merges_with_high_half() {
    let mut system = System::new(Config::default());
    system.write_half(RTC_IO, 0xAB10);
    system.write_byte(RTC_IO, 0x12);
    assert_eq!(system.read_half(RTC_IO), 0xAB12);
    assert_eq!(system.read_byte(RTC_IO), 0x12);
}

#[test]
fn unmapped_addresses_read_zero() {
    let mut system = System::new(Config::default());
    system.write_half(0x04000130, 0xFFFF);
    assert_eq!(system.read_half(0x04000130), 0);
    assert_eq!(system.read_byte(0x04000139), 0);
}

#[test]
fn savestate_resumes_deterministically() {
    let mut system = system_at(ConsoleType::Dsi, dt(2030, 6, 30, 23, 59, 58));
    system.run(SECOND + SECOND / 3);
    let saved = system.save_state();

    system.run(3 * SECOND);
    let expected = system.rtc().state();
    let expected_time = system.scheduler().get_current_time();
    let expected_due = system.scheduler().get_event_time();

    let mut restored = System::new(Config {
        console_type: ConsoleType::Dsi,
        boot_date_time: None,
    });
    restored.load_state(&saved).unwrap();
    restored.run(3 * SECOND);

    assert_eq!(restored.rtc().state(), expected);
    assert_eq!(restored.scheduler().get_current_time(), expected_time);
    assert_eq!(restored.scheduler().get_event_time(), expected_due);
    assert_eq!(restored.scheduler().pending(), 1);
    assert_eq!(restored.rtc().date_time(), dt(2030, 7, 1, 0, 0, 2));
}

#[test]
fn bad_savestate_is_rejected_without_side_effects() {
    let mut system = system_at(ConsoleType::Ds, dt(2024, 1, 2, 3, 4, 5));
    let saved = system.save_state();
    system.run(SECOND);

    let before = system.rtc().state();
    let time = system.scheduler().get_current_time();

    assert!(system.load_state(&saved[..saved.len() - 4]).is_err());
    assert!(system.load_state(b"garbage").is_err());

    let mut wrong_section = saved.clone();
    wrong_section[6] = b'X';
    assert!(system.load_state(&wrong_section).is_err());

    assert_eq!(system.rtc().state(), before);
    assert_eq!(system.scheduler().get_current_time(), time);
    assert_eq!(system.scheduler().pending(), 1);
}

#[test]
fn reset_rearms_single_tick() {
    let mut system = system_at(ConsoleType::Ds, dt(2024, 1, 1, 0, 0, 0));
    system.run(SECOND / 2);
    system.reset();
    assert_eq!(system.scheduler().pending(), 1);
    assert_eq!(system.scheduler().get_current_time(), 0);

    system.run(SECOND);
    assert_eq!(system.rtc().date_time(), dt(2024, 1, 1, 0, 0, 1));
}
