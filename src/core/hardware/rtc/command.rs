//! Command byte decoding.
//!
//! A command byte is `rggg cccc`: `cccc` selects the command class, `ggg` the
//! register group and `r` the direction (1 = read). The chip also accepts the
//! whole byte sent most significant bit first, in which case the class nibble
//! arrives as the high nibble and the group/direction bits are mirrored.

use crate::core::config::ConsoleType;

pub const CLASS_BASE: u8 = 0x06;
pub const CLASS_EXTENDED: u8 = 0x0E;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Status1,
    Status2,
    DateTime,
    Time,
    Alarm1,
    Alarm2,
    ClockAdjust,
    FreeReg,
    MinuteCount,
    Fout1,
    Fout2,
    AlarmDate1,
    AlarmDate2,
}

struct Registry {
    class: u8,
    groups: [Option<Group>; 8],
}

const BASE: Registry = Registry {
    class: CLASS_BASE,
    groups: [
        Some(Group::Status1),
        Some(Group::Alarm1),
        Some(Group::DateTime),
        Some(Group::ClockAdjust),
        Some(Group::Status2),
        Some(Group::Alarm2),
        Some(Group::Time),
        Some(Group::FreeReg),
    ],
};

const EXTENDED: Registry = Registry {
    class: CLASS_EXTENDED,
    groups: [
        Some(Group::MinuteCount),
        Some(Group::AlarmDate1),
        Some(Group::Fout2),
        None,
        Some(Group::Fout1),
        Some(Group::AlarmDate2),
        None,
        None,
    ],
};

const DS_REGISTRIES: &[Registry] = &[BASE];
const DSI_REGISTRIES: &[Registry] = &[BASE, EXTENDED];

const fn registries(console_type: ConsoleType) -> &'static [Registry] {
    match console_type {
        ConsoleType::Ds => DS_REGISTRIES,
        ConsoleType::Dsi => DSI_REGISTRIES,
    }
}

/// Mirrors the low nibble of `val` into the group/direction bits of a
/// command of the given class.
pub const fn reverse_command(val: u8, class: u8) -> u8 {
    let nibble = val & 0xF;
    let mirrored = ((nibble & 0x1) << 3) | ((nibble & 0x2) << 1) | ((nibble & 0x4) >> 1) | ((nibble & 0x8) >> 3);
    (mirrored << 4) | class
}

/// Brings a received command byte into `rggg cccc` form.
pub fn normalize(val: u8, console_type: ConsoleType) -> u8 {
    let mut cmd = if val & 0xF0 == 0x60 {
        reverse_command(val, CLASS_BASE)
    } else {
        val
    };

    // 0x76/0x77 are regular free register commands
    if console_type == ConsoleType::Dsi && cmd & 0xF0 == 0x70 && cmd & 0xFE != 0x76 {
        cmd = reverse_command(cmd, CLASS_EXTENDED);
    }

    cmd
}

/// Looks up the register group a normalized command addresses on this console.
pub fn decode(cmd: u8, console_type: ConsoleType) -> Option<Group> {
    registries(console_type)
        .iter()
        .find(|registry| registry.class == cmd & 0x0F)
        .and_then(|registry| registry.groups[((cmd >> 4) & 0x7) as usize])
}

pub const fn is_read(cmd: u8) -> bool {
    cmd & 0x80 != 0
}
