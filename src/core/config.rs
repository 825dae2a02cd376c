#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleType {
    #[default]
    Ds,
    /// Enables the extended RTC command set (minute counter, FOUT, alarm dates)
    Dsi,
}

/// Calendar value handed to the RTC by the host, in plain binary.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

#[derive(Default, Clone, Debug)]
pub struct Config {
    pub console_type: ConsoleType,
    /// Seeds the RTC registers after every reset when present
    pub boot_date_time: Option<DateTime>,
}
