use anyhow::{Context, Result};
use log::{debug, warn};

use crate::core::config::Config;
use crate::core::hardware::rtc::Rtc;
use crate::core::savestate::{StateReader, StateWriter};
use crate::core::scheduler::Scheduler;

pub mod config;
pub mod hardware;
pub mod savestate;
pub mod scheduler;

/// Address of the RTC I/O register in the ARM7 I/O space.
pub const RTC_IO: u32 = 0x04000138;

pub struct System {
    rtc: Rtc,
    scheduler: Scheduler,
    config: Config,
}

impl System {
    pub fn new(config: Config) -> Self {
        let mut system = Self {
            rtc: Rtc::new(config.console_type),
            scheduler: Scheduler::default(),
            config,
        };
        system.reset();
        system
    }

    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.rtc.set_console_type(self.config.console_type);
        self.rtc.reset(&mut self.scheduler);

        if let Some(dt) = self.config.boot_date_time {
            self.rtc.set_date_time(dt);
        }

        debug!("System: reset ({:?})", self.config.console_type);
    }

    pub fn rtc(&self) -> &Rtc {
        &self.rtc
    }

    pub fn rtc_mut(&mut self) -> &mut Rtc {
        &mut self.rtc
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn read_half(&mut self, addr: u32) -> u16 {
        match addr {
            RTC_IO => self.rtc.read_io(),
            _ => {
                warn!("System: handle 16-bit read {addr:08x}");
                0
            }
        }
    }

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        match addr {
            RTC_IO => self.rtc.read_io() as u8,
            _ => {
                warn!("System: handle 8-bit read {addr:08x}");
                0
            }
        }
    }

    pub fn write_half(&mut self, addr: u32, val: u16) {
        match addr {
            RTC_IO => self.rtc.write_io(val),
            _ => warn!("System: handle 16-bit write {addr:08x} = {val:04x}"),
        }
    }

    pub fn write_byte(&mut self, addr: u32, val: u8) {
        match addr {
            RTC_IO => self.rtc.write_io_byte(val),
            _ => warn!("System: handle 8-bit write {addr:08x} = {val:02x}"),
        }
    }

    /// Advances emulated time by `cycles` system cycles, firing every event
    /// that falls due on the way.
    pub fn run(&mut self, cycles: u64) {
        let end = self.scheduler.get_current_time() + cycles;
        while self.scheduler.get_current_time() < end {
            let next = self.scheduler.get_event_time().min(end);
            self.scheduler.tick(next - self.scheduler.get_current_time());
            self.run_events();
        }
    }

    fn run_events(&mut self) {
        while let Some(event) = self.scheduler.pop_due() {
            (event.callback())(self);
        }
    }

    pub fn save_state(&self) -> Vec<u8> {
        let mut file = StateWriter::new();

        file.section(b"SCHD");
        file.var64(self.scheduler.get_current_time());
        let due = self.scheduler.find_event(self.rtc.tick_event()).unwrap_or(u64::MAX);
        file.var64(due);

        self.rtc.save(&mut file);
        file.finish()
    }

    /// Restores a state produced by `save_state`. A state that fails to parse
    /// leaves the system as it was.
    pub fn load_state(&mut self, data: &[u8]) -> Result<()> {
        let mut file = StateReader::new(data)?;

        file.section(b"SCHD").context("scheduler section")?;
        let current_time = file.var64()?;
        let due = file.var64()?;

        self.rtc.load(&mut file).context("RTC section")?;

        // the pending tick belongs to the live registration, re-arm it where the saved one was
        let tick_event = self.rtc.tick_event().clone();
        self.scheduler.cancel_event(&tick_event);
        self.scheduler.set_current_time(current_time);
        if due != u64::MAX {
            self.scheduler.add_event(due.saturating_sub(current_time), &tick_event);
        }

        debug!("System: loaded state version {}", file.version());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
