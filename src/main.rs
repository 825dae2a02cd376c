use std::fs::{self, File};

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use log::{info, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode, WriteLogger,
};

use emulation_station_rtc::core::config::{Config, ConsoleType, DateTime};
use emulation_station_rtc::core::hardware::rtc::SYSTEM_CLOCK;
use emulation_station_rtc::core::{System, RTC_IO};

const USAGE: &str = "usage: emulation-station-rtc [--dsi] [--seconds N] [--date \"YYYY-MM-DD HH:MM:SS\"] [--load PATH] [--save PATH]";

struct Args {
    config: Config,
    seconds: u64,
    load: Option<String>,
    save: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: Config::default(),
        seconds: 10,
        load: None,
        save: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dsi" => args.config.console_type = ConsoleType::Dsi,
            "--seconds" => {
                let val = iter.next().context("--seconds needs a value")?;
                args.seconds = val.parse().with_context(|| format!("invalid second count '{val}'"))?;
            }
            "--date" => {
                let val = iter.next().context("--date needs a value")?;
                let dt = NaiveDateTime::parse_from_str(&val, "%Y-%m-%d %H:%M:%S")
                    .with_context(|| format!("invalid date '{val}'"))?;
                args.config.boot_date_time = Some(DateTime {
                    year: dt.year(),
                    month: dt.month(),
                    day: dt.day(),
                    hour: dt.hour(),
                    minute: dt.minute(),
                    second: dt.second(),
                });
            }
            "--load" => args.load = Some(iter.next().context("--load needs a path")?),
            "--save" => args.save = Some(iter.next().context("--save needs a path")?),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => bail!("unknown argument '{arg}'\n{USAGE}"),
        }
    }

    Ok(args)
}

/// Reads a register group the way firmware does: chip select, command byte
/// out, then `len` bytes back, one clock pulse per bit.
fn serial_read(system: &mut System, cmd: u8, len: usize) -> Vec<u8> {
    const DATA: u16 = 1 << 0;
    const CLOCK: u16 = 1 << 1;
    const SELECT: u16 = 1 << 2;
    const WRITE: u16 = 1 << 4;

    system.write_half(RTC_IO, WRITE | CLOCK);
    system.write_half(RTC_IO, WRITE | CLOCK | SELECT);

    for i in 0..8 {
        let bit = ((cmd >> i) & 1) as u16 * DATA;
        system.write_half(RTC_IO, WRITE | SELECT | bit);
        system.write_half(RTC_IO, WRITE | SELECT | CLOCK | bit);
    }

    let mut out = vec![0u8; len];
    for byte in out.iter_mut() {
        for i in 0..8 {
            system.write_half(RTC_IO, SELECT);
            system.write_half(RTC_IO, SELECT | CLOCK);
            if system.read_half(RTC_IO) & DATA != 0 {
                *byte |= 1 << i;
            }
        }
    }

    system.write_half(RTC_IO, WRITE | CLOCK);
    out
}

fn main() -> Result<()> {
    color_backtrace::install();
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .build();
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(
            LevelFilter::Trace,
            config,
            File::create("out.log").context("creating out.log")?,
        ),
    ])?;

    let args = parse_args()?;
    let console_type = args.config.console_type;
    let mut system = System::new(args.config);

    if let Some(path) = &args.load {
        let data = fs::read(path).with_context(|| format!("reading {path}"))?;
        system.load_state(&data).with_context(|| format!("loading {path}"))?;
        info!("Loaded state from {path}");
    }

    for _ in 0..args.seconds {
        system.run(SYSTEM_CLOCK as u64);

        // date and time, read back over the serial bus
        let regs = serial_read(&mut system, 0xA6, 7);
        info!(
            "RTC: 20{:02x}-{:02x}-{:02x} {:02x}:{:02x}:{:02x} (day of week {})",
            regs[0],
            regs[1],
            regs[2],
            regs[4] & 0x3F,
            regs[5],
            regs[6],
            regs[3]
        );
    }

    if console_type == ConsoleType::Dsi {
        let count = serial_read(&mut system, 0x8E, 3);
        info!("RTC: minute counter {:02x}{:02x}{:02x}", count[0], count[1], count[2]);
    }

    if let Some(path) = &args.save {
        fs::write(path, system.save_state()).with_context(|| format!("writing {path}"))?;
        info!("Saved state to {path}");
    }

    Ok(())
}
