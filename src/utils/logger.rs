// src/utils/logger.rs

use env_logger::Builder;
use log::{Level, LevelFilter, SetLoggerError};
use std::io::Write;

/// Installs the stderr logger. Call once, early in `main`.
/// `RUST_LOG` directives, when set, are applied on top of `level`.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  let mut builder = builder(level);
  builder.parse_default_env();
  builder.try_init()
}

fn builder(level: LevelFilter) -> Builder {
  let mut builder = Builder::new();
  builder
    .filter_level(level)
    // Format: "🔴 error  File not found"
    .format(|buf, record| writeln!(buf, "{}  {}", prefix(record.level()), record.args()));
  builder
}

/// Maps a `-v` count to a level filter (0 = info).
pub fn level_from_verbosity(v: u8) -> LevelFilter {
  match v {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  }
}

fn prefix(level: Level) -> &'static str {
  match level {
    Level::Error => "🔴 error",
    Level::Warn => "🟠 warn ",
    Level::Info => "🔵 info ",
    Level::Debug => "⚪ debug",
    Level::Trace => "▫️ trace",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbosity_levels() {
    assert_eq!(level_from_verbosity(0), LevelFilter::Info);
    assert_eq!(level_from_verbosity(1), LevelFilter::Debug);
    assert_eq!(level_from_verbosity(5), LevelFilter::Trace);
  }

  #[test]
  fn test_builder_uses_level() {
    assert_eq!(builder(LevelFilter::Debug).build().filter(), LevelFilter::Debug);
    assert_eq!(builder(LevelFilter::Warn).build().filter(), LevelFilter::Warn);
  }

  #[test]
  fn test_prefixes_are_distinct() {
    let all = [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace];
    for (i, a) in all.iter().enumerate() {
      for b in &all[i + 1..] {
        assert_ne!(prefix(*a), prefix(*b));
      }
    }
  }
}
