//! Log level definitions and OpenTelemetry severity mapping

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Numeric level on the conventional 0..50 scale
    pub fn level_number(&self) -> i32 {
        match self {
            LogLevel::Trace => 0,
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warn => 30,
            LogLevel::Error => 40,
            LogLevel::Fatal => 50,
        }
    }

    /// Resolve a numeric level to the band it falls in
    pub fn from_level_number(number: i32) -> Self {
        match number {
            n if n <= 0 => LogLevel::Trace,
            n if n < 20 => LogLevel::Debug,
            n if n < 30 => LogLevel::Info,
            n if n < 40 => LogLevel::Warn,
            n if n < 50 => LogLevel::Error,
            _ => LogLevel::Fatal,
        }
    }

    /// OpenTelemetry `severity_number` for this level
    pub fn severity_number(&self) -> u8 {
        severity_number(self.level_number())
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Trace => White,
            LogLevel::Debug => Cyan,
            LogLevel::Info => Green,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::Fatal => Magenta,
        }
    }

    /// Resolve a configured level: a name (case-insensitive) or a level number
    pub fn resolve(value: &str) -> Result<Self, LoggerError> {
        let trimmed = value.trim();
        if let Ok(number) = trimmed.parse::<i32>() {
            return Ok(LogLevel::from_level_number(number));
        }
        trimmed.parse()
    }
}

/// Map a numeric level to the OpenTelemetry severity number range it belongs to
///
/// `<= 0` → 1 (TRACE), `1..=19` → 5 (DEBUG), `20..=29` → 9 (INFO),
/// `30..=39` → 13 (WARN), `40..=49` → 17 (ERROR), `>= 50` → 21 (FATAL).
pub fn severity_number(level: i32) -> u8 {
    match level {
        n if n <= 0 => 1,
        n if n < 20 => 5,
        n if n < 30 => 9,
        n if n < 40 => 13,
        n if n < 50 => 17,
        _ => 21,
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" | "CRITICAL" => Ok(LogLevel::Fatal),
            _ => Err(LoggerError::unknown_level(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_number_bands() {
        let cases = [
            (-1, 1),
            (0, 1),
            (5, 5),
            (19, 5),
            (20, 9),
            (30, 13),
            (40, 17),
            (49, 17),
            (50, 21),
            (90, 21),
        ];
        for (level, expected) in cases {
            assert_eq!(severity_number(level), expected, "level {}", level);
        }
    }

    #[test]
    fn test_level_severity_numbers() {
        let numbers: Vec<u8> = LogLevel::ALL.iter().map(|l| l.severity_number()).collect();
        assert_eq!(numbers, vec![1, 5, 9, 13, 17, 21]);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("CRITICAL".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert_eq!(" debug ".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("NOT-A-LEVEL".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_resolve_numeric() {
        assert_eq!(LogLevel::resolve("10").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::resolve("35").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::resolve("ERROR").unwrap(), LogLevel::Error);
        assert!(matches!(
            LogLevel::resolve("loud"),
            Err(LoggerError::UnknownLevel(_))
        ));
    }

    #[test]
    fn test_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Fatal);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
