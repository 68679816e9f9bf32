use std::fmt;
use std::ops::Add;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Seconds since the start of the service day. Trips running past midnight
/// keep counting past 86400 instead of wrapping, so a 25:10:00 departure
/// stays ordered after everything earlier on the same service day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time(u32);

impl Time {
    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    /// Parses the feed's `HH:MM:SS` form. Hours may exceed 23.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split(':').collect();
        if parts.len() != 3 {
            bail!("Not in HH:MM:SS format: {raw}");
        }
        let hours: u32 = parts[0].parse()?;
        let minutes: u32 = parts[1].parse()?;
        let seconds: u32 = parts[2].parse()?;
        if minutes > 59 || seconds > 59 {
            bail!("Minutes or seconds out of range: {raw}");
        }
        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }

    /// Whole seconds since `earlier`, clamped at zero.
    pub fn seconds_since(self, earlier: Time) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u32> for Time {
    type Output = Time;

    fn add(self, seconds: u32) -> Time {
        Time(self.0 + seconds)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 % 3600) / 60,
            self.0 % 60
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ordinary_times() {
        assert_eq!(Time::parse("08:30:00").unwrap(), Time::from_seconds(30600));
        assert_eq!(Time::parse("00:00:00").unwrap(), Time::from_seconds(0));
        assert_eq!(Time::parse("23:59:59").unwrap(), Time::from_seconds(86399));
        // Single-digit hours appear in the wild
        assert_eq!(Time::parse("8:30:00").unwrap(), Time::from_seconds(30600));
    }

    #[test]
    fn parse_past_midnight() {
        assert_eq!(Time::parse("24:00:00").unwrap(), Time::from_seconds(86400));
        assert_eq!(Time::parse("25:10:00").unwrap(), Time::from_seconds(90600));
        assert!(Time::parse("25:10:00").unwrap() > Time::parse("23:59:59").unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Time::parse("").is_err());
        assert!(Time::parse("08:30").is_err());
        assert!(Time::parse("08:30:00:00").is_err());
        assert!(Time::parse("soon").is_err());
        assert!(Time::parse("08:61:00").is_err());
        assert!(Time::parse("08:30:61").is_err());
    }

    #[test]
    fn display_round_trips() {
        for raw in ["00:00:00", "08:05:09", "25:10:00"] {
            assert_eq!(Time::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn arithmetic() {
        let t = Time::parse("08:00:00").unwrap();
        assert_eq!(t + 300, Time::parse("08:05:00").unwrap());
        assert_eq!((t + 300).seconds_since(t), 300);
        assert_eq!(t.seconds_since(t + 300), 0);
    }
}
