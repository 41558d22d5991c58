//! MS-DOS packed date and time, as stored in every entry header.

use std::time::SystemTime;

use binrw::{BinRead, BinWrite};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};

/// Packed MS-DOS timestamp
///
/// Resolution is two seconds and the representable range is 1980 to 2107.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[brw(little)]
pub struct DosDateTime {
    /// Bits 0-4 seconds divided by 2, bits 5-10 minute, bits 11-15 hour
    pub time: u16,

    /// Bits 0-4 day of the month, bits 5-8 month, bits 9-15 years since 1980
    pub date: u16,
}

impl DosDateTime {
    const MIN_YEAR: i32 = 1980;
    const MAX_YEAR: i32 = 2107;

    /// Packs calendar components, `None` when they fall outside the DOS range.
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return None;
        }

        Some(Self {
            time: ((second / 2) | (minute << 5) | (hour << 11)) as u16,
            date: (day | (month << 5) | (((year - Self::MIN_YEAR) as u32) << 9)) as u16,
        })
    }

    pub fn second(&self) -> u32 {
        (self.time & 0x1f) as u32 * 2
    }

    pub fn minute(&self) -> u32 {
        ((self.time >> 5) & 0x3f) as u32
    }

    pub fn hour(&self) -> u32 {
        (self.time >> 11) as u32
    }

    pub fn day(&self) -> u32 {
        (self.date & 0x1f) as u32
    }

    pub fn month(&self) -> u32 {
        ((self.date >> 5) & 0x0f) as u32
    }

    pub fn year(&self) -> i32 {
        (self.date >> 9) as i32 + Self::MIN_YEAR
    }

    /// Packs a calendar time, clamping it into the DOS range.
    pub fn from_naive(value: NaiveDateTime) -> Self {
        let (year, month, day, hour, minute, second) = match value.year() {
            y if y < Self::MIN_YEAR => (Self::MIN_YEAR, 1, 1, 0, 0, 0),
            y if y > Self::MAX_YEAR => (Self::MAX_YEAR, 12, 31, 23, 59, 58),
            y => (
                y,
                value.month(),
                value.day(),
                value.hour(),
                value.minute(),
                value.second(),
            ),
        };

        Self::new(year, month, day, hour, minute, second).unwrap_or_default()
    }

    /// Unpacks into a calendar time, `None` if the packed fields are not a real date.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year(), self.month(), self.day())?.and_hms_opt(
            self.hour(),
            self.minute(),
            self.second(),
        )
    }

    /// Packs a system time interpreted in the local timezone.
    pub fn from_system_time(value: SystemTime) -> Self {
        Self::from_naive(DateTime::<Local>::from(value).naive_local())
    }

    /// Unpacks to a system time in the local timezone. Invalid values yield the current time.
    pub fn to_system_time(&self) -> SystemTime {
        self.to_naive()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .map(SystemTime::from)
            .unwrap_or_else(SystemTime::now)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }
}
