//! Calendar date parsing.
//!
//! Accepts ISO-8601-like text:
//! `[-]YYYY-MM-DD[(T|space)HH:MM[:SS[.F+]]][Z|±HH:MM]`
//! and yields a [`CalendarDate`]. The parser is independent of any backend;
//! drivers that store dates as text call it from their date conversion.

use crate::core::{DatabaseError, Result};
use std::fmt;
use std::str::FromStr;

const MS_PER_DAY: f64 = 86_400_000.0;

/// An immutable (year, month, day) triple with no timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CalendarDate {
    year: i32,
    month: u32,
    day: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        CalendarDate { year, month, day }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Converts to a chrono date, `None` for impossible dates such as 02-31.
    pub fn to_naive_date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year < 0 {
            f.write_str("-")?;
        }
        write!(f, "{:04}-{:02}-{:02}", self.year.unsigned_abs(), self.month, self.day)
    }
}

impl FromStr for CalendarDate {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        parse_date(s)
    }
}

impl From<chrono::NaiveDate> for CalendarDate {
    fn from(d: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        CalendarDate::new(d.year(), d.month(), d.day())
    }
}

/// Time of day; seconds carry the fractional part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
}

/// A fully parsed date/time value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateTime {
    date: CalendarDate,
    time: Option<TimeOfDay>,
    tz_offset: Option<i32>,
}

impl DateTime {
    pub fn date(&self) -> CalendarDate {
        self.date
    }

    pub fn time(&self) -> Option<TimeOfDay> {
        self.time
    }

    /// Timezone offset in minutes when a `Z` or `±HH:MM` suffix was given.
    pub fn tz_offset(&self) -> Option<i32> {
        self.tz_offset
    }

    /// Milliseconds on the julian-day timeline (julian day number × 86400000).
    ///
    /// Gregorian-to-julian conversion after Meeus. A missing time of day
    /// counts as midnight and the timezone offset is subtracted.
    ///
    /// # Errors
    ///
    /// Returns a date parse error for years outside `-4713..=9999`.
    pub fn julian_ms(&self) -> Result<i64> {
        let (mut y, mut m, d) = (self.date.year, self.date.month as i32, self.date.day as i32);
        if !(-4713..=9999).contains(&y) {
            return Err(DatabaseError::date_parse());
        }
        if m <= 2 {
            y -= 1;
            m += 12;
        }
        let a = y / 100;
        let b = 2 - a + a / 4;
        let x1 = 36525 * (y + 4716) / 100;
        let x2 = 306001 * (m + 1) / 10000;
        let mut jd = ((f64::from(x1 + x2 + d + b) - 1524.5) * MS_PER_DAY) as i64;
        if let Some(t) = self.time {
            jd += i64::from(t.hour) * 3_600_000
                + i64::from(t.minute) * 60_000
                + (t.second * 1000.0) as i64;
        }
        if let Some(tz) = self.tz_offset {
            jd -= i64::from(tz) * 60_000;
        }
        Ok(jd)
    }
}

/// Parses `s` and returns only the calendar date.
///
/// # Errors
///
/// Returns a date parse error for malformed text. The message never contains
/// the input; callers add context.
pub fn parse_date(s: &str) -> Result<CalendarDate> {
    parse_datetime(s).map(|dt| dt.date)
}

/// Parses `s` into a [`DateTime`].
///
/// When a timezone suffix is present the value is normalized onto the
/// julian timeline immediately, so an out-of-range year fails here.
/// A `Z` suffix counts as a timezone: `-5000-01-01 00:00Z` is rejected while
/// `-5000-01-01` parses.
pub fn parse_datetime(s: &str) -> Result<DateTime> {
    let mut scan = Scanner::new(s);
    let negative = scan.eat(b'-');

    let year = scan.digits(4, 0, 9999)? as i32;
    scan.expect(b'-')?;
    let month = scan.digits(2, 1, 12)?;
    scan.expect(b'-')?;
    let day = scan.digits(2, 1, 31)?;

    while scan.peek().map_or(false, |c| c.is_ascii_whitespace() || c == b'T') {
        scan.bump();
    }

    let date = CalendarDate::new(if negative { -year } else { year }, month, day);
    let (time, tz_offset) = if scan.at_end() {
        (None, None)
    } else {
        let time = parse_time(&mut scan)?;
        (Some(time), parse_timezone(&mut scan)?)
    };

    let dt = DateTime { date, time, tz_offset };
    if dt.tz_offset.is_some() {
        dt.julian_ms()?;
    }
    Ok(dt)
}

/// `HH:MM[:SS[.F+]]`; hour 24 is accepted.
fn parse_time(scan: &mut Scanner<'_>) -> Result<TimeOfDay> {
    let hour = scan.digits(2, 0, 24)?;
    scan.expect(b':')?;
    let minute = scan.digits(2, 0, 59)?;
    let mut second = 0.0;
    if scan.eat(b':') {
        second = f64::from(scan.digits(2, 0, 59)?);
        if scan.peek() == Some(b'.') && scan.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            scan.bump();
            let mut fraction = 0.0;
            let mut scale = 1.0;
            while let Some(c) = scan.peek().filter(u8::is_ascii_digit) {
                fraction = fraction * 10.0 + f64::from(c - b'0');
                scale *= 10.0;
                scan.bump();
            }
            second += fraction / scale;
        }
    }
    Ok(TimeOfDay { hour, minute, second })
}

/// `Z`, `z` or `±HH:MM`, optionally surrounded by whitespace. Anything else
/// left in the input is an error.
fn parse_timezone(scan: &mut Scanner<'_>) -> Result<Option<i32>> {
    scan.skip_whitespace();
    let offset = match scan.peek() {
        None => return Ok(None),
        Some(b'Z') | Some(b'z') => {
            scan.bump();
            0
        }
        Some(sign @ (b'+' | b'-')) => {
            scan.bump();
            let hours = scan.digits(2, 0, 14)? as i32;
            scan.expect(b':')?;
            let minutes = scan.digits(2, 0, 59)? as i32;
            let magnitude = hours * 60 + minutes;
            if sign == b'-' {
                -magnitude
            } else {
                magnitude
            }
        }
        Some(_) => return Err(DatabaseError::date_parse()),
    };
    scan.skip_whitespace();
    if !scan.at_end() {
        return Err(DatabaseError::date_parse());
    }
    Ok(Some(offset))
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(s: &'a str) -> Self {
        Scanner { bytes: s.as_bytes(), pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(DatabaseError::date_parse())
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Exactly `count` digits whose value lies in `min..=max`.
    fn digits(&mut self, count: usize, min: u32, max: u32) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    value = value * 10 + u32::from(c - b'0');
                    self.bump();
                }
                _ => return Err(DatabaseError::date_parse()),
            }
        }
        if value < min || value > max {
            return Err(DatabaseError::date_parse());
        }
        Ok(value)
    }
}
