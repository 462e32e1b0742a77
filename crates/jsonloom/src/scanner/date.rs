//! Recognition of dates in the textual layouts common in JSON producers.
//!
//! Supported forms:
//! - `/Date(millis[+-hhmm])/`
//! - `yyyy-MM-dd`, `yyyy/MM/dd` (month and day may be one digit), compact
//!   `yyyyMMdd`, `dd.MM.yyyy`, `dd-MM-yyyy` and `yyyy年M月d日`
//! - an optional time after `T` or a space: `HH:mm[:ss[.fraction]]`, or
//!   `H时m分s秒` after a CJK date
//! - an optional zone after the time: `Z`, `+HH`, `+HH:mm` or `+HHmm`
//!
//! A date without a zone is taken to be UTC.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};

/// Recognizes a date at the start of `input`, returning it with the number
/// of bytes it spans. With `strict`, the date must span all of `input`.
pub(crate) fn recognize(input: &[u8], strict: bool) -> Option<(DateTime<FixedOffset>, usize)> {
    let (date, len) = legacy(input).or_else(|| calendar(input))?;
    if strict && len != input.len() {
        return None;
    }
    Some((date, len))
}

/// Recognizes a date spanning all of `text`.
pub(crate) fn parse_text(text: &str) -> Option<DateTime<FixedOffset>> {
    recognize(text.as_bytes(), true).map(|(date, _)| date)
}

#[derive(Clone, Copy)]
struct Cursor<'a> {
    s: &'a [u8],
    i: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.i).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        let hit = self.peek() == Some(b);
        if hit {
            self.i += 1;
        }
        hit
    }

    fn eat_str(&mut self, s: &str) -> bool {
        let hit = self.s[self.i..].starts_with(s.as_bytes());
        if hit {
            self.i += s.len();
        }
        hit
    }

    /// Reads between `min` and `max` digits, as many as are present.
    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let start = self.i;
        let mut value = 0u32;
        while self.i - start < max {
            match self.peek() {
                Some(b @ b'0'..=b'9') => {
                    value = value * 10 + u32::from(b - b'0');
                    self.i += 1;
                }
                _ => break,
            }
        }
        (self.i - start >= min).then_some(value)
    }
}

fn utc() -> Option<FixedOffset> {
    FixedOffset::east_opt(0)
}

fn legacy(s: &[u8]) -> Option<(DateTime<FixedOffset>, usize)> {
    let mut c = Cursor { s, i: 0 };
    if !c.eat_str("/Date(") {
        return None;
    }
    let negative = c.eat(b'-');
    let start = c.i;
    while c.peek().is_some_and(|b| b.is_ascii_digit()) {
        c.i += 1;
    }
    if c.i == start || c.i - start > 18 {
        return None;
    }
    let millis: i64 = core::str::from_utf8(&s[start..c.i]).ok()?.parse().ok()?;
    let millis = if negative { -millis } else { millis };
    let offset = match c.peek() {
        Some(sign @ (b'+' | b'-')) => {
            c.i += 1;
            offset_from(sign, c.digits(2, 2)?, c.digits(2, 2)?)?
        }
        _ => utc()?,
    };
    if !c.eat_str(")/") {
        return None;
    }
    let instant = DateTime::from_timestamp_millis(millis)?;
    Some((instant.with_timezone(&offset), c.i))
}

fn offset_from(sign: u8, hours: u32, minutes: u32) -> Option<FixedOffset> {
    let seconds = i32::try_from(hours * 3600 + minutes * 60).ok()?;
    FixedOffset::east_opt(if sign == b'-' { -seconds } else { seconds })
}

fn calendar(s: &[u8]) -> Option<(DateTime<FixedOffset>, usize)> {
    let mut c = Cursor { s, i: 0 };
    let (year, month, day, cjk) = match year_first(&mut c) {
        Some(ymd) => ymd,
        None => {
            c = Cursor { s, i: 0 };
            day_first(&mut c)?
        }
    };
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    let mut time = NaiveTime::MIN;
    let mut zone = None;
    let mut t = c;
    if let Some((parsed, parsed_zone)) = time_of_day(&mut t, cjk) {
        time = parsed;
        zone = parsed_zone;
        c = t;
    }
    let offset = match zone {
        Some(offset) => offset,
        None => utc()?,
    };
    let date = offset.from_local_datetime(&date.and_time(time)).single()?;
    Some((date, c.i))
}

fn year_first(c: &mut Cursor<'_>) -> Option<(u32, u32, u32, bool)> {
    let year = c.digits(4, 4)?;
    match c.peek()? {
        sep @ (b'-' | b'/') => {
            c.i += 1;
            let month = c.digits(1, 2)?;
            if !c.eat(sep) {
                return None;
            }
            let day = c.digits(1, 2)?;
            Some((year, month, day, false))
        }
        b'0'..=b'9' => {
            let month = c.digits(2, 2)?;
            let day = c.digits(2, 2)?;
            if c.peek().is_some_and(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((year, month, day, false))
        }
        _ if c.eat_str("年") => {
            let month = c.digits(1, 2)?;
            if !c.eat_str("月") {
                return None;
            }
            let day = c.digits(1, 2)?;
            if !c.eat_str("日") {
                return None;
            }
            Some((year, month, day, true))
        }
        _ => None,
    }
}

fn day_first(c: &mut Cursor<'_>) -> Option<(u32, u32, u32, bool)> {
    let day = c.digits(2, 2)?;
    let sep = c.peek().filter(|b| matches!(b, b'.' | b'-'))?;
    c.i += 1;
    let month = c.digits(2, 2)?;
    if !c.eat(sep) {
        return None;
    }
    let year = c.digits(4, 4)?;
    Some((year, month, day, false))
}

fn time_of_day(c: &mut Cursor<'_>, cjk: bool) -> Option<(NaiveTime, Option<FixedOffset>)> {
    if cjk {
        c.eat(b' ');
        let hour = c.digits(1, 2)?;
        if !c.eat_str("时") {
            return None;
        }
        let minute = c.digits(1, 2)?;
        if !c.eat_str("分") {
            return None;
        }
        let second = c.digits(1, 2)?;
        c.eat_str("秒");
        return Some((NaiveTime::from_hms_opt(hour, minute, second)?, None));
    }
    if !(c.eat(b'T') || c.eat(b' ')) {
        return None;
    }
    let hour = c.digits(2, 2)?;
    if !c.eat(b':') {
        return None;
    }
    let minute = c.digits(2, 2)?;
    let (mut second, mut nanos) = (0, 0);
    if c.eat(b':') {
        second = c.digits(2, 2)?;
        if c.eat(b'.') || c.eat(b',') {
            let start = c.i;
            let fraction = c.digits(1, 9)?;
            let scale = 9 - (c.i - start);
            nanos = fraction * 10u32.pow(u32::try_from(scale).ok()?);
            while c.peek().is_some_and(|b| b.is_ascii_digit()) {
                c.i += 1;
            }
        }
    }
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    let zone = match c.peek() {
        Some(b'Z') => {
            c.i += 1;
            Some(utc()?)
        }
        Some(sign @ (b'+' | b'-')) => {
            c.i += 1;
            let hours = c.digits(2, 2)?;
            c.eat(b':');
            let minutes = c.digits(2, 2).unwrap_or(0);
            Some(offset_from(sign, hours, minutes)?)
        }
        _ => None,
    };
    Some((time, zone))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("2021-06-01", (2021, 6, 1, 0, 0, 0), 0)]
    #[case("2021/6/1", (2021, 6, 1, 0, 0, 0), 0)]
    #[case("20210601", (2021, 6, 1, 0, 0, 0), 0)]
    #[case("01.06.2021", (2021, 6, 1, 0, 0, 0), 0)]
    #[case("01-06-2021", (2021, 6, 1, 0, 0, 0), 0)]
    #[case("2021-06-01T12:30", (2021, 6, 1, 12, 30, 0), 0)]
    #[case("2021-06-01 12:30:45", (2021, 6, 1, 12, 30, 45), 0)]
    #[case("2021-06-01T12:30:45.250Z", (2021, 6, 1, 12, 30, 45), 0)]
    #[case("2021-06-01T12:30:45+08:00", (2021, 6, 1, 12, 30, 45), 8 * 3600)]
    #[case("2021-06-01T12:30:45-0530", (2021, 6, 1, 12, 30, 45), -(5 * 3600 + 30 * 60))]
    #[case("2021年6月1日", (2021, 6, 1, 0, 0, 0), 0)]
    #[case("2021年6月1日 12时30分45秒", (2021, 6, 1, 12, 30, 45), 0)]
    fn recognizes_layouts(
        #[case] text: &str,
        #[case] fields: (i32, u32, u32, u32, u32, u32),
        #[case] offset: i32,
    ) {
        let date = parse_text(text).unwrap_or_else(|| panic!("{text} not recognized"));
        let (y, mo, d, h, mi, s) = fields;
        assert_eq!((date.year(), date.month(), date.day()), (y, mo, d));
        assert_eq!((date.hour(), date.minute(), date.second()), (h, mi, s));
        assert_eq!(date.offset().local_minus_utc(), offset);
    }

    #[test]
    fn fraction_scales_to_nanoseconds() {
        let date = parse_text("2021-06-01T00:00:00.25").unwrap();
        assert_eq!(date.nanosecond(), 250_000_000);
    }

    #[test]
    fn legacy_form_keeps_offset() {
        let date = parse_text("/Date(0+0100)/").unwrap();
        assert_eq!(date.timestamp_millis(), 0);
        assert_eq!(date.offset().local_minus_utc(), 3600);
        assert_eq!(parse_text("/Date(-1000)/").unwrap().timestamp_millis(), -1000);
    }

    #[rstest]
    #[case("2021-13-01")]
    #[case("2021-02-30")]
    #[case("2021-06-01T")]
    #[case("2021-06-01T25:00")]
    #[case("202106011")]
    #[case("hello")]
    #[case("2021-06/01")]
    #[case("")]
    fn rejects_non_dates(#[case] text: &str) {
        assert_eq!(parse_text(text), None);
    }

    #[test]
    fn lenient_recognition_reports_span() {
        let (_, len) = recognize(b"2021-06-01,rest", false).unwrap();
        assert_eq!(len, 10);
        assert!(recognize(b"2021-06-01,rest", true).is_none());
    }
}
