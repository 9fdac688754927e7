use crate::compile::CompileError;
use chrono::NaiveTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 12-hour clock with AM/PM designator, e.g. `09:00 AM`.
pub const CLOCK_FORMAT: &str = "%I:%M %p";
pub const RANGE_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `"HH:MM AM - HH:MM PM"` range at minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ClockRange {
    pub fn parse(range: &str) -> Result<Self, CompileError> {
        let malformed = || CompileError::MalformedTimeRange {
            range: range.to_string(),
        };
        let parts: Vec<&str> = range.split(RANGE_SEPARATOR).collect();
        if parts.len() != 2 {
            return Err(malformed());
        }
        let start = parse_clock(parts[0]).ok_or_else(malformed)?;
        let end = parse_clock(parts[1]).ok_or_else(malformed)?;
        Ok(Self { start, end })
    }

    /// Signed minutes from the end of `self` to the start of `next`.
    /// Negative when `next` starts before `self` ends.
    pub fn gap_minutes_to(&self, next: &ClockRange) -> i64 {
        next.start.signed_duration_since(self.end).num_minutes()
    }
}

impl fmt::Display for ClockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.start.format(CLOCK_FORMAT),
            RANGE_SEPARATOR,
            self.end.format(CLOCK_FORMAT)
        )
    }
}

fn parse_clock(token: &str) -> Option<NaiveTime> {
    let token = token.trim();
    if !has_clock_shape(token) {
        return None;
    }
    NaiveTime::parse_from_str(token, CLOCK_FORMAT).ok()
}

/// `HH:MM AM`: digits, colon, digits, exactly one space, then AM or PM.
/// chrono treats the space before `%p` as optional, so the shape is checked first.
fn has_clock_shape(token: &str) -> bool {
    let Some((hm, meridiem)) = token.split_once(' ') else {
        return false;
    };
    let Some((h, m)) = hm.split_once(':') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(h)
        && digits(m)
        && (meridiem.eq_ignore_ascii_case("AM") || meridiem.eq_ignore_ascii_case("PM"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub time: String,
    pub subject: String,
}

impl ScheduleEntry {
    pub fn new(time: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            subject: subject.into(),
        }
    }
}

/// One row handed over by the extraction step: `slot1+slot2 - venue - subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub slots: String,
    #[serde(default)]
    pub venue: String,
    pub subject: String,
}

impl RawRow {
    #[allow(dead_code)]
    pub fn new(slots: &str, venue: &str, subject: &str) -> Self {
        Self {
            slots: slots.to_string(),
            venue: venue.to_string(),
            subject: subject.to_string(),
        }
    }
}

/// Per-weekday entries. All seven weekdays are always present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<ScheduleEntry>>")]
pub struct WeeklySchedule {
    days: BTreeMap<Weekday, Vec<ScheduleEntry>>,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::new()
    }
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self {
            days: Weekday::ALL.into_iter().map(|d| (d, Vec::new())).collect(),
        }
    }

    pub fn day(&self, day: Weekday) -> &[ScheduleEntry] {
        self.days.get(&day).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn push(&mut self, day: Weekday, entry: ScheduleEntry) {
        self.days.entry(day).or_default().push(entry);
    }

    pub fn set_day(&mut self, day: Weekday, entries: Vec<ScheduleEntry>) {
        self.days.insert(day, entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &[ScheduleEntry])> {
        self.days.iter().map(|(d, v)| (*d, v.as_slice()))
    }

    pub fn into_days(self) -> BTreeMap<Weekday, Vec<ScheduleEntry>> {
        self.days
    }

    pub fn entry_count(&self) -> usize {
        self.days.values().map(|v| v.len()).sum()
    }
}

impl Serialize for WeeklySchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for (day, entries) in &self.days {
            map.serialize_entry(day.as_str(), entries)?;
        }
        map.end()
    }
}

impl TryFrom<BTreeMap<String, Vec<ScheduleEntry>>> for WeeklySchedule {
    type Error = String;

    fn try_from(raw: BTreeMap<String, Vec<ScheduleEntry>>) -> Result<Self, Self::Error> {
        let mut out = WeeklySchedule::new();
        for (name, entries) in raw {
            let day = Weekday::parse(&name).ok_or_else(|| format!("unknown weekday: {}", name))?;
            out.set_day(day, entries);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_parse_is_case_insensitive_and_exact() {
        assert_eq!(Weekday::parse("monday"), Some(Weekday::Monday));
        assert_eq!(Weekday::parse(" SUNDAY "), Some(Weekday::Sunday));
        assert_eq!(Weekday::parse("Mon"), None);
        assert_eq!(Weekday::parse(""), None);
    }

    #[test]
    fn clock_range_round_trips_noon_and_midnight() {
        for s in [
            "09:00 AM - 09:50 AM",
            "12:00 PM - 12:50 PM",
            "12:00 AM - 12:01 AM",
            "11:59 AM - 01:30 PM",
        ] {
            let r = ClockRange::parse(s).expect("parse range");
            assert_eq!(r.to_string(), s);
        }
    }

    #[test]
    fn clock_range_uses_24_hour_ordering() {
        let noon = ClockRange::parse("12:00 PM - 12:50 PM").unwrap();
        let morning = ClockRange::parse("11:00 AM - 11:50 AM").unwrap();
        let midnight = ClockRange::parse("12:00 AM - 12:50 AM").unwrap();
        assert!(midnight < morning);
        assert!(morning < noon);
    }

    #[test]
    fn clock_range_rejects_malformed_strings() {
        for s in [
            "09:00 AM",
            "09:00 AM - 09:50 AM - 10:40 AM",
            "09:00 - 09:50",
            "9 AM - 10 AM",
            "09:00 AM-09:50 AM",
            "13:00 PM - 01:50 PM",
            " - 09:50 AM",
            "09:00AM - 09:50AM",
            "09:00   AM - 09:50 AM",
            "09:00 A - 09:50 AM",
            "09:00 AM - 09:50\tAM",
        ] {
            let e = ClockRange::parse(s).expect_err(s);
            assert!(matches!(e, CompileError::MalformedTimeRange { .. }), "{s}");
        }
    }

    #[test]
    fn clock_range_accepts_lowercase_meridiem() {
        let r = ClockRange::parse("09:00 am - 09:50 pm").unwrap();
        assert_eq!(r.to_string(), "09:00 AM - 09:50 PM");
    }

    #[test]
    fn gap_is_signed() {
        let a = ClockRange::parse("09:00 AM - 09:50 AM").unwrap();
        let b = ClockRange::parse("09:51 AM - 10:40 AM").unwrap();
        let c = ClockRange::parse("09:30 AM - 10:00 AM").unwrap();
        assert_eq!(a.gap_minutes_to(&b), 1);
        assert_eq!(a.gap_minutes_to(&c), -20);
    }

    #[test]
    fn weekly_schedule_serializes_all_days_in_order() {
        let mut s = WeeklySchedule::new();
        s.push(
            Weekday::Tuesday,
            ScheduleEntry::new("09:00 AM - 09:50 AM", "Physics"),
        );
        let text = serde_json::to_string(&s).unwrap();
        assert!(text.starts_with("{\"Monday\":[],\"Tuesday\":[{\"time\""));
        assert!(text.ends_with("\"Sunday\":[]}"));

        let back: WeeklySchedule = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn weekly_schedule_rejects_unknown_day_and_fills_missing() {
        let partial: WeeklySchedule =
            serde_json::from_str(r#"{"friday":[{"time":"09:00 AM - 09:50 AM","subject":"X"}]}"#)
                .unwrap();
        assert_eq!(partial.day(Weekday::Friday).len(), 1);
        assert_eq!(partial.iter().count(), 7);

        let bad = serde_json::from_str::<WeeklySchedule>(r#"{"Funday":[]}"#);
        assert!(bad.is_err());
    }
}
