use crate::schedule::{ClockRange, RawRow, ScheduleEntry, WeeklySchedule};
use crate::slots::SlotDictionary;

/// Token in a compound slot field meaning "no slot assigned".
pub const NIL_SLOT: &str = "nil";
pub const SLOT_JOINER: char = '+';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("slot code not found in dictionary: {code}")]
    SlotNotFound { code: String },

    #[error("malformed time range: {range:?} (expected \"HH:MM AM - HH:MM PM\")")]
    MalformedTimeRange { range: String },
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::SlotNotFound { .. } => "slot_not_found",
            CompileError::MalformedTimeRange { .. } => "malformed_time_range",
        }
    }
}

/// Largest gap, in minutes, between two same-subject blocks that still
/// lets them merge. Overlapping blocks have a negative gap and always merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MergeTolerance(i64);

impl MergeTolerance {
    pub const DEFAULT_MINUTES: i64 = 1;

    pub fn minutes(m: i64) -> Self {
        Self(m)
    }

    pub fn as_minutes(self) -> i64 {
        self.0
    }
}

impl Default for MergeTolerance {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES)
    }
}

/// Compile with the default one-minute merge tolerance.
pub fn compile_schedule(
    rows: &[RawRow],
    dict: &SlotDictionary,
) -> Result<WeeklySchedule, CompileError> {
    compile_schedule_with(rows, dict, MergeTolerance::default())
}

pub fn compile_schedule_with(
    rows: &[RawRow],
    dict: &SlotDictionary,
    tolerance: MergeTolerance,
) -> Result<WeeklySchedule, CompileError> {
    let unmerged = expand_rows(rows, dict)?;
    merge_schedule(unmerged, tolerance)
}

/// Resolve every slot code of every row into weekday buckets.
/// Output keeps dictionary order and is neither sorted nor merged.
pub fn expand_rows(rows: &[RawRow], dict: &SlotDictionary) -> Result<WeeklySchedule, CompileError> {
    let mut out = WeeklySchedule::new();
    for row in rows {
        let subject = row.subject.trim();
        for token in row.slots.split(SLOT_JOINER) {
            let code = token.trim();
            if code.is_empty() || code.eq_ignore_ascii_case(NIL_SLOT) {
                continue;
            }
            let Some(times) = dict.get(code) else {
                return Err(CompileError::SlotNotFound {
                    code: code.to_string(),
                });
            };
            for t in times {
                out.push(t.day, ScheduleEntry::new(t.range.clone(), subject));
            }
        }
    }
    Ok(out)
}

pub fn merge_schedule(
    schedule: WeeklySchedule,
    tolerance: MergeTolerance,
) -> Result<WeeklySchedule, CompileError> {
    let mut out = WeeklySchedule::new();
    for (day, entries) in schedule.into_days() {
        out.set_day(day, merge_day(&entries, tolerance)?);
    }
    Ok(out)
}

/// Sort one weekday's entries by start time and fold same-subject neighbours
/// whose gap is within `tolerance`.
pub fn merge_day(
    entries: &[ScheduleEntry],
    tolerance: MergeTolerance,
) -> Result<Vec<ScheduleEntry>, CompileError> {
    let mut blocks: Vec<(ClockRange, &str)> = entries
        .iter()
        .map(|e| ClockRange::parse(&e.time).map(|r| (r, e.subject.as_str())))
        .collect::<Result<_, _>>()?;
    // (start, end, subject): total order, so equal starts never depend on input order.
    blocks.sort();

    let mut merged: Vec<(ClockRange, &str)> = Vec::with_capacity(blocks.len());
    let mut iter = blocks.into_iter();
    let Some(mut current) = iter.next() else {
        return Ok(Vec::new());
    };
    for candidate in iter {
        if candidate.1 == current.1
            && current.0.gap_minutes_to(&candidate.0) <= tolerance.as_minutes()
        {
            current.0.end = current.0.end.max(candidate.0.end);
        } else {
            merged.push(current);
            current = candidate;
        }
    }
    merged.push(current);

    Ok(merged
        .into_iter()
        .map(|(range, subject)| ScheduleEntry::new(range.to_string(), subject))
        .collect())
}
