//! Local-time slot planning.
//!
//! Local solar time is approximated from longitude alone:
//! `local = utc + lon / 360 * 24h`, with `utc` truncated to whole seconds
//! first. The slot of a local time is
//! `hour * 4 + round(minute / 15 + second / 900)` with ties rounded to even,
//! so a time in the last half-slot of a day rounds to slot 96, which is slot 0
//! of the next local date.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SubsecRound, Timelike, Utc};
use std::collections::BTreeSet;
use std::ops::Range;

use raster_io::microwave::SLOTS_PER_DAY;

use crate::error::{AlignError, AlignResult};

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// Local time at longitude `lon`.
///
/// Sub-second parts of `utc` are dropped; the offset keeps microsecond
/// precision.
pub fn local_time(utc: DateTime<Utc>, lon: f64) -> NaiveDateTime {
    let offset_us = (lon / 360.0 * MICROS_PER_DAY).round_ties_even() as i64;
    utc.trunc_subsecs(0).naive_utc() + Duration::microseconds(offset_us)
}

/// Local date and slot (`0..96`) for a pixel at longitude `lon`.
pub fn local_slot(utc: DateTime<Utc>, lon: f64) -> (NaiveDate, usize) {
    let local = local_time(utc, lon);
    let fraction = local.minute() as f64 / 15.0 + local.second() as f64 / 900.0;
    let slot = local.hour() as usize * 4 + fraction.round_ties_even() as usize;

    if slot >= SLOTS_PER_DAY {
        (local.date() + Duration::days(1), slot - SLOTS_PER_DAY)
    } else {
        (local.date(), slot)
    }
}

/// Slot assignment for every pixel of one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPlan {
    /// Distinct local dates, ascending; one or two consecutive days.
    pub dates: Vec<NaiveDate>,
    /// Per-pixel virtual index: `slot + 96 * position of the pixel's date`.
    pub indices: Vec<usize>,
}

impl SlotPlan {
    /// Position of the day a virtual index falls on, and the slot within it.
    pub fn split(index: usize) -> (usize, usize) {
        (index / SLOTS_PER_DAY, index % SLOTS_PER_DAY)
    }

    /// Slots of `dates[day]` referenced by at least one pixel.
    pub fn slot_range(&self, day: usize) -> Option<Range<usize>> {
        let slots = self
            .indices
            .iter()
            .map(|&i| Self::split(i))
            .filter(|&(d, _)| d == day)
            .map(|(_, s)| s);
        let (lo, hi) = slots.fold((usize::MAX, 0), |(lo, hi), s| (lo.min(s), hi.max(s)));
        (lo <= hi).then(|| lo..hi + 1)
    }
}

/// Assign every pixel longitude a virtual slot index for a scene taken at `utc`.
pub fn plan_slots(utc: DateTime<Utc>, lons: &[f64]) -> AlignResult<SlotPlan> {
    let per_pixel: Vec<(NaiveDate, usize)> = lons.iter().map(|&lon| local_slot(utc, lon)).collect();

    let dates: Vec<NaiveDate> = per_pixel
        .iter()
        .map(|&(d, _)| d)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let consecutive = match dates.as_slice() {
        [_] => true,
        [first, second] => *second == *first + Duration::days(1),
        _ => false,
    };
    if !consecutive {
        return Err(AlignError::InvalidTimeline(dates));
    }

    let indices = per_pixel
        .iter()
        .map(|&(date, slot)| {
            let offset = if date == dates[0] { 0 } else { SLOTS_PER_DAY };
            slot + offset
        })
        .collect();

    Ok(SlotPlan { dates, indices })
}
