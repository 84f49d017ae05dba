//! Time windows for sensor-history range queries.

use time::{macros::time, Date, OffsetDateTime, Time, UtcOffset};

/// Result cap for the implicit load when a machine is first selected.
pub const INITIAL_LOAD_LIMIT: u32 = 100;
/// Result cap when filters are applied explicitly.
pub const APPLY_FILTERS_LIMIT: u32 = 1000;

const END_OF_DAY: Time = time!(23:59:59.999);

/// Inclusive timestamp bounds for a history query. An unset side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryWindow {
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub from: Option<OffsetDateTime>,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub to: Option<OffsetDateTime>,
}

impl QueryWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// `00:00:00.000` of `date` at the given offset.
pub fn start_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_offset(offset)
}

/// `23:59:59.999` of `date` at the given offset.
pub fn end_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    date.with_time(END_OF_DAY).assume_offset(offset)
}

/// Whether `date` can bound a query at any UTC offset.
///
/// The first and last representable days are rejected: their day bounds can
/// fall outside the supported year range once converted to UTC.
pub fn is_queryable_day(date: Date) -> bool {
    date.previous_day().is_some() && date.next_day().is_some()
}

/// Keeps `to` from falling before `from` when both are set.
pub fn clamp_to_date(from: Option<Date>, to: Option<Date>) -> Option<Date> {
    match (from, to) {
        (Some(from), Some(to)) if to < from => Some(from),
        _ => to,
    }
}

/// Builds the query window for a machine's history.
///
/// A quick date wins over the explicit range and covers that whole calendar
/// day. Otherwise `from` starts at the beginning of its day and `to` runs to
/// the end of its day; an inverted range has `to` clamped up to `from`.
pub fn build_window(
    quick_date: Option<Date>,
    from_date: Option<Date>,
    to_date: Option<Date>,
    offset: UtcOffset,
) -> QueryWindow {
    if let Some(day) = quick_date {
        return QueryWindow {
            from: Some(start_of_day(day, offset)),
            to: Some(end_of_day(day, offset)),
        };
    }

    let to_date = clamp_to_date(from_date, to_date);
    QueryWindow {
        from: from_date.map(|d| start_of_day(d, offset)),
        to: to_date.map(|d| end_of_day(d, offset)),
    }
}
