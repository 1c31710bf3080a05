//! Date-range availability for rooms.
//!
//! Everything here works at calendar-day precision: dates cross the API as
//! `YYYY-MM-DD` strings and any time-of-day component is discarded before
//! comparison. Intervals are closed on both ends, matching the conflict
//! query used at booking time. That policy means a new arrival on another
//! reservation's checkout day counts as a conflict; most hotels would use
//! an exclusive end instead, but changing it is a product decision, so the
//! stricter behavior is kept and tested explicitly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbPool;

/// A closed calendar-date interval: both `start` and `end` are occupied.
///
/// Serialized as `{"start_date": "...", "end_date": "..."}`, the shape the
/// calendar frontend consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInterval {
    #[serde(rename = "start_date")]
    pub start: NaiveDate,
    #[serde(rename = "end_date")]
    pub end: NaiveDate,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Outcome of a conflict check against existing reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// The first existing interval the candidate collides with.
    Conflict(DateInterval),
}

/// How a date is rendered on the booking calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClass {
    Occupied,
    Selected,
    Free,
}

/// Where a date sits within the interval it belongs to, for range-shaped
/// badge rendering (rounded left edge, rounded right edge, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePosition {
    Single,
    Start,
    End,
    Middle,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AvailabilityError> {
        if start > end {
            return Err(AvailabilityError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Closed-interval overlap: the two ranges share at least one day.
    pub fn overlaps(&self, other: &DateInterval) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Position of `date` within this interval, or None if outside it.
    pub fn position_of(&self, date: NaiveDate) -> Option<RangePosition> {
        if !self.contains(date) {
            return None;
        }
        let position = match (date == self.start, date == self.end) {
            (true, true) => RangePosition::Single,
            (true, false) => RangePosition::Start,
            (false, true) => RangePosition::End,
            (false, false) => RangePosition::Middle,
        };
        Some(position)
    }
}

/// Check a candidate stay against the existing reservations for a room.
///
/// Returns the first offending interval on conflict so the caller can tell
/// the guest which booking is in the way. Rejects inverted ranges before
/// looking at anything.
pub fn check_conflict(
    start: NaiveDate,
    end: NaiveDate,
    existing: &[DateInterval],
) -> Result<Availability, AvailabilityError> {
    let candidate = DateInterval::new(start, end)?;
    match existing.iter().find(|iv| candidate.overlaps(iv)) {
        Some(iv) => Ok(Availability::Conflict(*iv)),
        None => Ok(Availability::Available),
    }
}

/// Classify a calendar date for rendering.
///
/// Occupied always wins over selected: the two badges drive independent
/// visual treatments and must never both apply to the same day. The
/// sub-position is computed against whichever interval the date landed in.
pub fn classify_date(
    date: NaiveDate,
    occupied: &[DateInterval],
    selected: Option<&DateInterval>,
) -> (DayClass, Option<RangePosition>) {
    if let Some(interval) = occupied.iter().find(|iv| iv.contains(date)) {
        return (DayClass::Occupied, interval.position_of(date));
    }
    if let Some(interval) = selected {
        if let Some(position) = interval.position_of(date) {
            return (DayClass::Selected, Some(position));
        }
    }
    (DayClass::Free, None)
}

/// Fetch the occupied intervals for a room, one per reservation.
///
/// No caching: re-queried on every call. Query volume is tiny relative to
/// a hotel's room inventory.
pub async fn list_occupied_intervals(
    db: &DbPool,
    room_id: i64,
) -> Result<Vec<DateInterval>, sqlx::Error> {
    let rows: Vec<(NaiveDate, NaiveDate)> =
        sqlx::query_as("SELECT start_date, end_date FROM reservations WHERE room_id = ?")
            .bind(room_id)
            .fetch_all(db)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(start, end)| DateInterval { start, end })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn iv(start: &str, end: &str) -> DateInterval {
        DateInterval::new(d(start), d(end)).unwrap()
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateInterval::new(d("2024-01-05"), d("2024-01-01")).unwrap_err();
        assert_eq!(
            err,
            AvailabilityError::InvalidRange {
                start: d("2024-01-05"),
                end: d("2024-01-01"),
            }
        );

        let err = check_conflict(d("2024-01-05"), d("2024-01-01"), &[]).unwrap_err();
        assert!(matches!(err, AvailabilityError::InvalidRange { .. }));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let pairs = [
            (iv("2024-01-01", "2024-01-05"), iv("2024-01-03", "2024-01-04")),
            (iv("2024-01-01", "2024-01-05"), iv("2024-01-05", "2024-01-08")),
            (iv("2024-01-01", "2024-01-03"), iv("2024-01-04", "2024-01-06")),
            (iv("2024-02-10", "2024-02-10"), iv("2024-02-10", "2024-02-10")),
        ];
        for (a, b) in pairs {
            assert_eq!(a.overlaps(&b), b.overlaps(&a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_disjoint_intervals_available() {
        let existing = vec![iv("2024-01-01", "2024-01-03")];
        let result = check_conflict(d("2024-01-04"), d("2024-01-06"), &existing).unwrap();
        assert_eq!(result, Availability::Available);
    }

    #[test]
    fn test_contained_interval_conflicts() {
        let existing = vec![iv("2024-01-01", "2024-01-05")];
        let result = check_conflict(d("2024-01-03"), d("2024-01-04"), &existing).unwrap();
        assert_eq!(result, Availability::Conflict(existing[0]));
    }

    #[test]
    fn test_checkout_day_arrival_conflicts() {
        // Closed-interval policy: an existing stay ending 2024-01-05 blocks
        // a new arrival on 2024-01-05. Deliberate, see module docs.
        let existing = vec![iv("2024-01-01", "2024-01-05")];
        let result = check_conflict(d("2024-01-05"), d("2024-01-07"), &existing).unwrap();
        assert_eq!(result, Availability::Conflict(existing[0]));
    }

    #[test]
    fn test_conflict_reports_first_offender() {
        let existing = vec![
            iv("2024-03-01", "2024-03-02"),
            iv("2024-03-10", "2024-03-12"),
        ];
        let result = check_conflict(d("2024-03-11"), d("2024-03-14"), &existing).unwrap();
        assert_eq!(result, Availability::Conflict(existing[1]));
    }

    #[test]
    fn test_position_within_interval() {
        let interval = iv("2024-01-10", "2024-01-13");
        assert_eq!(interval.position_of(d("2024-01-10")), Some(RangePosition::Start));
        assert_eq!(interval.position_of(d("2024-01-11")), Some(RangePosition::Middle));
        assert_eq!(interval.position_of(d("2024-01-13")), Some(RangePosition::End));
        assert_eq!(interval.position_of(d("2024-01-14")), None);

        let single = iv("2024-01-20", "2024-01-20");
        assert_eq!(single.position_of(d("2024-01-20")), Some(RangePosition::Single));
    }

    #[test]
    fn test_occupied_wins_over_selected() {
        let occupied = vec![iv("2024-01-10", "2024-01-12")];
        let selected = iv("2024-01-11", "2024-01-15");

        // 01-11 is inside both ranges: the occupied badge must win and the
        // position is computed against the occupied interval.
        let (class, position) = classify_date(d("2024-01-11"), &occupied, Some(&selected));
        assert_eq!(class, DayClass::Occupied);
        assert_eq!(position, Some(RangePosition::Middle));

        // 01-13 is only in the selection.
        let (class, position) = classify_date(d("2024-01-13"), &occupied, Some(&selected));
        assert_eq!(class, DayClass::Selected);
        assert_eq!(position, Some(RangePosition::Middle));

        // 01-15 ends the selection.
        let (class, position) = classify_date(d("2024-01-15"), &occupied, Some(&selected));
        assert_eq!(class, DayClass::Selected);
        assert_eq!(position, Some(RangePosition::End));

        // Outside everything.
        let (class, position) = classify_date(d("2024-01-20"), &occupied, Some(&selected));
        assert_eq!(class, DayClass::Free);
        assert_eq!(position, None);
    }

    #[test]
    fn test_classify_without_selection() {
        let occupied = vec![iv("2024-01-10", "2024-01-10")];
        let (class, position) = classify_date(d("2024-01-10"), &occupied, None);
        assert_eq!(class, DayClass::Occupied);
        assert_eq!(position, Some(RangePosition::Single));

        let (class, position) = classify_date(d("2024-01-11"), &occupied, None);
        assert_eq!(class, DayClass::Free);
        assert_eq!(position, None);
    }

    #[tokio::test]
    async fn test_list_occupied_intervals_idempotent() {
        let db = crate::db::connect("sqlite::memory:", 1).await.unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO rooms (room_type, nightly_price, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind("double")
        .bind(120.0)
        .bind(&now)
        .bind(&now)
        .execute(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO reservations (room_id, guest_name, phone, email, start_date, end_date, created_at) \
             VALUES (1, 'Ana', '555', 'ana@example.com', ?, ?, ?)",
        )
        .bind(d("2024-04-01"))
        .bind(d("2024-04-03"))
        .bind(&now)
        .execute(&db)
        .await
        .unwrap();

        let first = list_occupied_intervals(&db, 1).await.unwrap();
        let second = list_occupied_intervals(&db, 1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![iv("2024-04-01", "2024-04-03")]);

        // A different room sees nothing.
        assert!(list_occupied_intervals(&db, 2).await.unwrap().is_empty());
    }
}
