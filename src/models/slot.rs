use chrono::NaiveDateTime;
use serde::Serialize;

/// Half-open time interval `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Interval {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl Interval {
    pub fn new(start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_time < other.end_time && self.end_time > other.start_time
    }

    pub fn contains(&self, other: &Interval) -> bool {
        other.start_time >= self.start_time && other.end_time <= self.end_time
    }

    pub fn minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Candidate start for a booking, computed on demand and never stored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Slot {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: &str, end: &str) -> Interval {
        let p = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        Interval::new(p(start), p(end))
    }

    #[test]
    fn test_overlap_is_half_open() {
        let booked = iv("2030-06-17 10:00", "2030-06-17 11:00");
        assert!(iv("2030-06-17 09:30", "2030-06-17 10:30").overlaps(&booked));
        assert!(iv("2030-06-17 10:15", "2030-06-17 10:45").overlaps(&booked));
        assert!(iv("2030-06-17 09:00", "2030-06-17 12:00").overlaps(&booked));
        // touching ends do not overlap
        assert!(!iv("2030-06-17 09:00", "2030-06-17 10:00").overlaps(&booked));
        assert!(!iv("2030-06-17 11:00", "2030-06-17 12:00").overlaps(&booked));
    }

    #[test]
    fn test_contains_and_minutes() {
        let day = iv("2030-06-17 09:00", "2030-06-17 17:00");
        assert_eq!(day.minutes(), 480);
        assert!(day.contains(&iv("2030-06-17 09:00", "2030-06-17 17:00")));
        assert!(!day.contains(&iv("2030-06-17 16:30", "2030-06-17 17:30")));
    }
}
