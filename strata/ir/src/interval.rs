//! Vertical ranges of interval blocks.
use std::cmp::Ordering;
use std::fmt::{self, Display};
use strata_utils::{Error, StrataResult};

/// The end of the vertical axis a bound is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Level {
    /// The first plane of the domain.
    Start,
    /// One past the last plane of the domain.
    End,
}

/// A normalized interval bound: `level + offset`.
///
/// Bounds built from source text always have a non-negative offset when
/// measured from [Level::Start] and a non-positive offset when measured from
/// [Level::End]. The derived ordering compares bounds as if the vertical
/// domain were arbitrarily large.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AxisBound {
    pub level: Level,
    pub offset: i64,
}

impl AxisBound {
    pub fn start(offset: i64) -> Self {
        Self {
            level: Level::Start,
            offset,
        }
    }

    pub fn end(offset: i64) -> Self {
        Self {
            level: Level::End,
            offset,
        }
    }

    /// Normalize a bound written in the source: negative values count from
    /// the top of the domain.
    pub fn from_source(value: i64) -> Self {
        if value >= 0 {
            Self::start(value)
        } else {
            Self::end(value)
        }
    }

    /// The plane index this bound denotes in a domain of `k_size` planes.
    pub fn resolve(&self, k_size: u64) -> i64 {
        match self.level {
            Level::Start => self.offset,
            Level::End => k_size as i64 + self.offset,
        }
    }

    /// Smallest domain size for which this bound lies inside `[0, k_size]`.
    pub fn min_k_size(&self) -> u64 {
        match self.level {
            Level::Start => self.offset.max(0).unsigned_abs(),
            Level::End => self.offset.min(0).unsigned_abs(),
        }
    }

    /// Smallest domain size from which on `self <= other` (`self < other` if
    /// `strict`) holds. Returns `None` if the relation fails for large
    /// domains, and an error if the bounds are too far apart to compare.
    pub fn min_k_size_for(
        &self,
        other: &AxisBound,
        strict: bool,
    ) -> StrataResult<Option<u64>> {
        match (self.level, other.level) {
            (Level::Start, Level::Start) | (Level::End, Level::End) => {
                let holds = if strict {
                    self.offset < other.offset
                } else {
                    self.offset <= other.offset
                };
                Ok(holds.then_some(0))
            }
            // start + a <= k_size + b  <=>  k_size >= a - b
            (Level::Start, Level::End) => self
                .offset
                .checked_sub(other.offset)
                .and_then(|d| d.checked_add(i64::from(strict)))
                .map(|d| Some(d.max(0).unsigned_abs()))
                .ok_or_else(|| {
                    Error::interval(format!(
                        "bounds {self} and {other} are too far apart"
                    ))
                }),
            (Level::End, Level::Start) => Ok(None),
        }
    }
}

impl Display for AxisBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.level, self.offset) {
            (Level::End, 0) => write!(f, "None"),
            (_, offset) => write!(f, "{offset}"),
        }
    }
}

/// A half-open vertical range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Interval {
    pub start: AxisBound,
    pub end: AxisBound,
}

impl Interval {
    pub fn new(start: AxisBound, end: AxisBound) -> Self {
        Self { start, end }
    }

    /// Every plane of the domain.
    pub fn full() -> Self {
        Self::new(AxisBound::start(0), AxisBound::end(0))
    }

    /// The planes covered in a domain of `k_size` planes.
    pub fn resolve(&self, k_size: u64) -> std::ops::Range<i64> {
        self.start.resolve(k_size)..self.end.resolve(k_size)
    }

    /// Smallest domain size for which the interval is non-empty and inside
    /// the domain, or `None` if it is empty for large domains.
    pub fn min_k_size(&self) -> StrataResult<Option<u64>> {
        let ordered = self.start.min_k_size_for(&self.end, true)?;
        Ok(ordered.map(|k| {
            k.max(self.start.min_k_size()).max(self.end.min_k_size())
        }))
    }

    /// Smallest domain size from which `self` lies entirely below `other`.
    pub fn min_k_size_before(
        &self,
        other: &Interval,
    ) -> StrataResult<Option<u64>> {
        self.end.min_k_size_for(&other.start, false)
    }

    /// Order intervals by their position in a large domain.
    pub fn cmp_position(&self, other: &Interval) -> Ordering {
        self.start.cmp(&other.start).then(self.end.cmp(&other.end))
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Interval::full() {
            write!(f, "...")
        } else {
            write!(f, "{}, {}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(AxisBound::from_source(2), AxisBound::start(2));
        assert_eq!(AxisBound::from_source(-1), AxisBound::end(-1));
        assert_eq!(AxisBound::end(-1).resolve(10), 9);
        assert!(AxisBound::start(100) < AxisBound::end(-100));
    }

    #[test]
    fn minimum_sizes() {
        // [1, K - 1) needs at least three planes to be non-empty.
        let mid = Interval::new(AxisBound::start(1), AxisBound::end(-1));
        assert_eq!(mid.min_k_size().unwrap(), Some(3));
        // [K - 1, K)
        let top = Interval::new(AxisBound::end(-1), AxisBound::end(0));
        assert_eq!(top.min_k_size().unwrap(), Some(1));
        // [0, 2) lies below [K - 1, K) once K >= 3.
        let bottom = Interval::new(AxisBound::start(0), AxisBound::start(2));
        assert_eq!(bottom.min_k_size_before(&top).unwrap(), Some(3));
        assert_eq!(top.min_k_size_before(&bottom).unwrap(), None);
        // [K - 1, 1) is empty for large K.
        let empty = Interval::new(AxisBound::end(-1), AxisBound::start(1));
        assert_eq!(empty.min_k_size().unwrap(), None);
    }

    #[test]
    fn extreme_bounds_do_not_overflow() {
        let far = Interval::new(AxisBound::start(1), AxisBound::end(-i64::MAX));
        let err = far.min_k_size().unwrap_err();
        assert!(
            matches!(err.kind(), strata_utils::ErrorKind::Interval(_)),
            "{err:?}"
        );
        assert!(err.message().contains("too far apart"));

        assert_eq!(AxisBound::end(i64::MIN).min_k_size(), 1 << 63);
        let top = Interval::new(AxisBound::start(i64::MAX - 1), AxisBound::end(0));
        assert_eq!(top.min_k_size().unwrap(), Some(i64::MAX as u64));
        let same = Interval::new(AxisBound::start(i64::MAX), AxisBound::start(i64::MAX));
        assert_eq!(same.min_k_size().unwrap(), None);
    }

    #[test]
    fn display_reads_like_source() {
        let iv = Interval::new(AxisBound::start(0), AxisBound::end(-1));
        assert_eq!(iv.to_string(), "0, -1");
        assert_eq!(Interval::full().to_string(), "...");
        let tail = Interval::new(AxisBound::start(1), AxisBound::end(0));
        assert_eq!(tail.to_string(), "1, None");
    }
}
