//! Warning and critical thresholds, and how a value is judged against them
//!
//! A threshold is either a plain limit (`-w 95`) compared in a fixed
//! direction, or a nagios range (`-w @10:20`, `-c 5:`) that the value must
//! stay inside of.

use std::fmt;
use std::num;
use std::str::FromStr;

use crate::Status;

/// Which side of a limit is bad
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Alert when the value grows to the limit
    GreaterIsBad,
    /// Alert when the value shrinks to the limit
    LessIsBad,
}

impl Direction {
    /// Whether `value` is strictly on the good side of `limit`
    ///
    /// Hitting the limit exactly is never good.
    pub fn is_good<T: PartialOrd>(self, value: T, limit: T) -> bool {
        match self {
            Direction::GreaterIsBad => value < limit,
            Direction::LessIsBad => value > limit,
        }
    }
}

/// Judge `value` against both limits
///
/// OK while the value is on the good side of `warn`, WARNING while it is
/// still on the good side of `crit`, CRITICAL otherwise.
pub fn evaluate<T: PartialOrd + Copy>(value: T, warn: T, crit: T, direction: Direction) -> Status {
    if direction.is_good(value, warn) {
        Status::Ok
    } else if direction.is_good(value, crit) {
        Status::Warning
    } else {
        Status::Critical
    }
}

/// Like `evaluate`, skipping whichever tier has no limit
pub fn evaluate_partial<T: PartialOrd + Copy>(
    value: T,
    warn: Option<T>,
    crit: Option<T>,
    direction: Direction,
) -> Status {
    match (warn, crit) {
        (Some(warn), Some(crit)) => evaluate(value, warn, crit, direction),
        (Some(warn), None) => {
            if direction.is_good(value, warn) {
                Status::Ok
            } else {
                Status::Warning
            }
        }
        (None, Some(crit)) => {
            if direction.is_good(value, crit) {
                Status::Ok
            } else {
                Status::Critical
            }
        }
        (None, None) => Status::Unknown,
    }
}

/// Errors building thresholds from the command line
#[derive(Debug, PartialEq)]
pub enum ThresholdError {
    /// Nothing (or just `@`) was given
    Empty,
    /// A limit or range bound that isn't an integer
    InvalidBound(String, num::ParseIntError),
    /// A range whose low end is above its high end
    Inverted { lo: i64, hi: i64 },
    /// A range given for one threshold and a plain limit for the other
    MixedThresholds,
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ThresholdError::*;
        match self {
            Empty => write!(f, "empty threshold"),
            InvalidBound(bound, e) => write!(f, "invalid threshold bound '{}': {}", bound, e),
            Inverted { lo, hi } => write!(f, "range start {} is greater than its end {}", lo, hi),
            MixedThresholds => write!(
                f,
                "warning and critical must both be plain limits or both be ranges"
            ),
        }
    }
}

fn parse_bound(s: &str) -> Result<i64, ThresholdError> {
    s.parse()
        .map_err(|e| ThresholdError::InvalidBound(s.to_owned(), e))
}

/// A nagios range: `[@][lo:]hi`
///
/// The value is fine while it is inside `lo..=hi`. A leading `@` inverts
/// that, so the value is fine only while it is outside. A missing bound is
/// unbounded on that side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub lo: Option<i64>,
    pub hi: Option<i64>,
    pub inverted: bool,
}

impl Range {
    fn contains<T: Measure>(&self, value: T) -> bool {
        let above_lo = self.lo.map_or(true, |lo| value >= T::from_limit(lo));
        let below_hi = self.hi.map_or(true, |hi| value <= T::from_limit(hi));
        above_lo && below_hi
    }

    /// Whether the value should raise an alert
    pub fn alerts<T: Measure>(&self, value: T) -> bool {
        if self.inverted {
            self.contains(value)
        } else {
            !self.contains(value)
        }
    }
}

impl FromStr for Range {
    type Err = ThresholdError;

    /// Allowed forms are `N`, `M:N`, `M:` and `~:N`, optionally preceded by
    /// `@`. `:N` is rejected since nagios doesn't say what it means.
    fn from_str(s: &str) -> Result<Range, ThresholdError> {
        let (inverted, bounds) = match s.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if bounds.is_empty() {
            return Err(ThresholdError::Empty);
        }

        let (lo, hi) = match bounds.find(':') {
            Some(delim) => {
                let (lo, hi) = (&bounds[..delim], &bounds[delim + 1..]);
                let lo = if lo == "~" { None } else { Some(parse_bound(lo)?) };
                let hi = if hi.is_empty() { None } else { Some(parse_bound(hi)?) };
                (lo, hi)
            }
            None => (Some(0), Some(parse_bound(bounds)?)),
        };

        if let (Some(lo), Some(hi)) = (lo, hi) {
            if lo > hi {
                return Err(ThresholdError::Inverted { lo, hi });
            }
        }

        Ok(Range { lo, hi, inverted })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.inverted {
            f.write_str("@")?;
        }
        match self.lo {
            Some(lo) => write!(f, "{}:", lo)?,
            None => f.write_str("~:")?,
        }
        if let Some(hi) = self.hi {
            write!(f, "{}", hi)?;
        }
        Ok(())
    }
}

/// One threshold as given on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Threshold {
    Limit(i64),
    Range(Range),
}

impl FromStr for Threshold {
    type Err = ThresholdError;

    /// A plain integer is a limit, anything with `@` or `:` is a range
    fn from_str(s: &str) -> Result<Threshold, ThresholdError> {
        let s = s.trim();
        if s.is_empty() {
            Err(ThresholdError::Empty)
        } else if s.starts_with('@') || s.contains(':') {
            Ok(Threshold::Range(s.parse()?))
        } else {
            Ok(Threshold::Limit(parse_bound(s)?))
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Threshold::Limit(limit) => write!(f, "{}", limit),
            Threshold::Range(range) => write!(f, "{}", range),
        }
    }
}

/// Something thresholds can be compared against
///
/// Counters are compared as `i128` so that no `u64` counter or `i64` limit
/// loses precision, ratios are compared as `f64`.
pub trait Measure: PartialOrd + Copy {
    fn from_limit(limit: i64) -> Self;
}

impl Measure for i128 {
    fn from_limit(limit: i64) -> i128 {
        i128::from(limit)
    }
}

impl Measure for f64 {
    fn from_limit(limit: i64) -> f64 {
        limit as f64
    }
}

/// The warning and critical thresholds for one check
#[derive(Clone, Debug, PartialEq)]
pub enum Thresholds {
    Limits {
        warn: Option<i64>,
        crit: Option<i64>,
        direction: Direction,
    },
    Ranges {
        warn: Option<Range>,
        crit: Option<Range>,
    },
}

impl Thresholds {
    /// Combine both thresholds, which must be of the same kind
    ///
    /// `direction` only applies to plain limits.
    pub fn new(
        warn: Option<Threshold>,
        crit: Option<Threshold>,
        direction: Direction,
    ) -> Result<Thresholds, ThresholdError> {
        use self::Threshold::{Limit, Range};
        match (warn, crit) {
            (Some(Range(w)), Some(Range(c))) => Ok(Thresholds::Ranges {
                warn: Some(w),
                crit: Some(c),
            }),
            (Some(Range(w)), None) => Ok(Thresholds::Ranges {
                warn: Some(w),
                crit: None,
            }),
            (None, Some(Range(c))) => Ok(Thresholds::Ranges {
                warn: None,
                crit: Some(c),
            }),
            (Some(Range(_)), Some(Limit(_))) | (Some(Limit(_)), Some(Range(_))) => {
                Err(ThresholdError::MixedThresholds)
            }
            (warn, crit) => Ok(Thresholds::Limits {
                warn: warn.and_then(Threshold::limit),
                crit: crit.and_then(Threshold::limit),
                direction,
            }),
        }
    }

    /// The status of `value` against these thresholds
    pub fn status<T: Measure>(&self, value: T) -> Status {
        match *self {
            Thresholds::Limits {
                warn,
                crit,
                direction,
            } => evaluate_partial(
                value,
                warn.map(T::from_limit),
                crit.map(T::from_limit),
                direction,
            ),
            Thresholds::Ranges { warn, crit } => {
                if warn.is_none() && crit.is_none() {
                    Status::Unknown
                } else if crit.map_or(false, |c| c.alerts(value)) {
                    Status::Critical
                } else if warn.map_or(false, |w| w.alerts(value)) {
                    Status::Warning
                } else {
                    Status::Ok
                }
            }
        }
    }
}

impl Threshold {
    fn limit(self) -> Option<i64> {
        match self {
            Threshold::Limit(limit) => Some(limit),
            Threshold::Range(_) => None,
        }
    }
}
