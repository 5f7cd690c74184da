//! Put a request, a snapshot and thresholds together into a report

use std::fmt;

use derive_more::From;
use tracing::{debug, warn};

use crate::resolve::{self, Reading, UnknownParameter, RATIO};
use crate::stats::{CounterSnapshot, StatsError};
use crate::threshold::{Direction, Threshold, ThresholdError, Thresholds};
use crate::Status;

/// Warning threshold for the hit ratio when nothing else is asked for
pub const DEFAULT_RATIO_WARN: i64 = 95;
/// Critical threshold for the hit ratio when nothing else is asked for
pub const DEFAULT_RATIO_CRIT: i64 = 90;

pub static USAGE: &str =
    "usage: check-varnish [-lv] [-n varnish_name] [-p param_name [-c N] [-w N]]";

/// Everything that stops a check from producing a verdict
#[derive(Debug, From)]
pub enum CheckError {
    /// The counters couldn't be read
    SourceUnavailable(StatsError),
    /// The flags given don't make a check
    #[from(ignore)]
    Usage(String),
    UnknownParameter(UnknownParameter),
}

impl CheckError {
    /// The status to exit with
    ///
    /// `unavailable` is what to report when varnish couldn't be read at all.
    pub fn status(&self, unavailable: Status) -> Status {
        match self {
            CheckError::SourceUnavailable(_) => unavailable,
            CheckError::Usage(_) | CheckError::UnknownParameter(_) => Status::Unknown,
        }
    }
}

impl From<ThresholdError> for CheckError {
    fn from(e: ThresholdError) -> CheckError {
        CheckError::Usage(e.to_string())
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CheckError::SourceUnavailable(e) => {
                write!(f, "Unknown: unable to read varnish counters: {}", e)
            }
            CheckError::Usage(msg) => write!(f, "{}\n{}", msg, USAGE),
            CheckError::UnknownParameter(e) => write!(f, "{}", e),
        }
    }
}

/// What to check, with all defaults filled in
#[derive(Clone, Debug, PartialEq)]
pub struct CheckRequest {
    pub param: String,
    pub thresholds: Thresholds,
}

impl CheckRequest {
    /// Apply defaults to the flags and validate them
    ///
    /// Without a parameter the hit ratio is checked, and if there are no
    /// thresholds either it warns below 95% and goes critical below 90%. An
    /// explicit parameter needs at least one threshold.
    pub fn new(
        param: Option<&str>,
        warn: Option<Threshold>,
        crit: Option<Threshold>,
        less: bool,
    ) -> Result<CheckRequest, CheckError> {
        let direction = if less {
            Direction::LessIsBad
        } else {
            Direction::GreaterIsBad
        };

        let (param, warn, crit, direction) = match param {
            None if warn.is_none() && crit.is_none() => (
                RATIO,
                Some(Threshold::Limit(DEFAULT_RATIO_WARN)),
                Some(Threshold::Limit(DEFAULT_RATIO_CRIT)),
                Direction::LessIsBad,
            ),
            None => (RATIO, warn, crit, direction),
            Some(param) if warn.is_none() && crit.is_none() => {
                return Err(CheckError::Usage(format!(
                    "no warning or critical threshold given for '{}'",
                    param
                )));
            }
            Some(param) => (param, warn, crit, direction),
        };

        let thresholds = Thresholds::new(warn, crit, direction)?;
        if less {
            if let Thresholds::Ranges { .. } = thresholds {
                warn!("-l has no effect on range thresholds");
            }
        }
        debug!(param, ?thresholds, "check request");
        Ok(CheckRequest {
            param: param.to_owned(),
            thresholds,
        })
    }
}

/// The outcome of a check
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub status: Status,
    pub reading: Reading,
}

impl Report {
    /// Nagios performance data for the reading: `name=value`
    pub fn perfdata(&self) -> String {
        format!("{}={}", self.reading.name, self.reading.value)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} {}",
            self.status, self.reading.value, self.reading.label
        )
    }
}

/// Resolve the requested parameter and judge it
pub fn check(snapshot: &CounterSnapshot, request: &CheckRequest) -> Result<Report, CheckError> {
    let reading = resolve::resolve(&request.param, snapshot)?;
    let status = reading.value.status(&request.thresholds);
    debug!(%status, value = %reading.value, "evaluated");
    Ok(Report { status, reading })
}
