//! Varnish plugins: a strongly typed Nagios/Sensu check for varnish
//!
//! The `check-varnish` binary reads the counters a running varnish exposes
//! through `varnishstat`, picks one of them (or the cache hit ratio) and
//! compares it against warning and critical thresholds.
//!
//! ```plain
//! $ check-varnish --help
//! USAGE:
//!     check-varnish [FLAGS] [OPTIONS]
//!
//! FLAGS:
//!     -h, --help        Prints help information
//!     -l, --less        Alert when the value is less than the thresholds
//!         --list        Print the known varnish counters and exit
//!         --perfdata    Append nagios perfdata to the output line
//!     -V, --version     Prints version information
//!     -v, --verbose     Log more to stderr. May be given several times
//!
//! OPTIONS:
//!     -c, --crit <crit>                  Critical threshold: N or a nagios range [@][lo:]hi
//!     -n, --name <name>                  The varnish instance name
//!     -p, --param <param>                The counter to check. Default: ratio
//!         --stats-file <stats-file>      Read counters from a `varnishstat -j` or `-1` dump
//!         --unavailable <unavailable>    Status when counters cannot be read [default: unknown]
//!         --varnishstat <varnishstat>    The varnishstat program to run [default: varnishstat]
//!     -w, --warn <warn>                  Warning threshold: N or a nagios range [@][lo:]hi
//! ```
//!
//! With no arguments the check alerts when the hit ratio drops under 95%
//! (warning) or 90% (critical).

use std::fmt;
use std::process;
use std::str::FromStr;

pub mod check;
pub mod resolve;
pub mod stats;
pub mod threshold;

/// All possible exit statuses for a check
///
/// Statuses are ordered by severity so that `max` picks the worst one.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    #![cfg_attr(test, allow(dead_code))]
    /// Exit the process with the nagios code for this status
    pub fn exit(self) -> ! {
        process::exit(self.code())
    }

    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn str_values() -> [&'static str; 4] {
        ["ok", "warning", "critical", "unknown"]
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidStatus(String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}', expected one of: {}",
            self.0,
            Status::str_values().join(", ")
        )
    }
}

impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Status, InvalidStatus> {
        match s {
            "ok" => Ok(Status::Ok),
            "warn" | "warning" => Ok(Status::Warning),
            "crit" | "critical" => Ok(Status::Critical),
            "unknown" => Ok(Status::Unknown),
            _ => Err(InvalidStatus(s.to_owned())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Status::Ok => "OK",
            Status::Warning => "Warning",
            Status::Critical => "Critical",
            Status::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod unit {
    use super::Status;
    use std::cmp::max;

    #[test]
    fn codes_follow_nagios() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::Warning.code(), 1);
        assert_eq!(Status::Critical.code(), 2);
        assert_eq!(Status::Unknown.code(), 3);
    }

    #[test]
    fn max_picks_the_worst() {
        assert_eq!(max(Status::Ok, Status::Warning), Status::Warning);
        assert_eq!(max(Status::Critical, Status::Warning), Status::Critical);
        assert_eq!(max(Status::Critical, Status::Unknown), Status::Unknown);
    }

    #[test]
    fn parses_all_str_values() {
        for s in Status::str_values().iter() {
            if let Err(e) = s.parse::<Status>() {
                panic!("Error parsing status '{}': {}", s, e);
            }
        }
        assert_eq!("warn".parse::<Status>(), Ok(Status::Warning));
        assert!("bad".parse::<Status>().is_err());
    }

    #[test]
    fn display_words() {
        let words: Vec<String> = [
            Status::Ok,
            Status::Warning,
            Status::Critical,
            Status::Unknown,
        ].iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(words, vec!["OK", "Warning", "Critical", "Unknown"]);
    }
}
