//! Structs and impls for reading the counters varnish exposes
//!
//! Varnish publishes its counters in a shared memory segment that
//! `varnishstat` knows how to read. A `StatsSource` turns that (or a saved
//! dump of it) into a `CounterSnapshot`.

use std::collections::{btree_map, BTreeMap};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::iter::FromIterator;
use std::num;
use std::path::PathBuf;
use std::process::Command;
use std::result::Result as StdResult;
use std::str::FromStr;

use derive_more::From;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, trace, warn};

pub mod fields;

/// Stats errors
///
/// Every error from in this module can be converted into a `StatsError`
#[derive(Debug, From)]
pub enum StatsError {
    /// Errors originating in IO, including failing to start varnishstat
    Io(io::Error),
    /// The dump looked like json but wasn't
    Json(serde_json::Error),
    /// Happens when we try to parse an int from a `varnishstat -1` line
    InvalidInt(num::ParseIntError),
    /// varnishstat ran but couldn't read the instance
    #[from(ignore)]
    Unavailable(String),
    /// A line from `varnishstat -1` that doesn't look like a counter
    #[from(ignore)]
    InvalidLine(String),
    /// The dump contained no counters at all
    #[from(ignore)]
    Empty,
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> StdResult<(), fmt::Error> {
        use self::StatsError::*;
        match self {
            Io(e) => write!(f, "{}", e),
            Json(e) => write!(f, "invalid varnishstat json: {}", e),
            InvalidInt(e) => write!(f, "invalid counter value: {}", e),
            Unavailable(e) => write!(f, "{}", e),
            InvalidLine(line) => write!(f, "unexpected varnishstat line: '{}'", line),
            Empty => write!(f, "no counters found"),
        }
    }
}

pub type Result<T> = StdResult<T, StatsError>;

/// One varnish counter
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Counter {
    pub value: u64,
    /// The short description varnish gives for this counter, if any
    #[serde(default)]
    pub description: Option<String>,
}

impl Counter {
    pub fn new(value: u64) -> Counter {
        Counter {
            value,
            description: None,
        }
    }
}

/// Counters read from varnish at one moment
///
/// Varnish 4 and later put the main counters in the `MAIN` section, so
/// `cache_hit` is called `MAIN.cache_hit`. Lookups accept either spelling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CounterSnapshot {
    counters: BTreeMap<String, Counter>,
}

const MAIN_PREFIX: &str = "MAIN.";

impl CounterSnapshot {
    pub fn empty() -> CounterSnapshot {
        CounterSnapshot::default()
    }

    /// Find a counter by its bare or `MAIN.`-qualified name
    pub fn get(&self, name: &str) -> Option<&Counter> {
        if let Some(counter) = self.counters.get(name) {
            return Some(counter);
        }
        match name.strip_prefix(MAIN_PREFIX) {
            Some(bare) => self.counters.get(bare),
            None => self.counters.get(&format!("{}{}", MAIN_PREFIX, name)),
        }
    }

    pub fn value(&self, name: &str) -> Option<u64> {
        self.get(name).map(|c| c.value)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<String, Counter> {
        self.counters.iter()
    }

    /// Parse the output of `varnishstat -j`
    ///
    /// Both the flat layout of varnish 3 to 6.4 and the `counters` object of
    /// 6.5+ are understood. Members that aren't counters, like `timestamp`,
    /// are skipped.
    pub fn from_json(s: &str) -> Result<CounterSnapshot> {
        let mut doc: BTreeMap<String, serde_json::Value> = serde_json::from_str(s)?;
        let members = match doc.remove("counters") {
            Some(serde_json::Value::Object(counters)) => counters.into_iter().collect(),
            _ => doc,
        };

        let mut counters = BTreeMap::new();
        for (name, member) in members {
            if !member.is_object() {
                trace!(%name, "skipping non-counter member");
                continue;
            }
            match serde_json::from_value::<Counter>(member) {
                Ok(counter) => {
                    counters.insert(name, counter);
                }
                Err(e) => debug!(%name, error = %e, "skipping member without a counter value"),
            }
        }
        CounterSnapshot::non_empty(counters)
    }

    /// Parse the output of `varnishstat -1`
    ///
    /// Each line is `NAME VALUE RATE [DESCRIPTION]`, blank lines are skipped.
    pub fn from_plain(s: &str) -> Result<CounterSnapshot> {
        let pat = Regex::new(r"^(\S+)\s+(\d+)\s+\S+(?:\s+(.*?))?\s*$").unwrap();
        let mut counters = BTreeMap::new();
        for line in s.lines().filter(|line| !line.trim().is_empty()) {
            let caps = match pat.captures(line) {
                Some(caps) => caps,
                None => return Err(StatsError::InvalidLine(line.to_owned())),
            };
            let description = caps
                .get(3)
                .map(|d| d.as_str().to_owned())
                .filter(|d| !d.is_empty());
            counters.insert(
                caps[1].to_owned(),
                Counter {
                    value: caps[2].parse()?,
                    description,
                },
            );
        }
        CounterSnapshot::non_empty(counters)
    }

    fn non_empty(counters: BTreeMap<String, Counter>) -> Result<CounterSnapshot> {
        if counters.is_empty() {
            Err(StatsError::Empty)
        } else {
            Ok(CounterSnapshot { counters })
        }
    }
}

impl FromStr for CounterSnapshot {
    type Err = StatsError;

    /// Parse either `varnishstat` format, json if it starts like json
    fn from_str(s: &str) -> Result<CounterSnapshot> {
        if s.trim_start().starts_with('{') {
            CounterSnapshot::from_json(s)
        } else {
            CounterSnapshot::from_plain(s)
        }
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for CounterSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> CounterSnapshot {
        CounterSnapshot {
            counters: iter
                .into_iter()
                .map(|(name, value)| (name.into(), Counter::new(value)))
                .collect(),
        }
    }
}

/// Somewhere varnish counters can be read from
pub trait StatsSource {
    /// Read a snapshot of every counter of the named instance, or of the
    /// default instance if there is no name
    fn open(&self, instance: Option<&str>) -> Result<CounterSnapshot>;
}

/// Reads counters by running `varnishstat -j`
#[derive(Debug)]
pub struct Varnishstat {
    pub program: PathBuf,
}

impl Varnishstat {
    pub fn new<P: Into<PathBuf>>(program: P) -> Varnishstat {
        Varnishstat {
            program: program.into(),
        }
    }
}

impl StatsSource for Varnishstat {
    fn open(&self, instance: Option<&str>) -> Result<CounterSnapshot> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-j");
        if let Some(name) = instance {
            cmd.arg("-n").arg(name);
        }
        debug!(program = %self.program.display(), ?instance, "running varnishstat");

        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.trim();
            return Err(StatsError::Unavailable(format!(
                "{} failed ({}){}{}",
                self.program.display(),
                output.status,
                if reason.is_empty() { "" } else { ": " },
                reason
            )));
        }

        let snapshot = String::from_utf8_lossy(&output.stdout).parse::<CounterSnapshot>()?;
        debug!(counters = snapshot.len(), "read varnish counters");
        Ok(snapshot)
    }
}

/// Reads counters from a saved `varnishstat -j` or `varnishstat -1` dump
#[derive(Debug)]
pub struct SnapshotFile {
    pub path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> SnapshotFile {
        SnapshotFile { path: path.into() }
    }
}

impl StatsSource for SnapshotFile {
    fn open(&self, instance: Option<&str>) -> Result<CounterSnapshot> {
        if let Some(name) = instance {
            warn!(instance = name, "instance name is ignored when reading a stats file");
        }
        let mut fh = File::open(&self.path)?;
        let mut contents = String::new();
        fh.read_to_string(&mut contents)?;
        let snapshot = contents.parse::<CounterSnapshot>()?;
        debug!(path = %self.path.display(), counters = snapshot.len(), "read varnish counters");
        Ok(snapshot)
    }
}
