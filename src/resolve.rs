//! Turn a parameter name into the value to check

use std::fmt;

use tracing::debug;

use crate::stats::{fields, CounterSnapshot};
use crate::threshold::Thresholds;
use crate::Status;

/// The name of the cache hit ratio
pub const RATIO: &str = "ratio";
/// Older name for the cache hit ratio, kept so existing checks keep working
pub const RATIO_ALIAS: &str = "hitrate";
pub const RATIO_LABEL: &str = "Cache hit ratio";

/// The value of a parameter
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// A raw varnish counter
    Counter(u64),
    /// A percentage, 0 to 100
    Ratio(f64),
}

impl Value {
    /// Check this value against thresholds
    pub fn status(self, thresholds: &Thresholds) -> Status {
        match self {
            Value::Counter(n) => thresholds.status(i128::from(n)),
            Value::Ratio(r) => thresholds.status(r),
        }
    }
}

impl fmt::Display for Value {
    /// Counters are printed as they are. Ratios get at most two decimals,
    /// without trailing zeros, so 100% is `100` and a third is `33.33`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Counter(n) => write!(f, "{}", n),
            Value::Ratio(r) => {
                let s = format!("{:.2}", r);
                f.write_str(s.trim_end_matches('0').trim_end_matches('.'))
            }
        }
    }
}

/// A parameter resolved against a snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    /// The parameter name as it was asked for
    pub name: String,
    pub value: Value,
    pub label: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownParameter(pub String);

impl fmt::Display for UnknownParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid parameter: {}", self.0)
    }
}

pub fn is_ratio(name: &str) -> bool {
    name == RATIO || name == RATIO_ALIAS
}

/// Percentage of lookups that were hits
///
/// Zero when there have been no lookups at all.
pub fn hit_ratio(hit: u64, miss: u64) -> f64 {
    let total = hit as f64 + miss as f64;
    if total > 0.0 {
        100.0 * hit as f64 / total
    } else {
        0.0
    }
}

/// Look up `name` in the snapshot
///
/// `ratio` and `hitrate` compute the hit ratio. Known varnish counters get
/// their usual description, other counters the snapshot has (backends,
/// storage, ...) get whatever description varnishstat gave them.
pub fn resolve(name: &str, snapshot: &CounterSnapshot) -> Result<Reading, UnknownParameter> {
    let unknown = || UnknownParameter(name.to_owned());

    if is_ratio(name) {
        let hit = snapshot.value("cache_hit").ok_or_else(unknown)?;
        let miss = snapshot.value("cache_miss").unwrap_or(0);
        debug!(hit, miss, "computing hit ratio");
        return Ok(Reading {
            name: name.to_owned(),
            value: Value::Ratio(hit_ratio(hit, miss)),
            label: RATIO_LABEL.to_owned(),
        });
    }

    let counter = snapshot.get(name).ok_or_else(unknown)?;
    let label = match fields::lookup(name) {
        Some(field) => field.description.to_owned(),
        None => counter
            .description
            .clone()
            .unwrap_or_else(|| name.to_owned()),
    };
    debug!(name, value = counter.value, %label, "resolved counter");
    Ok(Reading {
        name: name.to_owned(),
        value: Value::Counter(counter.value),
        label,
    })
}
