//! Check the health of a running varnish
//!
//! Reads the counters `varnishstat` exposes and compares one of them, or the
//! cache hit ratio, against warning and critical thresholds.

use std::path::PathBuf;

use structopt::clap::{AppSettings, ErrorKind};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use varnish_plugins::check::{check, CheckError, CheckRequest, Report};
use varnish_plugins::stats::fields::FIELDS;
use varnish_plugins::stats::{SnapshotFile, StatsSource, Varnishstat};
use varnish_plugins::threshold::Threshold;
use varnish_plugins::Status;

/// Check the health of a running varnish.
///
/// Without any options this checks the cache hit ratio, warning under 95% and
/// going critical under 90%.
#[derive(StructOpt, Debug)]
#[structopt(
    name = "check-varnish (part of varnish-plugins)",
    setting = AppSettings::ColoredHelp,
    after_help = "About parameters:

    Every counter reported by varnishstat is available, use the name in the
    left column of 'varnishstat -l' (or see --list). Varnish 4 and later name
    the main counters MAIN.<name>, either spelling works.

        ratio           The cache hit ratio as a percentage of hits to
                        hits + misses. 'hitrate' is the same thing.
        uptime          How long the cache has been running (in seconds)
        MAIN.n_purges   Number of purge operations executed

About thresholds:

    A plain number N alerts when the value reaches N, or with -l when it
    drops to N. A nagios range [@][lo:]hi alerts when the value leaves the
    range, or with @ when it enters it. Ranges and plain numbers can't be
    mixed."
)]
struct Args {
    #[structopt(short = "p", long = "param", help = "The counter to check. Default: ratio")]
    param: Option<String>,
    #[structopt(
        short = "w",
        long = "warn",
        allow_hyphen_values = true,
        help = "Warning threshold: N or a nagios range [@][lo:]hi"
    )]
    warn: Option<Threshold>,
    #[structopt(
        short = "c",
        long = "crit",
        allow_hyphen_values = true,
        help = "Critical threshold: N or a nagios range [@][lo:]hi"
    )]
    crit: Option<Threshold>,
    #[structopt(
        short = "l",
        long = "less",
        help = "Alert when the value is less than the thresholds"
    )]
    less: bool,
    #[structopt(short = "n", long = "name", help = "The varnish instance name")]
    name: Option<String>,
    #[structopt(
        short = "v",
        long = "verbose",
        parse(from_occurrences),
        help = "Log more to stderr. May be given several times"
    )]
    verbose: u8,
    #[structopt(long = "perfdata", help = "Append nagios perfdata to the output line")]
    perfdata: bool,
    #[structopt(long = "list", help = "Print the known varnish counters and exit")]
    list: bool,
    #[structopt(
        long = "stats-file",
        parse(from_os_str),
        help = "Read counters from a `varnishstat -j` or `-1` dump"
    )]
    stats_file: Option<PathBuf>,
    #[structopt(
        long = "varnishstat",
        parse(from_os_str),
        default_value = "varnishstat",
        help = "The varnishstat program to run"
    )]
    varnishstat: PathBuf,
    #[structopt(
        long = "unavailable",
        default_value = "unknown",
        possible_values = &Status::str_values(),
        help = "Status when counters cannot be read"
    )]
    unavailable: Status,
}

impl Args {
    /// Parse the command line, exiting 0 for help and 3 for anything invalid
    fn parse() -> Args {
        match Args::from_iter_safe(std::env::args_os()) {
            Ok(args) => args,
            Err(e) => match e.kind {
                ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => {
                    eprintln!("{}", e.message);
                    Status::Ok.exit();
                }
                _ => {
                    eprintln!("{}", e.message);
                    Status::Unknown.exit();
                }
            },
        }
    }

    fn source(&self) -> Box<dyn StatsSource> {
        match self.stats_file {
            Some(ref path) => Box::new(SnapshotFile::new(path.clone())),
            None => Box::new(Varnishstat::new(self.varnishstat.clone())),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn list_fields() {
    for field in FIELDS {
        println!("{:<24} {}", field.name, field.description);
    }
}

/// Everything between parsing the arguments and printing the verdict
fn run(args: &Args, source: &dyn StatsSource) -> Result<Report, CheckError> {
    let snapshot = source.open(args.name.as_deref())?;
    let request = CheckRequest::new(
        args.param.as_deref(),
        args.warn,
        args.crit,
        args.less,
    )?;
    check(&snapshot, &request)
}

fn output(args: &Args, report: &Report) -> String {
    if args.perfdata {
        format!("{}|{}", report, report.perfdata())
    } else {
        report.to_string()
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list {
        list_fields();
        Status::Ok.exit();
    }

    match run(&args, args.source().as_ref()) {
        Ok(report) => {
            info!(param = %report.reading.name, status = %report.status, "check complete");
            println!("{}", output(&args, &report));
            report.status.exit();
        }
        Err(e @ CheckError::Usage(_)) => {
            eprintln!("{}", e);
            e.status(args.unavailable).exit();
        }
        Err(e) => {
            println!("{}", e);
            e.status(args.unavailable).exit();
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use structopt::clap::ErrorKind;
    use structopt::StructOpt;
    use tempfile::NamedTempFile;

    use varnish_plugins::check::CheckError;
    use varnish_plugins::stats::{CounterSnapshot, StatsSource};
    use varnish_plugins::threshold::Threshold;
    use varnish_plugins::Status;

    use super::{output, run, Args};

    fn build_args(argv: Vec<&str>) -> Args {
        Args::from_iter(argv.into_iter())
    }

    struct Fixed(CounterSnapshot);

    impl StatsSource for Fixed {
        fn open(&self, _instance: Option<&str>) -> varnish_plugins::stats::Result<CounterSnapshot> {
            Ok(self.0.clone())
        }
    }

    fn hits(hit: u64, miss: u64) -> Fixed {
        Fixed(vec![("cache_hit", hit), ("cache_miss", miss), ("uptime", 3600)]
            .into_iter()
            .collect())
    }

    #[test]
    fn defaults() {
        let args = build_args(vec!["check-varnish"]);
        assert_eq!(args.param, None);
        assert_eq!(args.warn, None);
        assert_eq!(args.crit, None);
        assert!(!args.less);
        assert_eq!(args.verbose, 0);
        assert_eq!(args.unavailable, Status::Unknown);
        assert_eq!(args.varnishstat.to_str(), Some("varnishstat"));
    }

    #[test]
    fn flags() {
        let args = build_args(vec![
            "check-varnish", "-p", "uptime", "-w", "10", "-c", "@5:20", "-l", "-n", "edge", "-vv",
        ]);
        assert_eq!(args.param.as_deref(), Some("uptime"));
        assert_eq!(args.warn, Some(Threshold::Limit(10)));
        assert_eq!(args.crit, Some(Threshold::Range("@5:20".parse().unwrap())));
        assert!(args.less);
        assert_eq!(args.name.as_deref(), Some("edge"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn negative_thresholds() {
        let args = build_args(vec!["check-varnish", "-p", "uptime", "-w", "-5"]);
        assert_eq!(args.warn, Some(Threshold::Limit(-5)));
    }

    #[test]
    fn bad_arguments_are_errors() {
        let err = Args::from_iter_safe(vec!["check-varnish", "-x"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownArgument);
        assert!(Args::from_iter_safe(vec!["check-varnish", "-w", "ninety"]).is_err());
        assert!(Args::from_iter_safe(vec!["check-varnish", "--unavailable", "maybe"]).is_err());
        let err = Args::from_iter_safe(vec!["check-varnish", "-h"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::HelpDisplayed);
    }

    #[test]
    fn unavailable_status() {
        let args = build_args(vec!["check-varnish", "--unavailable", "warning"]);
        assert_eq!(args.unavailable, Status::Warning);
    }

    #[test]
    fn default_run_is_ok() {
        let args = build_args(vec!["check-varnish"]);
        let report = run(&args, &hits(100, 0)).unwrap();
        assert_eq!(report.status, Status::Ok);
        assert_eq!(output(&args, &report), "OK: 100 Cache hit ratio");
    }

    #[test]
    fn default_run_is_critical_under_ninety() {
        let args = build_args(vec!["check-varnish"]);
        let report = run(&args, &hits(85, 15)).unwrap();
        assert_eq!(report.status, Status::Critical);
        assert_eq!(output(&args, &report), "Critical: 85 Cache hit ratio");
    }

    #[test]
    fn perfdata_is_appended() {
        let args = build_args(vec!["check-varnish", "--perfdata", "-p", "uptime", "-w", "60"]);
        let report = run(&args, &hits(1, 1)).unwrap();
        assert_eq!(output(&args, &report), "Warning: 3600 Client uptime|uptime=3600");
    }

    #[test]
    fn param_without_thresholds_is_usage() {
        let args = build_args(vec!["check-varnish", "-p", "uptime"]);
        match run(&args, &hits(1, 1)) {
            Err(e @ CheckError::Usage(_)) => assert_eq!(e.status(args.unavailable), Status::Unknown),
            other => panic!("expected a usage error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_param() {
        let args = build_args(vec!["check-varnish", "-p", "bogus_counter_xyz", "-c", "1"]);
        let err = run(&args, &hits(1, 1)).unwrap_err();
        assert_eq!(err.status(args.unavailable), Status::Unknown);
        assert!(err.to_string().contains("bogus_counter_xyz"));
    }

    #[test]
    fn unreadable_source_uses_unavailable_status() {
        let args = build_args(vec!["check-varnish", "--unavailable", "warning"]);
        let dir = tempfile::tempdir().unwrap();
        let source = varnish_plugins::stats::SnapshotFile::new(dir.path().join("missing"));
        let err = run(&args, &source).unwrap_err();
        assert_eq!(err.status(args.unavailable), Status::Warning);
    }

    #[test]
    fn stats_file_selects_the_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cache_hit 9 0.00 Cache hits").unwrap();
        writeln!(file, "cache_miss 1 0.00 Cache misses").unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        let args = build_args(vec!["check-varnish", "--stats-file", &path]);
        let report = run(&args, args.source().as_ref()).unwrap();
        assert_eq!(output(&args, &report), "Critical: 90 Cache hit ratio");
    }
}
