//! Command line definition

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::time::Duration;
use tornread_core::{HarnessConfig, IsolationLevel, ReadStrategy};
use tornread_memstore::LatencyModel;

pub(crate) fn command() -> Command {
    Command::new("tornread")
        .version(tornread_core::VERSION)
        .about("Detect torn reads of a head/segment pair under concurrent writes")
        .arg(
            Arg::new("run-for")
                .long("run-for")
                .env("RUN_FOR")
                .default_value("100")
                .value_parser(value_parser!(u64))
                .help("Iterations per loop"),
        )
        .arg(
            Arg::new("strategy")
                .long("strategy")
                .action(ArgAction::Append)
                .value_parser(|s: &str| s.parse::<ReadStrategy>())
                .help("Read strategy to run (repeatable, default: all)"),
        )
        .arg(
            Arg::new("isolation")
                .long("isolation")
                .default_value("repeatable-read")
                .value_parser(|s: &str| s.parse::<IsolationLevel>())
                .help("Isolation level of transactional strategies"),
        )
        .arg(
            Arg::new("settle-ms")
                .long("settle-ms")
                .default_value("500")
                .value_parser(value_parser!(u64))
                .help("Pause between scenarios in milliseconds"),
        )
        .arg(
            Arg::new("latency-us")
                .long("latency-us")
                .default_value("200")
                .value_parser(value_parser!(u64))
                .help("Base statement latency of the memory store"),
        )
        .arg(
            Arg::new("jitter-us")
                .long("jitter-us")
                .default_value("800")
                .value_parser(value_parser!(u64))
                .help("Upper bound of random extra latency"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("42")
                .value_parser(value_parser!(u64))
                .help("Random seed for reproducibility"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the run report as JSON"),
        )
        .arg(
            Arg::new("allow-failures")
                .long("allow-failures")
                .action(ArgAction::SetTrue)
                .help("Exit with 0 even when a scenario fails"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
}

/// Parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Options {
    pub(crate) config: HarnessConfig,
    pub(crate) latency: LatencyModel,
    pub(crate) json: bool,
    pub(crate) allow_failures: bool,
    pub(crate) log_json: bool,
}

impl Options {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Self {
        let mut config = HarnessConfig::new();
        if let Some(&run_for) = matches.get_one::<u64>("run-for") {
            config = config.with_run_for(run_for);
        }
        if let Some(&isolation) = matches.get_one::<IsolationLevel>("isolation") {
            config = config.with_isolation(isolation);
        }
        if let Some(strategies) = matches.get_many::<ReadStrategy>("strategy") {
            config = config.with_strategies(strategies.copied());
        }
        if let Some(&ms) = matches.get_one::<u64>("settle-ms") {
            config = config.with_settle_delay(Duration::from_millis(ms));
        }

        let micros =
            |id: &str| Duration::from_micros(matches.get_one::<u64>(id).copied().unwrap_or(0));
        let base = micros("latency-us");
        let seed = matches.get_one::<u64>("seed").copied().unwrap_or(42);
        let latency = LatencyModel::fixed(base, base).with_jitter(micros("jitter-us"), seed);

        Self {
            config,
            latency,
            json: matches.get_flag("json"),
            allow_failures: matches.get_flag("allow-failures"),
            log_json: matches.get_flag("log-json"),
        }
    }
}
