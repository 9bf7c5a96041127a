//! Command-line and environment options.
//!
//! Precedence, lowest first: built-in defaults, `--config <file>`,
//! `FLOODMAX_*` environment variables, command-line flags.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use floodmax_gossip::{ConvergenceScope, SimulationConfig};

/// Wall-clock budget used when none is configured anywhere.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub config: SimulationConfig,
    /// Print the adjacency listing before running
    pub print_graph: bool,
    /// Print the outcome as JSON instead of text
    pub json: bool,
    pub help: bool,
}

pub fn print_usage() {
    eprintln!("floodmax - distributed maximum finding by flooding");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  floodmax [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --nodes <n>           Number of nodes (default: 1000)");
    eprintln!("  --degree <d>          Expected neighbors per node (default: 3)");
    eprintln!("  --weighted            Draw random edge weights");
    eprintln!("  --max-value <v>       Seeds drawn from [0, v) (default: 1000)");
    eprintln!("  --capacity <c>        Messages per link (default: node count)");
    eprintln!("  --poll-ms <ms>        Monitor poll interval (default: 5000)");
    eprintln!("  --max-polls <n>       Give up after n polls");
    eprintln!("  --timeout-secs <s>    Give up after s seconds (default: 60)");
    eprintln!("  --seed <u64>          Reproduce a run");
    eprintln!("  --scope <s>           component | global (default: component)");
    eprintln!("  --config <file>       JSON config file (see below)");
    eprintln!("  --print-graph         Print the adjacency listing first");
    eprintln!("  --json                Print the outcome as JSON");
    eprintln!();
    eprintln!("Config file keys:");
    eprintln!("  node_count, degree, weighted, max_value, link_capacity, poll_ms,");
    eprintln!("  max_polls, timeout_secs, scope, seed, retry_backoff_ms");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FLOODMAX_NODES, FLOODMAX_DEGREE, FLOODMAX_SEED, FLOODMAX_SCOPE,");
    eprintln!("  FLOODMAX_POLL_MS, FLOODMAX_TIMEOUT_SECS, FLOODMAX_CAPACITY");
    eprintln!("  RUST_LOG  Log filter (default: floodmax=info)");
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| format!("invalid value {raw:?} for {name}: {e}"))
}

fn load_file(path: &Path) -> Result<SimulationConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {:?}: {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {:?}: {}", path, e))
}

fn apply_env(
    config: &mut SimulationConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<(), String> {
    if let Some(v) = env("FLOODMAX_NODES") {
        config.node_count = parse("FLOODMAX_NODES", &v)?;
    }
    if let Some(v) = env("FLOODMAX_DEGREE") {
        config.degree = parse("FLOODMAX_DEGREE", &v)?;
    }
    if let Some(v) = env("FLOODMAX_SEED") {
        config.seed = Some(parse("FLOODMAX_SEED", &v)?);
    }
    if let Some(v) = env("FLOODMAX_SCOPE") {
        config.scope = parse("FLOODMAX_SCOPE", &v)?;
    }
    if let Some(v) = env("FLOODMAX_POLL_MS") {
        config.poll_interval = Duration::from_millis(parse("FLOODMAX_POLL_MS", &v)?);
    }
    if let Some(v) = env("FLOODMAX_TIMEOUT_SECS") {
        config.timeout = Some(Duration::from_secs(parse("FLOODMAX_TIMEOUT_SECS", &v)?));
    }
    if let Some(v) = env("FLOODMAX_CAPACITY") {
        config.link_capacity = Some(parse("FLOODMAX_CAPACITY", &v)?);
    }
    Ok(())
}

/// Parse `args` (without the program name), reading variables through `env`.
pub fn parse_args(args: &[String], env: &dyn Fn(&str) -> Option<String>) -> Result<Options, String> {
    // A config file is the lowest explicit layer, so find it first.
    let mut config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args
                .get(i + 1)
                .ok_or("--config requires a file argument")?;
            load_file(Path::new(path))?
        }
        None => SimulationConfig::default(),
    };
    apply_env(&mut config, env)?;

    let mut options = Options {
        config,
        print_graph: false,
        json: false,
        help: false,
    };

    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .map(String::as_str)
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        let config = &mut options.config;
        match flag.as_str() {
            "--nodes" => config.node_count = parse(flag, value()?)?,
            "--degree" => config.degree = parse(flag, value()?)?,
            "--weighted" => config.weighted = true,
            "--max-value" => config.max_value = parse(flag, value()?)?,
            "--capacity" => config.link_capacity = Some(parse(flag, value()?)?),
            "--poll-ms" => config.poll_interval = Duration::from_millis(parse(flag, value()?)?),
            "--max-polls" => config.max_polls = Some(parse(flag, value()?)?),
            "--timeout-secs" => config.timeout = Some(Duration::from_secs(parse(flag, value()?)?)),
            "--seed" => config.seed = Some(parse(flag, value()?)?),
            "--scope" => {
                config.scope = value()?
                    .parse::<ConvergenceScope>()
                    .map_err(|e| e.to_string())?
            }
            "--config" => {
                value()?;
            }
            "--print-graph" => options.print_graph = true,
            "--json" => options.json = true,
            "-h" | "--help" | "help" => options.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    if options.config.timeout.is_none() && options.config.max_polls.is_none() {
        options.config.timeout = Some(DEFAULT_TIMEOUT);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_add_timeout() {
        let options = parse_args(&[], &no_env).unwrap();
        assert_eq!(options.config.node_count, 1000);
        assert_eq!(options.config.timeout, Some(DEFAULT_TIMEOUT));
        assert!(!options.print_graph);
    }

    #[test]
    fn flags_override_defaults() {
        let options = parse_args(
            &args(&[
                "--nodes", "20", "--degree", "2.5", "--weighted", "--seed", "7", "--scope",
                "global", "--poll-ms", "50", "--max-polls", "9", "--print-graph", "--json",
            ]),
            &no_env,
        )
        .unwrap();

        let config = &options.config;
        assert_eq!(config.node_count, 20);
        assert_eq!(config.degree, 2.5);
        assert!(config.weighted);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.scope, ConvergenceScope::Global);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.max_polls, Some(9));
        assert_eq!(config.timeout, None);
        assert!(options.print_graph && options.json);
    }

    #[test]
    fn flags_beat_environment() {
        let vars: HashMap<&str, &str> = HashMap::from([("FLOODMAX_NODES", "30"), ("FLOODMAX_SEED", "5")]);
        let env = |k: &str| vars.get(k).map(|v| v.to_string());

        let options = parse_args(&args(&["--nodes", "40"]), &env).unwrap();
        assert_eq!(options.config.node_count, 40);
        assert_eq!(options.config.seed, Some(5));
    }

    #[test]
    fn reports_bad_values() {
        assert!(parse_args(&args(&["--nodes", "many"]), &no_env)
            .unwrap_err()
            .contains("--nodes"));
        assert!(parse_args(&args(&["--degree"]), &no_env)
            .unwrap_err()
            .contains("requires a value"));
        assert!(parse_args(&args(&["--scope", "sideways"]), &no_env).is_err());
        assert!(parse_args(&args(&["--frobnicate"]), &no_env).is_err());
    }

    #[test]
    fn help_flag() {
        assert!(parse_args(&args(&["--help"]), &no_env).unwrap().help);
    }

    #[test]
    fn config_file_uses_documented_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"node_count": 25, "poll_ms": 50, "timeout_secs": 4, "scope": "global"}"#,
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.node_count, 25);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.timeout, Some(Duration::from_secs(4)));
        assert_eq!(config.scope, ConvergenceScope::Global);

        // Flags still win over the file.
        let path = path.to_string_lossy().into_owned();
        let options = parse_args(&args(&["--config", path.as_str(), "--poll-ms", "20"]), &no_env).unwrap();
        assert_eq!(options.config.node_count, 25);
        assert_eq!(options.config.poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn config_file_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_file(&path).unwrap_err().contains("broken.json"));
        assert!(load_file(&dir.path().join("missing.json")).is_err());
    }
}
