use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: amee [--config <path>] [--log-dir <path>] [--single-cycle]";

/// Command line surface of the `amee` binary.
///
/// `--single-cycle` runs exactly one feedback cycle and exits instead of
/// orchestrating continuously; `--log-dir` overrides `logging.dir` from the
/// config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: PathBuf,
    pub single_cycle: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("./amee.jsonc"),
            single_cycle: false,
            log_dir: None,
        }
    }
}

pub fn parse_args() -> Result<CliArgs> {
    parse_from(env::args().skip(1))
}

fn parse_from(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut args = args.into_iter();
    let mut parsed = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config. {USAGE}"))?;
                parsed.config_path = PathBuf::from(value);
            }
            "--log-dir" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --log-dir. {USAGE}"))?;
                parsed.log_dir = Some(PathBuf::from(value));
            }
            "--single-cycle" => parsed.single_cycle = true,
            other => {
                return Err(anyhow!("unknown argument: {other}. {USAGE}"));
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{CliArgs, parse_from};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn no_arguments_yield_defaults() {
        let parsed = parse_from(args(&[])).expect("empty args should parse");
        assert_eq!(parsed, CliArgs::default());
        assert_eq!(parsed.config_path, PathBuf::from("./amee.jsonc"));
        assert!(!parsed.single_cycle);
    }

    #[test]
    fn config_log_dir_and_mode_are_parsed() {
        let parsed = parse_from(args(&[
            "--config",
            "/etc/amee/core.jsonc",
            "--log-dir",
            "/var/log/amee",
            "--single-cycle",
        ]))
        .expect("full argument set should parse");

        assert_eq!(parsed.config_path, PathBuf::from("/etc/amee/core.jsonc"));
        assert_eq!(parsed.log_dir, Some(PathBuf::from("/var/log/amee")));
        assert!(parsed.single_cycle);
    }

    #[test]
    fn missing_flag_value_is_rejected() {
        let err = parse_from(args(&["--log-dir"])).expect_err("dangling flag should fail");
        assert!(err.to_string().contains("--log-dir"));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = parse_from(args(&["--verbose"])).expect_err("unknown flag should fail");
        assert!(err.to_string().contains("--verbose"));
    }
}
