//! Command-line handling shared by the `nf1` and `nf2` binaries.

use std::path::PathBuf;

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/nf.json";

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve with the configuration at `config`.
    Run {
        /// Path to the configuration file.
        config: PathBuf,
    },
    /// Print usage and exit.
    Help,
    /// Print the version and exit.
    Version,
}

/// Parses the arguments that follow the program name.
///
/// Returns a message suitable for stderr on an unknown or incomplete
/// argument.
pub fn parse_args<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config = PathBuf::from(DEFAULT_CONFIG_PATH);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| format!("{arg} requires a path"))?;
            }
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-v" => return Ok(Command::Version),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    Ok(Command::Run { config })
}

/// Usage text for `binary`, listing the role's environment prefix.
pub fn usage(binary: &str, summary: &str, env_prefix: &str) -> String {
    format!(
        r"{summary}

USAGE:
    {binary} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file, JSON or TOML (default: {DEFAULT_CONFIG_PATH})
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    {env_prefix}__<SECTION>__<KEY>   Override a configuration value, e.g. {env_prefix}__PEER__TIMEOUT_SECS=5
    RUST_LOG                       Replace the configured log filter

A .env file in the working directory is loaded before the overrides.
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(
            parse(&[]).unwrap(),
            Command::Run {
                config: PathBuf::from("config/nf.json")
            }
        );
    }

    #[test]
    fn test_config_flag() {
        for flag in ["--config", "-c"] {
            assert_eq!(
                parse(&[flag, "/etc/nf1.toml"]).unwrap(),
                Command::Run {
                    config: PathBuf::from("/etc/nf1.toml")
                }
            );
        }
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["-h"]).unwrap(), Command::Help);
        assert_eq!(parse(&["--version"]).unwrap(), Command::Version);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse(&["--config"]).unwrap_err().contains("requires a path"));
        assert!(parse(&["--port"]).unwrap_err().contains("Unknown argument"));
    }

    #[test]
    fn test_usage_mentions_prefix() {
        let text = usage("nf2", "NF2 relay", "NF2");
        assert!(text.contains("NF2__<SECTION>__<KEY>"));
        assert!(text.contains("config/nf.json"));
    }
}
