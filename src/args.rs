//! This module defines the command line arguments groupgate accepts.

use std::path::PathBuf;
use termcolor::ColorChoice;

use crate::cmd;


#[derive(Debug, clap::Parser)]
#[command(
    about = "Resolves groups asserted by a trusted proxy into principals.",
    version,
)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) cmd: Command,

    /// Whether to use colors and other ANSI codes in the output.
    #[arg(long, value_enum, default_value_t = ColorArg::Auto, global = true)]
    color: ColorArg,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
    /// Starts the HTTP server.
    Serve {
        #[command(flatten)]
        shared: Shared,
    },

    /// Resolves principals for the given request headers and caller roles,
    /// exactly like the server would. Useful to test a configuration.
    Resolve {
        #[command(flatten)]
        args: cmd::resolve::Args,

        #[command(flatten)]
        shared: Shared,
    },

    /// Prints the groups header a trusted proxy would send for the given user
    /// and groups.
    Encode {
        #[command(flatten)]
        args: cmd::encode::Args,
    },

    /// Checks the configuration to find problems early. Exits with 0 if
    /// everything is Ok, and with 1 otherwise.
    Check {
        #[command(flatten)]
        shared: Shared,
    },

    /// Outputs a template for the configuration file (which includes
    /// descriptions or all options).
    WriteConfig {
        /// Target file. If not specified, the template is written to stdout.
        target: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct Shared {
    /// Path to the configuration file. If this is not specified, we try
    /// `$GROUPGATE_CONFIG_PATH`, `config.toml` and `/etc/groupgate/config.toml`.
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ColorArg {
    Auto,
    Always,
    Never,
}

impl Args {
    pub(crate) fn color(&self) -> ColorChoice {
        match self.color {
            ColorArg::Auto => ColorChoice::Auto,
            ColorArg::Always => ColorChoice::Always,
            ColorArg::Never => ColorChoice::Never,
        }
    }

    /// Name of the subcommand, used in log file names.
    pub(crate) fn cmd_name(&self) -> &'static str {
        match self.cmd {
            Command::Serve { .. } => "serve",
            Command::Resolve { .. } => "resolve",
            Command::Check { .. } => "check",
            _ => "other",
        }
    }
}


#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_resolve() {
        let args = Args::try_parse_from([
            "groupgate", "--color", "never", "resolve",
            "-c", "conf.toml",
            "-H", "On-Behalf-Of-Django-Groups: a,b",
            "--role", "fedoraAdmin",
        ]).unwrap();

        assert_eq!(args.color(), ColorChoice::Never);
        assert_eq!(args.cmd_name(), "resolve");
        match args.cmd {
            Command::Resolve { args, shared } => {
                assert_eq!(shared.config, Some(PathBuf::from("conf.toml")));
                assert_eq!(args.headers.len(), 1);
                assert_eq!(args.headers[0].name.as_str(), "on-behalf-of-django-groups");
                assert_eq!(args.headers[0].value, "a,b");
                assert_eq!(args.roles, ["fedoraAdmin"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn invalid_header_argument() {
        assert!(Args::try_parse_from(["groupgate", "resolve", "-H", "no-colon"]).is_err());
        assert!(Args::try_parse_from(["groupgate", "resolve", "-H", "bad name: x"]).is_err());
    }
}
