use crate::{
    auth::{delegation, DEFAULT_SEPARATOR, DELEGATION_HEADER},
    prelude::*,
};


#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// The user to act for, usually an email address. If not given, the
    /// anonymous URN is printed.
    #[arg(long)]
    pub(crate) user: Option<String>,

    /// A group of the user. Can be repeated.
    #[arg(long = "group", requires = "user")]
    pub(crate) groups: Vec<String>,

    /// The string to separate the URNs with.
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    pub(crate) separator: String,

    /// The header name printed in front of the value. This is the delegation
    /// header, not the groups header.
    #[arg(long, default_value = DELEGATION_HEADER)]
    pub(crate) header: String,

    /// Only print the header value, without the header name.
    #[arg(long)]
    pub(crate) value_only: bool,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    println!("{}", line(args)?);
    Ok(())
}

fn line(args: &Args) -> Result<String> {
    if args.separator.is_empty() {
        bail!("separator must not be empty");
    }

    let value = delegation::header_value(args.user.as_deref(), &args.groups, &args.separator);
    if args.value_only {
        Ok(value)
    } else {
        Ok(format!("{}: {value}", args.header))
    }
}


#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::args::{Args as CliArgs, Command};
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let cli = CliArgs::try_parse_from(["groupgate", "encode"].iter().chain(args)).unwrap();
        match cli.cmd {
            Command::Encode { args } => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn uses_delegation_header_by_default() {
        let out = line(&parse(&["--user", "peter@uni.edu", "--group", "staff"])).unwrap();
        assert_eq!(out, "On-Behalf-Of: urn:uni.edu/peter,urn:staff");
        assert!(!out.starts_with(crate::auth::DEFAULT_GROUPS_HEADER));
    }

    #[test]
    fn options() {
        assert_eq!(line(&parse(&[])).unwrap(), "On-Behalf-Of: urn:fedora:anonymous");
        assert_eq!(
            line(&parse(&["--user", "peter", "--group", "a", "--separator", ";", "--value-only"]))
                .unwrap(),
            "urn:peter;urn:a",
        );
        assert_eq!(
            line(&parse(&["--user", "peter", "--header", "X-Act-For"])).unwrap(),
            "X-Act-For: urn:peter",
        );
        assert!(line(&parse(&["--user", "peter", "--separator", ""])).is_err());
    }

    #[test]
    fn groups_require_user() {
        assert!(CliArgs::try_parse_from(["groupgate", "encode", "--group", "staff"]).is_err());
    }
}
