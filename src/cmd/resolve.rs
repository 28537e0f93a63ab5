//! Offline evaluation of the group header authorizer.

use std::{collections::HashSet, str::FromStr};
use hyper::{header::{HeaderName, HeaderValue}, HeaderMap};

use crate::{
    auth::{Caller, Credentials, GroupHeaderAuthorizer, HeaderPrincipalMapping, HttpRequest},
    config::Config,
    prelude::*,
};


#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Header of the simulated request (e.g.
    /// `-H 'On-Behalf-Of-Django-Groups: staff,students'`). Can be repeated.
    #[arg(short = 'H', long = "header")]
    pub(crate) headers: Vec<Header>,

    /// Role the container granted to the caller. Can be repeated. Use
    /// `fedoraAdmin` to simulate a trusted service. Without any role, the
    /// caller is anonymous.
    #[arg(long = "role")]
    pub(crate) roles: Vec<String>,

    /// Simulate credentials that are not backed by an HTTP request.
    #[arg(long, conflicts_with_all = ["headers", "roles"])]
    pub(crate) no_request: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub(crate) name: HeaderName,
    pub(crate) value: HeaderValue,
}

impl FromStr for Header {
    type Err = String;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let (l, r) = src.split_once(':')
            .ok_or_else(|| "invalid header value: missing colon".to_string())?;
        let name = HeaderName::from_bytes(l.trim().as_bytes())
            .map_err(|e| format!("invalid header name: {e}"))?;
        let value = HeaderValue::from_bytes(r.trim().as_bytes())
            .map_err(|e| format!("invalid header value: {e}"))?;

        Ok(Self { name, value })
    }
}

pub(crate) fn run(args: &Args, config: &Config) -> Result<()> {
    let authorizer = HeaderPrincipalMapping::from_config(&config.groups)?
        .pipe(GroupHeaderAuthorizer::new);

    let headers = args.headers.iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect::<HeaderMap>();
    let caller = if args.roles.is_empty() {
        Caller::Anonymous
    } else {
        Caller::Service {
            name: "command line".into(),
            roles: args.roles.iter().cloned().collect::<HashSet<_>>(),
        }
    };
    let request = HttpRequest::new(&headers, &caller);
    let credentials = if args.no_request {
        Credentials::Other
    } else {
        Credentials::Http(Some(&request))
    };
    debug!("Resolving principals for {credentials:?} (caller: {})", caller.debug_log_name());

    let outcome = authorizer.check(credentials);
    if args.json {
        let principals = outcome.clone().unwrap_or_default();
        let reason = outcome.err().map(|reason| reason.to_string());
        let out = serde_json::json!({ "principals": principals, "ineligible": reason });
        println!("{out:#}");
        return Ok(());
    }

    match outcome {
        Ok(principals) if principals.is_empty() => {
            bunt::println!("{$yellow}No principals{/$} {$dimmed}(groups header is empty){/$}");
        }
        Ok(principals) => {
            for principal in &principals {
                bunt::println!(" ▸ {[bold]}", principal);
            }
        }
        Err(reason) => bunt::println!("{$yellow}No principals{/$} {$dimmed}({}){/$}", reason),
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::Header;

    #[test]
    fn parse_header() {
        let h = " X-Groups :  a, b ".parse::<Header>().unwrap();
        assert_eq!(h.name.as_str(), "x-groups");
        assert_eq!(h.value, "a, b");

        let empty = "x-groups:".parse::<Header>().unwrap();
        assert_eq!(empty.value, "");
    }

    #[test]
    fn parse_header_errors() {
        assert!("x-groups".parse::<Header>().is_err());
        assert!(": value".parse::<Header>().is_err());
        assert!("two words: value".parse::<Header>().is_err());
    }
}
