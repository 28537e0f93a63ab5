use hyper::header::HeaderName;

use crate::prelude::*;
use super::{ContainerRequest, Principal, PrincipalSet, DEFAULT_SEPARATOR};


/// Which header carries the delegated groups and how it is tokenized.
#[derive(Debug, Clone, confique::Config)]
pub(crate) struct GroupsConfig {
    /// Name of the header containing the groups of the user the caller acts
    /// for. Only honored for callers with the `fedoraAdmin` role.
    #[config(default = "On-Behalf-Of-Django-Groups")]
    pub(crate) header: String,

    /// The string separating individual groups in the header value. Matched
    /// literally, must not be empty.
    #[config(default = ",")]
    pub(crate) separator: String,

    /// Whether to strip surrounding whitespace from each group name. Empty
    /// names are always dropped; with this set to `false`, a name consisting
    /// only of whitespace is kept as is.
    #[config(default = true)]
    pub(crate) trim: bool,
}

/// Maps the value of one header to a set of principals, one per
/// separator-delimited token.
#[derive(Debug, Clone)]
pub(crate) struct HeaderPrincipalMapping {
    header: HeaderName,
    separator: String,
    trim: bool,
}

impl HeaderPrincipalMapping {
    pub(crate) fn new(header: &str, separator: &str, trim: bool) -> Result<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .with_context(|| format!("'{header}' is not a valid HTTP header name"))?;
        if separator.is_empty() {
            bail!("group separator must not be empty");
        }

        Ok(Self {
            header,
            separator: separator.to_owned(),
            trim,
        })
    }

    pub(crate) fn from_config(config: &GroupsConfig) -> Result<Self> {
        Self::new(&config.header, &config.separator, config.trim)
    }

    pub(crate) fn header(&self) -> &HeaderName {
        &self.header
    }

    pub(crate) fn separator(&self) -> &str {
        &self.separator
    }

    /// Reads the configured header from `request` and parses it. Returns
    /// `None` if the header is not present.
    pub(crate) fn principals(&self, request: &dyn ContainerRequest) -> Option<PrincipalSet> {
        request.header(&self.header).map(|value| self.parse(value))
    }

    /// Splits `value` into principals. Empty tokens are dropped and duplicates
    /// collapse.
    pub(crate) fn parse(&self, value: &str) -> PrincipalSet {
        value.split(self.separator.as_str())
            .map(|token| if self.trim { token.trim() } else { token })
            .filter(|token| !token.is_empty())
            .map(Principal::new)
            .collect()
    }
}

impl Default for HeaderPrincipalMapping {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static("on-behalf-of-django-groups"),
            separator: DEFAULT_SEPARATOR.to_owned(),
            trim: true,
        }
    }
}
