use std::fmt;

use crate::prelude::*;
use super::{
    Credentials, HeaderPrincipalMapping, PrincipalSet, FEDORA_ADMIN_ROLE,
};


/// Exposes the groups asserted in the groups header as principals, but only
/// for callers the container authenticated as administrators.
///
/// Only a trusted intermediary presenting its own service credential may
/// inject group claims. End clients forging the header gain nothing since they
/// don't hold the admin role.
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupHeaderAuthorizer {
    mapping: HeaderPrincipalMapping,
}

/// Why no principals were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ineligible {
    NotRequestBacked,
    MissingRequest,
    NotAdmin,
    HeaderAbsent,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotRequestBacked => "credentials are not backed by an HTTP request",
            Self::MissingRequest => "HTTP request of credentials is missing",
            Self::NotAdmin => "requesting user is not an admin",
            Self::HeaderAbsent => "groups header is not set",
        })
    }
}

impl GroupHeaderAuthorizer {
    pub(crate) fn new(mapping: HeaderPrincipalMapping) -> Self {
        Self { mapping }
    }

    pub(crate) fn mapping(&self) -> &HeaderPrincipalMapping {
        &self.mapping
    }

    /// Returns the principals for the groups header of the given credentials.
    /// The result is empty if the credentials are not eligible.
    pub(crate) fn resolve_principals(&self, credentials: Credentials<'_>) -> PrincipalSet {
        self.check(credentials).unwrap_or_else(|reason| {
            debug!(%reason, "Not resolving any group principals");
            PrincipalSet::new()
        })
    }

    /// Like [`Self::resolve_principals`], but tells you why nothing was
    /// resolved. A present but empty header is `Ok` with an empty set.
    pub(crate) fn check(&self, credentials: Credentials<'_>) -> Result<PrincipalSet, Ineligible> {
        let request = match credentials {
            Credentials::Other => return Err(Ineligible::NotRequestBacked),
            Credentials::Http(None) => return Err(Ineligible::MissingRequest),
            Credentials::Http(Some(request)) => request,
        };

        if !request.is_user_in_role(FEDORA_ADMIN_ROLE) {
            return Err(Ineligible::NotAdmin);
        }

        let principals = self.mapping.principals(request).ok_or(Ineligible::HeaderAbsent)?;
        trace!(
            header = %self.mapping.header(),
            count = principals.len(),
            "Resolved group principals",
        );
        Ok(principals)
    }
}
