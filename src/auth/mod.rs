//! Resolving delegated group memberships into principals.
//!
//! A trusted intermediary (usually the Django frontend) authenticates against
//! our container with its own service credential and tells us, via a header,
//! which groups the *end user* it acts for belongs to. We only honor that
//! header if the container certified the caller as administrator.

use std::{collections::BTreeSet, fmt};

use hyper::header::HeaderName;
use serde::Serialize;

mod authorizer;
mod container;
pub(crate) mod delegation;
mod mapping;


pub(crate) use self::{
    authorizer::{GroupHeaderAuthorizer, Ineligible},
    container::{Caller, ContainerConfig, HttpRequest, TrustedService},
    mapping::{GroupsConfig, HeaderPrincipalMapping},
};


/// Callers with this role are trusted to assert group memberships on behalf
/// of other users.
pub(crate) const FEDORA_ADMIN_ROLE: &str = "fedoraAdmin";

/// The header the Django frontend uses to pass the groups of the user it acts
/// for.
pub(crate) const DEFAULT_GROUPS_HEADER: &str = "On-Behalf-Of-Django-Groups";

pub(crate) const DEFAULT_SEPARATOR: &str = ",";

/// The header in which the Django frontend names the user it acts for,
/// followed by that user's groups, all as URNs. See [`delegation`].
pub(crate) const DELEGATION_HEADER: &str = "On-Behalf-Of";


/// A named identity or group claim. Two principals are the same if their
/// names are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub(crate) struct Principal(String);

impl Principal {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub(crate) fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Principals returned by one resolution. Iterates in name order.
pub(crate) type PrincipalSet = BTreeSet<Principal>;


/// What the container exposes about an in-flight request.
pub(crate) trait ContainerRequest {
    /// Returns the first value of the given header, or `None` if it is not
    /// set (or not representable as string).
    fn header(&self, name: &HeaderName) -> Option<&str>;

    /// Whether the container authenticated the caller with the given role.
    fn is_user_in_role(&self, role: &str) -> bool;
}

/// Credentials presented to the authorizer.
#[derive(Clone, Copy)]
pub(crate) enum Credentials<'a> {
    /// Credentials backed by an HTTP request. The request might be missing,
    /// e.g. if the session outlived it.
    Http(Option<&'a dyn ContainerRequest>),

    /// Anything that is not tied to an HTTP request (internal sessions, ...).
    Other,
}

impl fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(Some(_)) => f.write_str("Http(<request>)"),
            Self::Http(None) => f.write_str("Http(None)"),
            Self::Other => f.write_str("Other"),
        }
    }
}
