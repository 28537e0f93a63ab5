//! Building the value the Django frontend puts into the delegation header
//! (`On-Behalf-Of`). This is not the groups header: the delegation header
//! names the user first and is meant for the repository, while the groups
//! header carries plain group names only.
//!
//! User and group names are turned into URNs: `peter@uni.edu` becomes
//! `urn:uni.edu/peter` and a name without `@` like `staff` becomes
//! `urn:staff`. Only the first two `@`-separated parts are used, so
//! `a@b@c` becomes `urn:b/a`.

/// The single entry used for requests without logged-in user.
pub(crate) const ANONYMOUS_URN: &str = "urn:fedora:anonymous";

pub(crate) fn to_urn(name: &str) -> String {
    match name.split_once('@') {
        None => format!("urn:{name}"),
        Some((local, rest)) => {
            let domain = rest.split_once('@').map_or(rest, |(domain, _)| domain);
            format!("urn:{domain}/{local}")
        }
    }
}

/// Returns the list of URNs representing `user` and their `groups`. If there
/// is no user, the anonymous URN is returned and `groups` are ignored.
pub(crate) fn on_behalf_of<I, T>(user: Option<&str>, groups: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    match user {
        None => vec![ANONYMOUS_URN.to_owned()],
        Some(user) => std::iter::once(to_urn(user))
            .chain(groups.into_iter().map(|g| to_urn(g.as_ref())))
            .collect(),
    }
}

/// Joins the output of [`on_behalf_of`] with the given separator.
pub(crate) fn header_value<I, T>(user: Option<&str>, groups: I, separator: &str) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    on_behalf_of(user, groups).join(separator)
}
