use std::{borrow::Cow, collections::HashSet};

use hyper::{header::HeaderName, HeaderMap};
use secrecy::{ExposeSecret, SecretString};

use crate::prelude::*;
use super::{ContainerRequest, FEDORA_ADMIN_ROLE};


/// Authentication of callers. Callers are either anonymous or one of the
/// configured trusted services.
#[derive(Debug, confique::Config)]
pub(crate) struct ContainerConfig {
    /// The header in which trusted services send their key.
    #[config(default = "x-groupgate-service-key")]
    pub(crate) key_header: String,

    /// Services that may authenticate with a shared key. Each has a unique
    /// name (used for logging), the key and a list of roles. Only services
    /// with the role "fedoraAdmin" may assert groups on behalf of users.
    /// Keys should be hard to guess and only ever be sent over encrypted
    /// channels. Example:
    ///
    ///    [[container.trusted_services]]
    ///    name = "django"
    ///    key = "bWFuIGlzIHRoZSBtZWFzdXJlIG9mIGFsbCB0aGluZ3M"
    ///    roles = ["fedoraAdmin"]
    #[config(default = [])]
    pub(crate) trusted_services: Vec<TrustedService>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct TrustedService {
    pub(crate) name: String,
    pub(crate) key: SecretString,
    #[serde(default)]
    pub(crate) roles: HashSet<String>,
}

impl ContainerConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        HeaderName::from_bytes(self.key_header.as_bytes())
            .with_context(|| format!("'{}' is not a valid HTTP header name", self.key_header))?;

        let mut names = HashSet::new();
        let mut keys = HashSet::new();
        for service in &self.trusted_services {
            if service.key.expose_secret().is_empty() {
                bail!("key of trusted service '{}' is empty", service.name);
            }
            if !names.insert(service.name.as_str()) {
                bail!("duplicate trusted service name '{}'", service.name);
            }
            if !keys.insert(service.key.expose_secret()) {
                bail!("trusted service '{}' has the same key as another service", service.name);
            }
        }

        Ok(())
    }

    /// Checks for things that deserve a warning but are not fatal.
    pub(crate) fn lint(&self) {
        if !self.trusted_services.iter().any(|s| s.roles.contains(FEDORA_ADMIN_ROLE)) {
            warn!(
                "No trusted service has the role '{FEDORA_ADMIN_ROLE}': \
                    the groups header will never be honored",
            );
        }
    }
}


/// Who is talking to us, as established by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Caller {
    Anonymous,
    Service {
        name: String,
        roles: HashSet<String>,
    },
}

impl Caller {
    /// Authenticates the caller by the service key header, if present.
    pub(crate) fn from_headers(headers: &HeaderMap, config: &ContainerConfig) -> Self {
        let Some(given_key) = headers.get(config.key_header.as_str()) else {
            return Self::Anonymous;
        };

        let service = config.trusted_services.iter()
            .find(|service| given_key == service.key.expose_secret());
        match service {
            Some(service) => Self::Service {
                name: service.name.clone(),
                roles: service.roles.clone(),
            },
            None => {
                debug!("Header '{}' is set but matches no trusted service", config.key_header);
                Self::Anonymous
            }
        }
    }

    pub(crate) fn has_role(&self, role: &str) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Service { roles, .. } => roles.contains(role),
        }
    }

    /// Returns a representation of the caller useful for logging.
    pub(crate) fn debug_log_name(&self) -> Cow<'static, str> {
        match self {
            Self::Anonymous => "anonymous".into(),
            Self::Service { name, .. } => format!("service '{name}'").into(),
        }
    }
}


/// An incoming HTTP request together with the authenticated caller.
pub(crate) struct HttpRequest<'a> {
    headers: &'a HeaderMap,
    caller: &'a Caller,
}

impl<'a> HttpRequest<'a> {
    pub(crate) fn new(headers: &'a HeaderMap, caller: &'a Caller) -> Self {
        Self { headers, caller }
    }
}

impl ContainerRequest for HttpRequest<'_> {
    fn header(&self, name: &HeaderName) -> Option<&str> {
        let value = self.headers.get(name)?;
        std::str::from_utf8(value.as_bytes())
            .map_err(|e| warn!("header '{name}' is set but not valid UTF-8: {e}"))
            .ok()
    }

    fn is_user_in_role(&self, role: &str) -> bool {
        self.caller.has_role(role)
    }
}


#[cfg(test)]
mod tests {
    use hyper::header::HeaderValue;

    use super::*;

    fn config() -> ContainerConfig {
        ContainerConfig {
            key_header: "x-groupgate-service-key".into(),
            trusted_services: vec![
                TrustedService {
                    name: "django".into(),
                    key: "django-key".into(),
                    roles: HashSet::from([FEDORA_ADMIN_ROLE.to_owned()]),
                },
                TrustedService {
                    name: "indexer".into(),
                    key: "indexer-key".into(),
                    roles: HashSet::new(),
                },
            ],
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        pairs.iter()
            .map(|&(k, v)| (HeaderName::from_static(k), HeaderValue::from_static(v)))
            .collect()
    }

    #[test]
    fn caller_without_key_is_anonymous() {
        let caller = Caller::from_headers(&HeaderMap::new(), &config());
        assert_eq!(caller, Caller::Anonymous);
        assert!(!caller.has_role(FEDORA_ADMIN_ROLE));
    }

    #[test]
    fn caller_with_unknown_key_is_anonymous() {
        let caller = Caller::from_headers(
            &headers(&[("x-groupgate-service-key", "wrong")]),
            &config(),
        );
        assert_eq!(caller, Caller::Anonymous);
    }

    #[test]
    fn caller_with_known_key() {
        let config = config();
        let django = Caller::from_headers(
            &headers(&[("x-groupgate-service-key", "django-key")]),
            &config,
        );
        assert!(django.has_role(FEDORA_ADMIN_ROLE));
        assert_eq!(django.debug_log_name(), "service 'django'");

        let indexer = Caller::from_headers(
            &headers(&[("x-groupgate-service-key", "indexer-key")]),
            &config,
        );
        assert!(matches!(&indexer, Caller::Service { name, .. } if name == "indexer"));
        assert!(!indexer.has_role(FEDORA_ADMIN_ROLE));
    }

    #[test]
    fn request_header_lookup() {
        let caller = Caller::Anonymous;
        let mut map = headers(&[("x-groups", "a,b")]);
        map.insert("x-binary", HeaderValue::from_bytes(b"\xff\xfe").unwrap());
        map.insert("x-utf8", HeaderValue::from_bytes("grüppe".as_bytes()).unwrap());
        let request = HttpRequest::new(&map, &caller);

        assert_eq!(request.header(&HeaderName::from_static("x-groups")), Some("a,b"));
        assert_eq!(request.header(&HeaderName::from_static("x-missing")), None);
        assert_eq!(request.header(&HeaderName::from_static("x-binary")), None);
        assert_eq!(request.header(&HeaderName::from_static("x-utf8")), Some("grüppe"));
    }

    #[test]
    fn validate() {
        assert!(config().validate().is_ok());

        let mut bad_header = config();
        bad_header.key_header = "no spaces allowed".into();
        assert!(bad_header.validate().is_err());

        let mut duplicate_name = config();
        duplicate_name.trusted_services[1].name = "django".into();
        assert!(duplicate_name.validate().is_err());

        let mut duplicate_key = config();
        duplicate_key.trusted_services[1].key = "django-key".into();
        assert!(duplicate_key.validate().is_err());

        let mut empty_key = config();
        empty_key.trusted_services[0].key = "".into();
        assert!(empty_key.validate().is_err());
    }
}
