//! Endpoint addresses and `repository:tag` image references

use crate::error::{RegistryError, Result};
use serde::Serialize;
use std::fmt;
use url::Url;

/// Network address of one registry instance.
///
/// Accepts `host:port` (plain HTTP implied) or a full `http(s)://` base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: String,
    base: String,
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let invalid = |reason: &str| RegistryError::InvalidEndpoint {
            endpoint: address.to_string(),
            reason: reason.to_string(),
        };

        if address.is_empty() {
            return Err(invalid("address is empty"));
        }

        let candidate = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https endpoints are supported"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query strings and fragments are not allowed"));
        }

        Ok(Self {
            address: address.to_string(),
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// The address as the user supplied it
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Absolute URL for a route on this endpoint; `route` starts with `/`
    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.base, route)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// `repository:tag` identity of an image.
///
/// Two references are equal iff their string forms are equal; ordering is the
/// byte-wise ordering of that string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub const SEPARATOR: char = ':';

    pub fn new(repository: &str, tag: &str) -> Self {
        Self(format!("{}{}{}", repository, Self::SEPARATOR, tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn repository(&self) -> &str {
        self.split().0
    }

    pub fn tag(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // tags never contain the separator, so the last one splits
        self.0
            .rsplit_once(Self::SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
