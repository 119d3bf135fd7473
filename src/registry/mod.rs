//! Registry module for talking to Docker registries
//!
//! Each supported wire dialect implements [`RegistryDialect`], which reduces a
//! registry to two questions: which repositories exist, and which tags does a
//! repository carry. Everything above this module is dialect-agnostic.

pub mod client;
pub mod reference;
pub mod retry;
pub mod v1;
pub mod v2;

pub use client::{RegistryClient, RegistryClientBuilder};
pub use reference::{Endpoint, ImageReference};
pub use retry::RetryPolicy;
pub use v1::V1Registry;
pub use v2::V2Registry;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type RepositoryName = String;
pub type Tag = String;

/// Listing envelopes may carry `null` for an empty registry, but the key
/// itself has to be there; a 200 body without it is not a listing.
pub(crate) fn nullable_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Registry API dialect spoken by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Legacy search/listing API (`/v1/search`, `/v1/repositories/...`)
    V1,
    /// Distribution API with the `/v2/_catalog` route
    V2,
}

impl Dialect {
    /// Build the adapter for this dialect on top of a shared client
    pub fn adapter(self, client: RegistryClient) -> Arc<dyn RegistryDialect> {
        match self {
            Dialect::V1 => Arc::new(V1Registry::new(client)),
            Dialect::V2 => Arc::new(V2Registry::new(client)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::V1 => write!(f, "v1"),
            Dialect::V2 => write!(f, "v2"),
        }
    }
}

/// Uniform listing capability over one registry wire dialect
#[async_trait]
pub trait RegistryDialect: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// List every repository the endpoint exposes, in one request
    async fn list_repositories(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryName>>;

    /// List the tags of one repository, retrying transport failures
    async fn list_tags(
        &self,
        endpoint: &Endpoint,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Tag>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_matches_dialect() {
        let client = RegistryClient::builder().build().unwrap();
        assert_eq!(Dialect::V1.adapter(client.clone()).dialect(), Dialect::V1);
        assert_eq!(Dialect::V2.adapter(client).dialect(), Dialect::V2);
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::V1.to_string(), "v1");
        let parsed: Dialect = serde_json::from_str("\"v2\"").unwrap();
        assert_eq!(parsed, Dialect::V2);
    }
}
