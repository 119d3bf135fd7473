//! Legacy v1 registry dialect
//!
//! - `GET /v1/search?q=` lists every repository as `{"results": [{"name": ...}]}`
//! - `GET /v1/repositories/{repo}/tags` maps each tag to an image id

use crate::error::Result;
use crate::registry::{
    Dialect, Endpoint, RegistryClient, RegistryDialect, RepositoryName, Tag, nullable_list,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(alias = "Results", deserialize_with = "nullable_list")]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(alias = "Name")]
    name: String,
}

/// Only the keys matter; values are image ids or richer objects depending on
/// the registry implementation.
type TagMap = Option<HashMap<String, serde_json::Value>>;

#[derive(Debug, Clone)]
pub struct V1Registry {
    client: RegistryClient,
}

impl V1Registry {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    fn search_url(endpoint: &Endpoint) -> String {
        endpoint.url("/v1/search?q=")
    }

    fn tags_url(endpoint: &Endpoint, repository: &str) -> String {
        endpoint.url(&format!("/v1/repositories/{}/tags", repository))
    }
}

#[async_trait]
impl RegistryDialect for V1Registry {
    fn dialect(&self) -> Dialect {
        Dialect::V1
    }

    async fn list_repositories(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryName>> {
        let url = Self::search_url(endpoint);
        let response: SearchResponse = self.client.get_json(&url, Dialect::V1, cancel).await?;

        Ok(response
            .results
            .into_iter()
            .map(|result| result.name)
            .collect())
    }

    async fn list_tags(
        &self,
        endpoint: &Endpoint,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Tag>> {
        let url = Self::tags_url(endpoint, repository);
        let tags: TagMap = self
            .client
            .get_json_with_retry(&url, Dialect::V1, cancel)
            .await?;

        Ok(tags.unwrap_or_default().into_keys().collect())
    }
}
