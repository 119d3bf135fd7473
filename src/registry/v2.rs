//! Registry HTTP API v2 dialect
//!
//! Both listing routes are requested with `n=99999` so the registry returns
//! everything in a single page; `Link` headers are not followed.

use crate::error::Result;
use crate::registry::{
    Dialect, Endpoint, RegistryClient, RegistryDialect, RepositoryName, Tag, nullable_list,
};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const PAGE_SIZE: u32 = 99999;

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(alias = "Repositories", deserialize_with = "nullable_list")]
    repositories: Vec<RepositoryName>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default, alias = "Tags")]
    tags: Option<Vec<Tag>>,
}

#[derive(Debug, Clone)]
pub struct V2Registry {
    client: RegistryClient,
}

impl V2Registry {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    fn catalog_url(endpoint: &Endpoint) -> String {
        endpoint.url(&format!("/v2/_catalog?n={}", PAGE_SIZE))
    }

    fn tags_url(endpoint: &Endpoint, repository: &str) -> String {
        endpoint.url(&format!("/v2/{}/tags/list?n={}", repository, PAGE_SIZE))
    }
}

#[async_trait]
impl RegistryDialect for V2Registry {
    fn dialect(&self) -> Dialect {
        Dialect::V2
    }

    async fn list_repositories(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryName>> {
        let url = Self::catalog_url(endpoint);
        let catalog: CatalogResponse = self.client.get_json(&url, Dialect::V2, cancel).await?;
        Ok(catalog.repositories)
    }

    async fn list_tags(
        &self,
        endpoint: &Endpoint,
        repository: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Tag>> {
        let url = Self::tags_url(endpoint, repository);
        let response: TagsResponse = self
            .client
            .get_json_with_retry(&url, Dialect::V2, cancel)
            .await?;
        Ok(response.tags.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        let endpoint = Endpoint::parse("new-registry:5000").unwrap();
        assert_eq!(
            V2Registry::catalog_url(&endpoint),
            "http://new-registry:5000/v2/_catalog?n=99999"
        );
        assert_eq!(
            V2Registry::tags_url(&endpoint, "team/api"),
            "http://new-registry:5000/v2/team/api/tags/list?n=99999"
        );
    }

    #[test]
    fn test_decodes_catalog_and_tags() {
        let catalog: CatalogResponse =
            serde_json::from_str(r#"{"repositories": ["a", "team/b"]}"#).unwrap();
        assert_eq!(catalog.repositories, vec!["a", "team/b"]);

        let tags: TagsResponse =
            serde_json::from_str(r#"{"name": "a", "Tags": ["1", "2"]}"#).unwrap();
        assert_eq!(tags.tags.unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_untagged_repository_has_null_tags() {
        let tags: TagsResponse = serde_json::from_str(r#"{"name": "a", "tags": null}"#).unwrap();
        assert!(tags.tags.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        assert!(serde_json::from_str::<TagsResponse>(r#"{"tags": "latest"}"#).is_err());
        assert!(serde_json::from_str::<CatalogResponse>(r#""catalog""#).is_err());
    }

    #[test]
    fn test_catalog_requires_the_repositories_key() {
        let empty: CatalogResponse = serde_json::from_str(r#"{"repositories": null}"#).unwrap();
        assert!(empty.repositories.is_empty());

        assert!(serde_json::from_str::<CatalogResponse>("{}").is_err());
        assert!(
            serde_json::from_str::<CatalogResponse>(r#"{"errors": [{"code": "UNAVAILABLE"}]}"#)
                .is_err()
        );
    }
}
