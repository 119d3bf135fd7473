// Shared HTTP plumbing for the dialect adapters: one reqwest client with a
// per-request timeout, cancellable JSON fetches, and failure classification.

use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::registry::Dialect;
use crate::registry::retry::RetryPolicy;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct RegistryClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: String,
}

impl RegistryClientBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            user_agent: format!("registry-compare/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        self.retry.validate()?;

        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()
            .map_err(|e| RegistryError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(RegistryClient {
            client,
            retry: self.retry,
        })
    }
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    retry: RetryPolicy,
}

impl RegistryClient {
    pub fn builder() -> RegistryClientBuilder {
        RegistryClientBuilder::new()
    }

    /// GET `url` once and decode the JSON body.
    ///
    /// Non-success statuses are classified against `dialect` so that a route
    /// missing on the registry reads as a dialect mismatch.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        dialect: Dialect,
        cancel: &CancellationToken,
    ) -> Result<T> {
        tracing::trace!(url, %dialect, "GET");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
            response = self.client.get(url).send() => {
                response.map_err(|e| NetworkErrorHandler::handle_network_error(&e, url))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(HttpErrorHandler::handle_status(status, url, dialect));
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
            body = response.bytes() => {
                body.map_err(|e| NetworkErrorHandler::handle_network_error(&e, url))?
            }
        };

        serde_json::from_slice(&body).map_err(|e| RegistryError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// [`get_json`](Self::get_json) under the client's retry policy
    pub async fn get_json_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        dialect: Dialect,
        cancel: &CancellationToken,
    ) -> Result<T> {
        self.retry
            .run(url, cancel, move || self.get_json(url, dialect, cancel))
            .await
    }
}
