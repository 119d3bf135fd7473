//! Runner driving one comparison from two endpoints to a [`Comparison`]

use crate::config::CompareConfig;
use crate::enumerate::{EnumerationFailure, EnumerationReport, ImageEnumerator};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::reconcile::{self, MissingSet};
use crate::registry::{Endpoint, RegistryClient};
use futures::future::try_join;
use tokio_util::sync::CancellationToken;

/// Both inventories and the images the target lacks
#[derive(Debug, Clone)]
pub struct Comparison {
    pub source: EnumerationReport,
    pub target: EnumerationReport,
    pub missing: MissingSet,
}

impl Comparison {
    pub fn is_complete(&self) -> bool {
        self.source.is_complete() && self.target.is_complete()
    }

    pub fn failure_count(&self) -> usize {
        self.source.failures.len() + self.target.failures.len()
    }

    /// Every recorded failure with the report it belongs to
    pub fn failures(&self) -> impl Iterator<Item = (&EnumerationReport, &EnumerationFailure)> {
        [&self.source, &self.target]
            .into_iter()
            .flat_map(|report| report.failures.iter().map(move |failure| (report, failure)))
    }
}

pub struct Runner {
    source: Endpoint,
    target: Endpoint,
    config: CompareConfig,
    output: Logger,
}

impl Runner {
    pub fn new(source: Endpoint, target: Endpoint, config: CompareConfig, output: Logger) -> Self {
        Self {
            source,
            target,
            config,
            output,
        }
    }

    /// Run the comparison, honouring the configured deadline and `cancel`
    pub async fn run(&self, cancel: &CancellationToken) -> Result<Comparison> {
        self.config.validate()?;

        let scope = cancel.child_token();
        let result = match self.config.deadline() {
            Some(limit) => match tokio::time::timeout(limit, self.compare(&scope)).await {
                Ok(result) => result,
                Err(_) => {
                    scope.cancel();
                    return Err(RegistryError::DeadlineExceeded { limit });
                }
            },
            None => self.compare(&scope).await,
        };

        if let Ok(comparison) = &result {
            self.output.success(&format!(
                "{} missing image(s) found in {}",
                comparison.missing.len(),
                self.output.format_duration(self.output.elapsed())
            ));
        }
        result
    }

    async fn compare(&self, cancel: &CancellationToken) -> Result<Comparison> {
        let client = RegistryClient::builder()
            .with_timeout(self.config.request_timeout())
            .with_retry(self.config.retry.clone())
            .build()?;

        let source_adapter = self.config.source_dialect.adapter(client.clone());
        let target_adapter = self.config.target_dialect.adapter(client);
        let enumerator = ImageEnumerator::new(self.config.concurrency, self.config.failure_policy);

        self.output.section("Registry comparison");
        self.output.info(&format!(
            "Source: {} ({})",
            self.source, self.config.source_dialect
        ));
        self.output.info(&format!(
            "Target: {} ({})",
            self.target, self.config.target_dialect
        ));
        self.output.detail(&format!(
            "Concurrency {}, {} attempt(s) per tag listing, {}s request timeout",
            enumerator.concurrency(),
            self.config.retry.max_attempts,
            self.config.timeout
        ));
        self.output.step("Enumerating both registries");

        // the two inventories share nothing, so they are fetched side by side
        let (source, target) = try_join(
            enumerator.enumerate(&self.source, source_adapter, cancel),
            enumerator.enumerate(&self.target, target_adapter, cancel),
        )
        .await?;

        for report in [&source, &target] {
            self.output.verbose(&format!(
                "{}: {} image(s) in {} repositories",
                report.endpoint,
                report.images.len(),
                report.repositories
            ));
            for failure in &report.failures {
                self.output
                    .warning(&format!("{} {}: {}", report.endpoint, failure.scope, failure.message));
            }
        }

        let missing = reconcile::missing(&source.images, &target.images);
        Ok(Comparison {
            source,
            target,
            missing,
        })
    }
}
