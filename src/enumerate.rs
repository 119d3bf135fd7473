//! Concurrent image enumeration
//!
//! [`ImageEnumerator`] turns one registry endpoint into a flat
//! [`ImageCollection`]: the repository list is fetched once, then a bounded
//! pool of tasks expands each repository into its tags. Tasks report through
//! a channel drained by a single collector, which is the only place their
//! results meet.

use crate::config::FailurePolicy;
use crate::error::{ErrorKind, RegistryError, Result};
use crate::registry::{Dialect, Endpoint, ImageReference, RegistryDialect, RepositoryName, Tag};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Every `repository:tag` found on one endpoint, in no particular order and
/// possibly with duplicates. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCollection(Vec<ImageReference>);

impl ImageCollection {
    pub fn distinct(&self) -> HashSet<&ImageReference> {
        self.0.iter().collect()
    }
}

impl Deref for ImageCollection {
    type Target = [ImageReference];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<ImageReference>> for ImageCollection {
    fn from(images: Vec<ImageReference>) -> Self {
        Self(images)
    }
}

impl FromIterator<ImageReference> for ImageCollection {
    fn from_iter<I: IntoIterator<Item = ImageReference>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a ImageReference;
    type IntoIter = std::slice::Iter<'a, ImageReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which part of an enumeration failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    RepositoryListing,
    Repository(RepositoryName),
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureScope::RepositoryListing => write!(f, "repository listing"),
            FailureScope::Repository(name) => write!(f, "repository {}", name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumerationFailure {
    pub scope: FailureScope,
    pub kind: ErrorKind,
    pub message: String,
}

impl EnumerationFailure {
    fn new(scope: FailureScope, error: &RegistryError) -> Self {
        Self {
            scope,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Result of enumerating one endpoint
#[derive(Debug, Clone)]
pub struct EnumerationReport {
    pub endpoint: Endpoint,
    pub dialect: Dialect,
    /// Number of repositories the endpoint listed
    pub repositories: usize,
    pub images: ImageCollection,
    pub failures: Vec<EnumerationFailure>,
}

impl EnumerationReport {
    /// True when nothing was skipped because of an error
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Contribution {
    Tags {
        repository: RepositoryName,
        tags: Vec<Tag>,
    },
    Failed {
        repository: RepositoryName,
        error: RegistryError,
    },
}

#[derive(Default)]
struct Collected {
    images: Vec<ImageReference>,
    failures: Vec<(RepositoryName, RegistryError)>,
}

#[derive(Debug, Clone)]
pub struct ImageEnumerator {
    concurrency: usize,
    policy: FailurePolicy,
}

impl ImageEnumerator {
    pub fn new(concurrency: usize, policy: FailurePolicy) -> Self {
        Self {
            concurrency: concurrency.max(1),
            policy,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Enumerate every image on `endpoint`.
    ///
    /// Returns only once every repository task has finished and the collector
    /// has drained the channel.
    pub async fn enumerate(
        &self,
        endpoint: &Endpoint,
        adapter: Arc<dyn RegistryDialect>,
        cancel: &CancellationToken,
    ) -> Result<EnumerationReport> {
        let dialect = adapter.dialect();
        let mut failures = Vec::new();

        let repositories = match adapter.list_repositories(endpoint, cancel).await {
            Ok(repositories) => repositories,
            Err(RegistryError::Cancelled) => return Err(RegistryError::Cancelled),
            Err(error) if self.policy == FailurePolicy::FailFast => return Err(error),
            Err(error) => {
                tracing::warn!(%endpoint, %error, "repository listing failed, continuing with none");
                failures.push(EnumerationFailure::new(FailureScope::RepositoryListing, &error));
                Vec::new()
            }
        };
        tracing::debug!(%endpoint, %dialect, count = repositories.len(), "listed repositories");

        let tasks_cancel = cancel.child_token();
        let (tx, rx) = mpsc::unbounded_channel();
        let collector = tokio::spawn(collect(rx, self.policy, tasks_cancel.clone()));

        let pool = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for repository in &repositories {
            let permit = tokio::select! {
                biased;
                _ = tasks_cancel.cancelled() => break,
                permit = Arc::clone(&pool).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let adapter = Arc::clone(&adapter);
            let endpoint = endpoint.clone();
            let repository = repository.clone();
            let tx = tx.clone();
            let cancel = tasks_cancel.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let contribution = match adapter.list_tags(&endpoint, &repository, &cancel).await {
                    Ok(tags) => Contribution::Tags { repository, tags },
                    Err(RegistryError::Cancelled) => return,
                    Err(error) => Contribution::Failed { repository, error },
                };
                // the collector outlives every sender
                let _ = tx.send(contribution);
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }

        let collected = match collector.await {
            Ok(collected) => collected,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => return Err(RegistryError::Cancelled),
        };

        if cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }

        let mut repository_failures = collected.failures.into_iter();
        if self.policy == FailurePolicy::FailFast {
            if let Some((_, error)) = repository_failures.next() {
                return Err(error);
            }
        }
        failures.extend(repository_failures.map(|(repository, error)| {
            EnumerationFailure::new(FailureScope::Repository(repository), &error)
        }));

        Ok(EnumerationReport {
            endpoint: endpoint.clone(),
            dialect,
            repositories: repositories.len(),
            images: ImageCollection::from(collected.images),
            failures,
        })
    }
}

/// Sole consumer of task output. Under fail-fast it stops the remaining tasks
/// as soon as one repository fails.
async fn collect(
    mut rx: mpsc::UnboundedReceiver<Contribution>,
    policy: FailurePolicy,
    tasks_cancel: CancellationToken,
) -> Collected {
    let mut collected = Collected::default();

    while let Some(contribution) = rx.recv().await {
        match contribution {
            Contribution::Tags { repository, tags } => {
                tracing::trace!(%repository, count = tags.len(), "listed tags");
                collected
                    .images
                    .extend(tags.iter().map(|tag| ImageReference::new(&repository, tag)));
            }
            Contribution::Failed { repository, error } => {
                tracing::warn!(%repository, %error, "tag listing failed");
                if policy == FailurePolicy::FailFast {
                    tasks_cancel.cancel();
                }
                collected.failures.push((repository, error));
            }
        }
    }

    collected
}
