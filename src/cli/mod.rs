//! Command line interface module
//!
//! Argument parsing and the runner that drives one comparison from endpoints
//! to a [`Comparison`].

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::{Comparison, Runner};

use crate::error::Result;

pub const EXIT_SUCCESS: u8 = 0;
/// Exit status when the comparison could not be completed
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when a best-effort comparison skipped part of an inventory
pub const EXIT_PARTIAL: u8 = 3;

/// Process exit status for the outcome of a run. Usage errors never get
/// here; clap exits with 2 on its own.
pub fn exit_status(outcome: &Result<Comparison>) -> u8 {
    match outcome {
        Ok(comparison) if comparison.is_complete() => EXIT_SUCCESS,
        Ok(_) => EXIT_PARTIAL,
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::{EnumerationFailure, EnumerationReport, FailureScope, ImageCollection};
    use crate::error::{ErrorKind, RegistryError};
    use crate::reconcile::missing;
    use crate::registry::{Dialect, Endpoint, ImageReference};

    fn report(address: &str, images: &[(&str, &str)]) -> EnumerationReport {
        EnumerationReport {
            endpoint: Endpoint::parse(address).unwrap(),
            dialect: Dialect::V2,
            repositories: images.len(),
            images: images
                .iter()
                .map(|(repo, tag)| ImageReference::new(repo, tag))
                .collect::<ImageCollection>(),
            failures: Vec::new(),
        }
    }

    fn comparison(source: EnumerationReport, target: EnumerationReport) -> Comparison {
        let missing = missing(&source.images, &target.images);
        Comparison {
            source,
            target,
            missing,
        }
    }

    #[test]
    fn test_complete_comparison_exits_zero() {
        let outcome = Ok(comparison(
            report("old:5000", &[("x", "1"), ("x", "2")]),
            report("new:5000", &[("x", "1")]),
        ));
        // missing images alone are not a failure
        assert_eq!(exit_status(&outcome), EXIT_SUCCESS);
    }

    #[test]
    fn test_partial_comparison_exits_three() {
        let mut target = report("new:5000", &[]);
        target.failures.push(EnumerationFailure {
            scope: FailureScope::RepositoryListing,
            kind: ErrorKind::Server,
            message: "Unexpected HTTP 500".to_string(),
        });
        let outcome = Ok(comparison(report("old:5000", &[("x", "1")]), target));
        assert_eq!(exit_status(&outcome), EXIT_PARTIAL);
    }

    #[test]
    fn test_error_exits_one() {
        let outcome: Result<Comparison> = Err(RegistryError::Cancelled);
        assert_eq!(exit_status(&outcome), EXIT_FAILURE);
    }
}
