//! Registry Compare Library
//!
//! Enumerates the `repository:tag` inventory of Docker registries speaking the
//! v1 or v2 API and reports which images of a source registry are missing
//! from a target registry.

pub mod cli;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod logging;
pub mod output;
pub mod reconcile;
pub mod registry;

pub use cli::{Comparison, Runner};
pub use config::{CompareConfig, FailurePolicy, OutputFormat};
pub use enumerate::{EnumerationReport, ImageCollection, ImageEnumerator};
pub use error::{RegistryError, Result};
pub use logging::Logger;
pub use output::OutputManager;
pub use reconcile::{MissingSet, missing};
pub use registry::{Dialect, Endpoint, ImageReference, RegistryDialect};
