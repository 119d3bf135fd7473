//! Result rendering
//!
//! Text output prints a header on stderr, then one
//! `repo:tag` line per missing image on stdout. Failures, if any, follow on
//! stderr. JSON output puts a single document on stdout.

use crate::cli::Comparison;
use crate::config::OutputFormat;
use crate::enumerate::{EnumerationFailure, EnumerationReport};
use crate::reconcile::MissingSet;
use crate::registry::Dialect;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    complete: bool,
    source: JsonInventory<'a>,
    target: JsonInventory<'a>,
    missing: &'a MissingSet,
}

#[derive(Debug, Serialize)]
struct JsonInventory<'a> {
    endpoint: &'a str,
    dialect: Dialect,
    repositories: usize,
    images: usize,
    failures: &'a [EnumerationFailure],
}

impl<'a> From<&'a EnumerationReport> for JsonInventory<'a> {
    fn from(report: &'a EnumerationReport) -> Self {
        Self {
            endpoint: report.endpoint.address(),
            dialect: report.dialect,
            repositories: report.repositories,
            images: report.images.len(),
            failures: &report.failures,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OutputManager {
    format: OutputFormat,
}

impl OutputManager {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render<O: Write, E: Write>(
        &self,
        comparison: &Comparison,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => Self::render_text(comparison, out, err),
            OutputFormat::Json => Self::render_json(comparison, out),
        }
    }

    fn render_text<O: Write, E: Write>(
        comparison: &Comparison,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<()> {
        writeln!(
            err,
            "Images in {} that are missing in {}:",
            comparison.source.endpoint, comparison.target.endpoint
        )?;
        err.flush()?;

        for image in &comparison.missing {
            writeln!(out, "{}", image)?;
        }
        out.flush()?;

        if !comparison.is_complete() {
            writeln!(
                err,
                "Comparison is incomplete, {} listing failure(s):",
                comparison.failure_count()
            )?;
            for (report, failure) in comparison.failures() {
                writeln!(
                    err,
                    "  {} {}: [{}] {}",
                    report.endpoint, failure.scope, failure.kind, failure.message
                )?;
            }
        }

        Ok(())
    }

    fn render_json<O: Write>(comparison: &Comparison, out: &mut O) -> io::Result<()> {
        let report = JsonReport {
            complete: comparison.is_complete(),
            source: JsonInventory::from(&comparison.source),
            target: JsonInventory::from(&comparison.target),
            missing: &comparison.missing,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::{FailureScope, ImageCollection};
    use crate::error::ErrorKind;
    use crate::reconcile::missing;
    use crate::registry::{Endpoint, ImageReference};

    fn report(address: &str, dialect: Dialect, images: &[(&str, &str)]) -> EnumerationReport {
        EnumerationReport {
            endpoint: Endpoint::parse(address).unwrap(),
            dialect,
            repositories: images.len(),
            images: images
                .iter()
                .map(|(r, t)| ImageReference::new(r, t))
                .collect::<ImageCollection>(),
            failures: Vec::new(),
        }
    }

    fn comparison() -> Comparison {
        let source = report("old:5000", Dialect::V1, &[("x", "1"), ("x", "2"), ("y", "1")]);
        let target = report("new:5000", Dialect::V2, &[("x", "1")]);
        let missing = missing(&source.images, &target.images);
        Comparison {
            source,
            target,
            missing,
        }
    }

    #[test]
    fn test_text_output_splits_streams() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        OutputManager::new(OutputFormat::Text)
            .render(&comparison(), &mut out, &mut err)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "x:2\ny:1\n");
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Images in old:5000 that are missing in new:5000:\n"
        );
    }

    #[test]
    fn test_text_output_reports_failures() {
        let mut comparison = comparison();
        comparison.target.failures.push(EnumerationFailure {
            scope: FailureScope::RepositoryListing,
            kind: ErrorKind::Transport,
            message: "Request to http://new:5000/v2/_catalog?n=99999 timed out".to_string(),
        });

        let mut out = Vec::new();
        let mut err = Vec::new();
        OutputManager::new(OutputFormat::Text)
            .render(&comparison, &mut out, &mut err)
            .unwrap();

        let err = String::from_utf8(err).unwrap();
        assert!(err.contains("incomplete, 1 listing failure(s)"));
        assert!(err.contains("new:5000 repository listing: [transport]"));
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        OutputManager::new(OutputFormat::Json)
            .render(&comparison(), &mut out, &mut err)
            .unwrap();

        assert!(err.is_empty());
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["complete"], true);
        assert_eq!(json["source"]["endpoint"], "old:5000");
        assert_eq!(json["source"]["dialect"], "v1");
        assert_eq!(json["source"]["images"], 3);
        assert_eq!(json["target"]["dialect"], "v2");
        assert_eq!(json["missing"], serde_json::json!(["x:2", "y:1"]));
    }
}
