use anyhow::Result;
use std::fmt::Write;

use crate::cli::OutputFormat;

use super::Report;

pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format(report: &Report, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Text => Ok(Self::text(report)?),
        }
    }

    /// Indented tree of groups and cases, each case followed by its usages.
    fn text(report: &Report) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(
            out,
            "{} tests, {} helpers, {} files",
            report.total_tests, report.helper_count, report.files_analyzed
        )?;

        let mut previous: &[String] = &[];
        for test in &report.tests {
            let shared = previous
                .iter()
                .zip(&test.path)
                .take_while(|(a, b)| a == b)
                .count()
                .min(test.path.len().saturating_sub(1));
            for (level, segment) in test.path.iter().enumerate().skip(shared) {
                let indent = "  ".repeat(level);
                if level + 1 == test.path.len() {
                    writeln!(out, "{indent}{segment} @ {}", test.location)?;
                } else {
                    writeln!(out, "{indent}{segment}")?;
                }
            }
            let indent = "  ".repeat(test.path.len());
            for usage in &test.api_usages {
                writeln!(out, "{indent}- {usage}")?;
            }
            previous = &test.path;
        }

        if !report.failures.is_empty() {
            writeln!(out, "\nunresolved ({}):", report.failures.len())?;
            for failure in &report.failures {
                writeln!(out, "  {}: {}", failure.location, failure.message)?;
            }
        }

        if let Some(traversal) = &report.traversal {
            writeln!(out, "\ncall graph ({} findings):", traversal.findings.len())?;
            for finding in &traversal.findings {
                writeln!(out, "  {} -> {}", finding.root, finding.api_usage)?;
            }
            for warning in &traversal.warnings {
                writeln!(out, "  warning: {warning}")?;
            }
            for failed in &traversal.failed_roots {
                writeln!(out, "  failed: {failed}")?;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use crate::output::TestUsage;

    fn report() -> Report {
        Report {
            files_analyzed: 2,
            helper_count: 1,
            total_tests: 2,
            tests: vec![
                TestUsage {
                    path: vec!["suite".into(), "a".into()],
                    location: Location::new("e2e.go", 4),
                    api_usages: vec!["apps/v1/deployments".into()],
                },
                TestUsage {
                    path: vec!["suite".into(), "b".into()],
                    location: Location::new("e2e.go", 9),
                    api_usages: vec![],
                },
            ],
            ..Report::default()
        }
    }

    #[test]
    fn test_text_tree() {
        let text = OutputFormatter::format(&report(), OutputFormat::Text).unwrap();
        assert_eq!(
            text,
            "2 tests, 1 helpers, 2 files\nsuite\n  a @ e2e.go:4\n    - apps/v1/deployments\n  b @ e2e.go:9\n"
        );
    }

    #[test]
    fn test_json_shape() {
        let json = OutputFormatter::format(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tests"][0]["path"][1], "a");
        assert_eq!(value["tests"][0]["location"]["line"], 4);
        assert!(value.get("failures").is_none());
        assert!(value.get("traversal").is_none());
    }
}
