//! fairgate-crosscheck — compare documented thresholds with configuration.
//!
//! An optional pass, independent of the engine: it reads Markdown and
//! YAML documents, pulls out every quoted parameter value, and reports
//! where the prose has drifted from the loaded `Parameters`.

pub mod report;
pub mod scan;

use anyhow::Result;
use std::path::PathBuf;

use fairgate_core::Parameters;

pub use report::{CrosscheckReport, Finding, FindingStatus, Verdict, format_report};
pub use scan::{Mention, PARAMETER_NAMES, Scanner};

/// Cross-check every document under `paths` against `params`.
///
/// Fails on any mismatch; with `strict`, also fails when a parameter is
/// never mentioned.
pub fn crosscheck(params: &Parameters, paths: &[PathBuf], strict: bool) -> Result<CrosscheckReport> {
    let documents = scan::collect_documents(paths)?;
    let scanner = Scanner::new()?;

    let mut mentions = Vec::new();
    for doc in &documents {
        mentions.extend(scanner.scan_file(doc)?);
    }
    tracing::info!(
        documents = documents.len(),
        mentions = mentions.len(),
        "scanned parameter documents"
    );

    Ok(evaluate(params, documents.len(), mentions, strict))
}

/// Judge a set of mentions against the configured values.
pub fn evaluate(
    params: &Parameters,
    documents_scanned: usize,
    mentions: Vec<Mention>,
    strict: bool,
) -> CrosscheckReport {
    let configured = params.named_values();

    let findings: Vec<Finding> = mentions
        .into_iter()
        .filter_map(|m| {
            let (_, value) = configured.iter().find(|(name, _)| *name == m.key)?;
            let status = if (m.value - value).abs() <= report::TOLERANCE {
                FindingStatus::Match
            } else {
                tracing::warn!(
                    key = %m.key,
                    file = %m.file.display(),
                    line = m.line,
                    documented = m.value,
                    configured = value,
                    "documented parameter disagrees with configuration"
                );
                FindingStatus::Mismatch
            };
            Some(Finding {
                file: m.file,
                line: m.line,
                key: m.key,
                documented: m.value,
                configured: *value,
                status,
            })
        })
        .collect();

    let missing: Vec<String> = PARAMETER_NAMES
        .iter()
        .filter(|name| !findings.iter().any(|f| f.key == **name))
        .map(|name| name.to_string())
        .collect();

    let any_mismatch = findings.iter().any(|f| f.status == FindingStatus::Mismatch);
    let verdict = if any_mismatch || (strict && !missing.is_empty()) {
        Verdict::Fail
    } else {
        Verdict::Pass
    };

    CrosscheckReport {
        documents_scanned,
        findings,
        missing,
        strict,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Parameters {
        Parameters::new(0.50, 0.60, 0.65, 3, 1).unwrap()
    }

    fn write_docs(dir: &std::path::Path) {
        std::fs::write(
            dir.join("README.md"),
            "# Fairness gate\n\n| Parameter | Value |\n|---|---|\n\
             | `T_enter_major` | 0.50 |\n| `T_enter_standard` | 0.60 |\n| `T_exit` | 0.65 |\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("params.yaml"),
            "consecutive_required_standard: 3\ncooldown_snapshots_after_exit: 1\n",
        )
        .unwrap();
    }

    #[test]
    fn consistent_documents_pass_strict() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());

        let report = crosscheck(&params(), &[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(report.documents_scanned, 2);
        assert_eq!(report.findings.len(), 5);
        assert!(report.missing.is_empty());
        assert!(report.passed());
    }

    #[test]
    fn drifted_value_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_docs(dir.path());
        std::fs::write(dir.path().join("notes.md"), "We raised `T_exit` = 0.70 last quarter.\n")
            .unwrap();

        let report = crosscheck(&params(), &[dir.path().to_path_buf()], false).unwrap();
        assert_eq!(report.verdict, Verdict::Fail);
        let bad: Vec<_> = report.mismatches().collect();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].key, "T_exit");
        assert_eq!(bad[0].documented, 0.70);
        assert_eq!(bad[0].line, 1);

        let text = format_report(&report);
        assert!(text.contains("MISMATCHES"));
        assert!(text.contains("notes.md:1"));
    }

    #[test]
    fn missing_parameters_fail_only_in_strict_mode() {
        let mentions = vec![Mention {
            file: PathBuf::from("a.md"),
            line: 1,
            key: "T_exit".to_string(),
            value: 0.65,
        }];

        let lenient = evaluate(&params(), 1, mentions.clone(), false);
        assert!(lenient.passed());
        assert_eq!(lenient.missing.len(), 4);

        let strict = evaluate(&params(), 1, mentions, true);
        assert_eq!(strict.verdict, Verdict::Fail);
        assert!(format_report(&strict).contains("NOT DOCUMENTED"));
    }

    #[test]
    fn report_serializes_verdict() {
        let report = evaluate(&params(), 0, Vec::new(), false);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["verdict"], "PASS");
        assert_eq!(json["missing"].as_array().unwrap().len(), 5);
    }
}
