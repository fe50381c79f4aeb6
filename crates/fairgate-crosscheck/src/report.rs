//! Cross-check report and its human-readable rendering.

use serde::Serialize;
use std::path::PathBuf;

/// Documented values are compared with this absolute tolerance.
pub const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Match,
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub file: PathBuf,
    pub line: usize,
    pub key: String,
    pub documented: f64,
    pub configured: f64,
    pub status: FindingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrosscheckReport {
    pub documents_scanned: usize,
    pub findings: Vec<Finding>,
    /// Parameters never mentioned in any scanned document.
    pub missing: Vec<String>,
    pub strict: bool,
    pub verdict: Verdict,
}

impl CrosscheckReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.status == FindingStatus::Mismatch)
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

pub fn format_report(report: &CrosscheckReport) -> String {
    let mut out = String::new();

    let matched = report
        .findings
        .iter()
        .filter(|f| f.status == FindingStatus::Match)
        .count();
    let mismatched = report.findings.len() - matched;

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  fairgate Parameter Cross-Check          ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Documents: {:<29}║\n", report.documents_scanned));
    out.push_str(&format!(
        "║  Mode:      {:<29}║\n",
        if report.strict { "strict" } else { "lenient" }
    ));
    out.push_str(&format!("║  Verdict:   {:<29}║\n", report.verdict.label()));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    out.push_str(&format!("Mentions ({} total):\n", report.findings.len()));
    out.push_str(&format!("  ✅ {matched} match configuration\n"));
    out.push_str(&format!("  ❌ {mismatched} disagree\n\n"));

    if mismatched > 0 {
        out.push_str("❌ MISMATCHES:\n\n");
        for (i, f) in report.mismatches().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, f.key));
            out.push_str(&format!("     At:         {}:{}\n", f.file.display(), f.line));
            out.push_str(&format!("     Documented: {}\n", f.documented));
            out.push_str(&format!("     Configured: {}\n", f.configured));
            out.push('\n');
        }
    }

    if !report.missing.is_empty() {
        let marker = if report.strict { "❌" } else { "⚠️ " };
        out.push_str(&format!("{marker} NOT DOCUMENTED:\n\n"));
        for key in &report.missing {
            out.push_str(&format!("  • {key}\n"));
        }
        out.push('\n');
    }

    out
}
