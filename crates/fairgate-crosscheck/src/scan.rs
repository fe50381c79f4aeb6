//! Document scanning: find parameter values quoted in Markdown and YAML.

use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Parameter names recognized in documents.
pub const PARAMETER_NAMES: [&str; 5] = [
    "T_enter_major",
    "T_enter_standard",
    "T_exit",
    "consecutive_required_standard",
    "cooldown_snapshots_after_exit",
];

const DOC_EXTENSIONS: [&str; 4] = ["md", "markdown", "yaml", "yml"];

/// A parameter value as written in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub file: PathBuf,
    pub line: usize,
    pub key: String,
    pub value: f64,
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DOC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Expand files and directories into the list of documents to scan.
///
/// Files named explicitly are kept whatever their extension; directories
/// are walked for Markdown and YAML files.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut docs = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && is_document(entry.path()) {
                    docs.push(entry.into_path());
                }
            }
        } else if path.exists() {
            docs.push(path.clone());
        } else {
            tracing::warn!(path = %path.display(), "cross-check input does not exist");
        }
    }
    Ok(docs)
}

/// Compiled patterns for the supported mention forms.
pub struct Scanner {
    assignment: Regex,
    table_row: Regex,
}

impl Scanner {
    pub fn new() -> Result<Self> {
        let keys = PARAMETER_NAMES.join("|");
        let number = r#"["'`]?(-?\d+(?:\.\d+)?)["'`]?"#;
        // `KEY: 0.5`, `KEY = 0.5`, `` `KEY` = 0.5 ``, `"KEY": "0.5"`
        let assignment = Regex::new(&format!(
            r#"(?:^|[^\w])["'`]?\b({keys})\b["'`]?\s*[:=]\s*{number}"#
        ))?;
        // `| KEY | 0.5 |`
        let table_row = Regex::new(&format!(
            r"\|\s*`?\b({keys})\b`?\s*\|\s*{number}\s*\|"
        ))?;
        Ok(Self {
            assignment,
            table_row,
        })
    }

    /// Every mention in `content`, tagged with `file` and 1-based lines.
    pub fn scan_text(&self, file: &Path, content: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            for re in [&self.table_row, &self.assignment] {
                for caps in re.captures_iter(line) {
                    if let Ok(value) = caps[2].parse::<f64>() {
                        mentions.push(Mention {
                            file: file.to_path_buf(),
                            line: idx + 1,
                            key: caps[1].to_string(),
                            value,
                        });
                    }
                }
            }
        }
        mentions.dedup_by(|a, b| a.line == b.line && a.key == b.key && a.value == b.value);
        mentions
    }

    pub fn scan_file(&self, file: &Path) -> Result<Vec<Mention>> {
        let content = std::fs::read_to_string(file)?;
        Ok(self.scan_text(file, &content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> Vec<(String, f64)> {
        Scanner::new()
            .unwrap()
            .scan_text(Path::new("doc.md"), content)
            .into_iter()
            .map(|m| (m.key, m.value))
            .collect()
    }

    #[test]
    fn yaml_and_assignment_forms() {
        let found = scan(
            "hysteresis:\n  T_enter_major: 0.50\n  T_exit: \"0.65\"\nconsecutive_required_standard = 3\n",
        );
        assert_eq!(
            found,
            vec![
                ("T_enter_major".to_string(), 0.50),
                ("T_exit".to_string(), 0.65),
                ("consecutive_required_standard".to_string(), 3.0),
            ]
        );
    }

    #[test]
    fn markdown_inline_code_and_tables() {
        let found = scan(
            "The exit threshold `T_exit` = 0.65 sits above entry.\n\
             | Parameter | Value |\n\
             |---|---|\n\
             | `T_enter_standard` | 0.60 |\n",
        );
        assert_eq!(
            found,
            vec![
                ("T_exit".to_string(), 0.65),
                ("T_enter_standard".to_string(), 0.60),
            ]
        );
    }

    #[test]
    fn prose_without_values_is_ignored() {
        assert!(scan("T_exit must be above T_enter_standard.\n").is_empty());
        assert!(scan("MY_T_exit: 0.9\n").is_empty());
    }

    #[test]
    fn line_numbers_are_one_based() {
        let mentions = Scanner::new()
            .unwrap()
            .scan_text(Path::new("p.yaml"), "# params\n\nT_enter_major: 0.4\n");
        assert_eq!(mentions[0].line, 3);
    }

    #[test]
    fn collect_walks_directories_for_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "").unwrap();
        std::fs::write(dir.path().join("docs/nested/b.yml"), "").unwrap();
        std::fs::write(dir.path().join("docs/c.txt"), "").unwrap();
        let explicit = dir.path().join("docs/c.txt");

        let docs = collect_documents(&[dir.path().join("docs")]).unwrap();
        assert_eq!(docs.len(), 2);

        let docs = collect_documents(&[explicit.clone()]).unwrap();
        assert_eq!(docs, vec![explicit]);
    }
}
