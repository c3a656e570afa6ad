// ABOUTME: Dependency manifest parsing (requirements.txt format).
// ABOUTME: Separates package constraints from installer options and drops comments.

use std::path::Path;

use super::error::ProvisionError;

/// Parsed dependency manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest {
    /// One package constraint per entry, e.g. `requests==2.31.0`.
    pub requirements: Vec<String>,
    /// Installer options such as `--index-url ...` or `-r other.txt`.
    pub options: Vec<String>,
}

impl DependencyManifest {
    pub fn parse(content: &str) -> Self {
        let mut manifest = Self::default();

        for line in content.lines() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                manifest.options.push(line.to_string());
            } else {
                manifest.requirements.push(line.to_string());
            }
        }

        manifest
    }

    pub fn load(path: &Path) -> Result<Self, ProvisionError> {
        if !path.is_file() {
            return Err(ProvisionError::ManifestMissing(path.to_path_buf()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|source| ProvisionError::ManifestRead {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&content))
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.options.is_empty()
    }
}

/// `#` starts a comment at line start or after whitespace; a bare `#` inside
/// a token (as in URL fragments like `#egg=`) does not.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(idx) => &line[..idx],
        None => line,
    }
}
