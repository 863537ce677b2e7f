use crate::domain::ports::RuleSource;
use crate::domain::rules::{NodeRule, parse_rules};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rule file reader. Accepts record arrays, serialized graphs and
/// node-editor exports.
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for FileRuleSource {
    fn load(&self) -> Result<Vec<NodeRule>> {
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read rules file: {}", self.path.display()))?;
        let rules = parse_rules(&json)
            .with_context(|| format!("Failed to parse rules file: {}", self.path.display()))?;
        debug!(path = %self.path.display(), rules = rules.len(), "loaded rules");
        Ok(rules)
    }
}
