//! Rewrite plan structures and validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{CommitRef, ImprovedMessage};

/// Plan file structure.
///
/// One `Reword` per commit, in chronological (oldest-first) order. The
/// order is load-bearing: entry `i` replaces the message of the `i`-th
/// replayed commit during the rewrite.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanFile {
    /// List of message replacements to apply.
    pub rewords: Vec<Reword>,
}

/// A single planned message replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reword {
    /// Full 40-character SHA-1 commit hash.
    pub commit: String,
    /// The commit's original message.
    pub original: String,
    /// The improved message to install.
    pub message: String,
}

impl PlanFile {
    /// Builds a plan by zipping commits with their improved messages.
    ///
    /// Fails if the two sequences disagree in length or id order; the
    /// improvement pipeline guarantees correspondence, so a mismatch
    /// here means the caller wired the sequences up wrong.
    pub fn from_parts(commits: &[CommitRef], improved: &[ImprovedMessage]) -> Result<Self> {
        if commits.len() != improved.len() {
            anyhow::bail!(
                "Improved message count ({}) does not match commit count ({})",
                improved.len(),
                commits.len()
            );
        }

        let rewords = commits
            .iter()
            .zip(improved)
            .map(|(commit, msg)| {
                if commit.id != msg.id {
                    anyhow::bail!(
                        "Improved message id {} does not match commit {}",
                        msg.id,
                        commit.id
                    );
                }
                Ok(Reword {
                    commit: commit.id.clone(),
                    original: commit.original_message.clone(),
                    message: msg.message.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rewords })
    }

    /// Loads a plan from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read plan file: {}", path.as_ref().display()))?;

        let plan: PlanFile =
            crate::data::from_yaml(&content).context("Failed to parse YAML plan file")?;

        plan.validate()?;

        Ok(plan)
    }

    /// Validates plan structure and content.
    pub fn validate(&self) -> Result<()> {
        // An empty plan is allowed - it indicates no changes are needed
        for (i, reword) in self.rewords.iter().enumerate() {
            reword
                .validate()
                .with_context(|| format!("Invalid reword at index {}", i))?;
        }

        Ok(())
    }

    /// True when no planned message differs from its original.
    pub fn is_noop(&self) -> bool {
        self.rewords.iter().all(|r| r.message == r.original)
    }

    /// Saves the plan to a YAML file with proper multiline formatting.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml_content =
            serde_yaml::to_string(self).context("Failed to serialize plan to YAML")?;

        // Post-process YAML to use literal block scalars for multiline messages
        let formatted_yaml = format_multiline_yaml(&yaml_content);

        fs::write(&path, formatted_yaml)
            .with_context(|| format!("Failed to write plan file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

impl Reword {
    /// Validates reword structure.
    pub fn validate(&self) -> Result<()> {
        // Validate commit hash format
        if self.commit.len() != 40 {
            anyhow::bail!(
                "Commit hash must be exactly 40 characters long, got: {}",
                self.commit.len()
            );
        }

        if !self
            .commit
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            || !self.commit.chars().all(|c| c.is_ascii_hexdigit())
        {
            anyhow::bail!("Commit hash must be lowercase hexadecimal");
        }

        // Validate message content
        if self.message.trim().is_empty() {
            anyhow::bail!("Commit message cannot be empty");
        }

        Ok(())
    }
}

/// Formats YAML to use literal block scalars for multiline message fields.
fn format_multiline_yaml(yaml: &str) -> String {
    let mut result = String::new();

    for line in yaml.lines() {
        let trimmed = line.trim_start();
        let is_message_field = trimmed.starts_with("message:") || trimmed.starts_with("original:");

        // Quoted single-line scalars with embedded \n escapes become
        // literal blocks so the file is readable and editable
        if is_message_field && line.contains('"') {
            let indent = line.len() - line.trim_start().len();
            let indent_str = " ".repeat(indent);
            let field = trimmed.split(':').next().unwrap_or("message");

            if let (Some(start_quote), Some(end_quote)) = (line.find('"'), line.rfind('"')) {
                if start_quote != end_quote {
                    let quoted_content = &line[start_quote + 1..end_quote];

                    if quoted_content.contains("\\n") {
                        result.push_str(&format!("{}{}: |\n", indent_str, field));

                        let unescaped = quoted_content.replace("\\n", "\n").replace("\\\"", "\"");
                        for content_line in unescaped.lines() {
                            result.push_str(&format!("{}  {}\n", indent_str, content_line));
                        }
                        continue;
                    }
                }
            }
        }

        result.push_str(line);
        result.push('\n');
    }

    result
}
