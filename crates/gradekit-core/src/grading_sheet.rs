//! Markdown grading sheet with one `### <student>` block per student.

use crate::error::{GradeError, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBlock {
    pub key: String,
    /// Block text including its heading line.
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct GradingSheet {
    blocks: Vec<SheetBlock>,
}

impl GradingSheet {
    pub fn load(path: &Path) -> Result<Self> {
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            return Err(GradeError::NotMarkdown(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Ok(Self::parse(&data))
    }

    /// Lines before the first `### ` heading are ignored.
    pub fn parse(text: &str) -> Self {
        let mut blocks: Vec<SheetBlock> = Vec::new();
        for line in text.split_inclusive('\n') {
            if line.starts_with("### ") {
                let key = line
                    .trim_matches(|c: char| matches!(c, '#' | ' ' | '\n' | '\r'))
                    .to_string();
                blocks.push(SheetBlock {
                    key,
                    content: line.to_string(),
                });
            } else if let Some(current) = blocks.last_mut() {
                current.content.push_str(line);
            }
        }
        Self { blocks }
    }

    pub fn blocks(&self) -> &[SheetBlock] {
        &self.blocks
    }

    /// Block whose key the repository name ends with.
    pub fn match_repo(&self, repo_name: &str) -> Option<&SheetBlock> {
        self.blocks
            .iter()
            .find(|b| !b.key.is_empty() && repo_name.ends_with(&b.key))
    }
}
