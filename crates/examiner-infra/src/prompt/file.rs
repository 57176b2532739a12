//! File-backed interviewer persona template.
//!
//! The file is re-read on every load so edits apply to the next topic a
//! session starts, without restarting the server.

use std::path::{Path, PathBuf};

use examiner_core::prompt::{PromptTemplate, PromptTemplateSource};

/// Reads the persona template from a text file.
#[derive(Debug, Clone)]
pub struct FilePromptTemplate {
    path: PathBuf,
}

impl FilePromptTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PromptTemplateSource for FilePromptTemplate {
    async fn load(&self) -> PromptTemplate {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if !content.trim().is_empty() => PromptTemplate::new(content),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Prompt template is empty, using built-in");
                PromptTemplate::fallback()
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No prompt template file, using built-in");
                PromptTemplate::fallback()
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to read prompt template, using built-in");
                PromptTemplate::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let source = FilePromptTemplate::new(tmp.path().join("prompt.txt"));
        assert_eq!(source.load().await, PromptTemplate::fallback());
    }

    #[tokio::test]
    async fn test_empty_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prompt.txt");
        tokio::fs::write(&path, "  \n").await.unwrap();
        assert_eq!(FilePromptTemplate::new(path).load().await, PromptTemplate::fallback());
    }

    #[tokio::test]
    async fn test_reads_file_and_picks_up_edits() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prompt.txt");
        let source = FilePromptTemplate::new(&path);

        tokio::fs::write(&path, "Strict interviewer on %s").await.unwrap();
        assert_eq!(source.load().await.render("DNS"), "Strict interviewer on DNS");

        tokio::fs::write(&path, "Friendly interviewer on {topic}").await.unwrap();
        assert_eq!(source.load().await.render("DNS"), "Friendly interviewer on DNS");
    }
}
