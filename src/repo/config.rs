//! Repository configuration options.

use std::path::PathBuf;

use crate::storage::Signature;

/// Options for opening or initializing a repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// The working directory holding the tracked files and `.sprig/`.
    pub work_dir: PathBuf,
    /// Author recorded on new commits.
    pub author: Signature,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            author: Signature::sprig(),
        }
    }
}

impl RepositoryConfig {
    /// Create a new configuration for the given working directory.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    /// Set the commit author.
    pub fn author(mut self, author: Signature) -> Self {
        self.author = author;
        self
    }

    /// Set the author's name, keeping the email.
    pub fn author_name(mut self, name: impl Into<String>) -> Self {
        self.author.name = name.into();
        self
    }

    /// Set the author's email, keeping the name.
    pub fn author_email(mut self, email: impl Into<String>) -> Self {
        self.author.email = email.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = RepositoryConfig::new("/tmp/project")
            .author_name("Ada")
            .author_email("ada@example.com");

        assert_eq!(config.work_dir, PathBuf::from("/tmp/project"));
        assert_eq!(config.author.to_string(), "Ada <ada@example.com>");
    }

    #[test]
    fn test_default_author() {
        assert_eq!(RepositoryConfig::default().author, Signature::sprig());
    }
}
