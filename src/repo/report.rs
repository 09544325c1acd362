//! Printable reports: `status` and log entries.

use std::fmt;

use crate::storage::{BranchName, Commit};

/// how a tracked file differs from what the next commit would record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Modification {
    Modified,
    Deleted,
}

impl fmt::Display for Modification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modification::Modified => write!(f, "modified"),
            Modification::Deleted => write!(f, "deleted"),
        }
    }
}

/// Snapshot of the repository state, every list sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub branches: Vec<BranchName>,
    pub active: BranchName,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    pub not_staged: Vec<(String, Modification)>,
    pub untracked: Vec<String>,
}

impl StatusReport {
    /// check if there is nothing staged, modified or untracked
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.removed.is_empty()
            && self.not_staged.is_empty()
            && self.untracked.is_empty()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Branches ===")?;
        for branch in &self.branches {
            if branch == &self.active {
                writeln!(f, "*{}", branch)?;
            } else {
                writeln!(f, "{}", branch)?;
            }
        }

        writeln!(f, "\n=== Staged Files ===")?;
        for path in &self.staged {
            writeln!(f, "{}", path)?;
        }

        writeln!(f, "\n=== Removed Files ===")?;
        for path in &self.removed {
            writeln!(f, "{}", path)?;
        }

        writeln!(f, "\n=== Modifications Not Staged For Commit ===")?;
        for (path, modification) in &self.not_staged {
            writeln!(f, "{} ({})", path, modification)?;
        }

        writeln!(f, "\n=== Untracked Files ===")?;
        for path in &self.untracked {
            writeln!(f, "{}", path)?;
        }
        Ok(())
    }
}

/// one commit as shown by `log` and `global-log`
pub struct LogEntry<'a>(pub &'a Commit);

impl fmt::Display for LogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let commit = self.0;
        writeln!(f, "===")?;
        writeln!(f, "commit {}", commit.id)?;
        if let (Some(parent), Some(merged)) = (commit.parent, commit.merge_parent) {
            writeln!(f, "Merge: {} {}", parent.short(), merged.short())?;
        }
        writeln!(f, "Date: {}", commit.timestamp.format("%a %b %-d %H:%M:%S %Y %z"))?;
        writeln!(f, "{}", commit.message)
    }
}
