//! core type-safe wrappers for the storage layer.

use std::fmt;
use std::fmt::Formatter;

use git2::{ObjectType, Oid};
use serde::{Deserialize, Serialize};

/// length of a full hex object id
pub const HEX_LEN: usize = 40;

/// check that a string is a full-length lowercase-or-uppercase hex id
fn validate_hex(hex: &str) -> Result<(), InvalidNameError> {
    if hex.len() != HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InvalidNameError::InvalidId(hex.to_string()));
    }
    Ok(())
}

/// content-hash identifier of a commit record
///
/// kept distinct from [`BlobId`] so one cannot stand in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    /// hash a serialized commit record
    pub(crate) fn hash(record: &[u8]) -> Result<Self, git2::Error> {
        Oid::hash_object(ObjectType::Commit, record).map(CommitId)
    }

    /// parse CommitId from a full-length hex string
    pub fn from_hex(hex: &str) -> Result<Self, InvalidNameError> {
        validate_hex(hex)?;
        Oid::from_str(hex)
            .map(CommitId)
            .map_err(|_| InvalidNameError::InvalidId(hex.to_string()))
    }

    /// short form of the commit ID
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CommitId {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.to_string()
    }
}

/// content-hash identifier of a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobId(pub(crate) Oid);

impl BlobId {
    /// hash raw file content the way git hashes a blob
    pub fn of(bytes: &[u8]) -> Result<Self, git2::Error> {
        Oid::hash_object(ObjectType::Blob, bytes).map(BlobId)
    }

    /// parse BlobId from a full-length hex string
    pub fn from_hex(hex: &str) -> Result<Self, InvalidNameError> {
        validate_hex(hex)?;
        Oid::from_str(hex)
            .map(BlobId)
            .map_err(|_| InvalidNameError::InvalidId(hex.to_string()))
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BlobId {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<BlobId> for String {
    fn from(id: BlobId) -> Self {
        id.to_string()
    }
}

/// A validated branch name.
///
/// Branch names become file names under the branches directory, so they
/// are restricted to a single path component:
/// - non-empty, at most 255 bytes
/// - no path separators, whitespace or control characters
/// - cannot start with '.' (reserved for bookkeeping entries)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    /// the branch created by `init`
    pub const DEFAULT: &'static str = "master";

    /// create a new BranchName, validating the input
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), InvalidNameError> {
        if name.is_empty() {
            return Err(InvalidNameError::Empty);
        }

        if name.len() > 255 {
            return Err(InvalidNameError::TooLong(name.len()));
        }

        if let Some(first) = name.chars().next() {
            if first == '.' {
                return Err(InvalidNameError::InvalidStart(first));
            }
        }

        for (i, c) in name.chars().enumerate() {
            if c == '/' || c == '\\' || c.is_whitespace() || c.is_control() {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }

        Ok(())
    }

    /// the default branch
    pub fn default_branch() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// author identity recorded on commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    /// create a new signature
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// default signature when none is configured
    pub fn sprig() -> Self {
        Self::new("sprig", "sprig@localhost")
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::sprig()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// error type for invalid names (branches, paths, ids)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    TooLong(usize),
    InvalidStart(char),
    InvalidCharacter { char: char, position: usize },
    InvalidPath(String),
    InvalidId(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::TooLong(len) => write!(f, "name too long: {} bytes", len),
            Self::InvalidStart(c) => write!(f, "name cannot start with '{}'", c),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character {:?} at position {}", char, position)
            }
            Self::InvalidPath(path) => write!(f, "invalid path: '{}'", path),
            Self::InvalidId(id) => write!(f, "invalid object id: '{}'", id),
        }
    }
}

impl std::error::Error for InvalidNameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_name_valid() {
        assert!(BranchName::new("master").is_ok());
        assert!(BranchName::new("feature-x").is_ok());
        assert!(BranchName::new("fix_123").is_ok());
        assert!(BranchName::new("v1.2").is_ok());
    }

    #[test]
    fn test_branch_name_invalid() {
        assert_eq!(BranchName::new(""), Err(InvalidNameError::Empty));
        assert!(BranchName::new(".current").is_err()); // reserved prefix
        assert!(BranchName::new("feat/x").is_err()); // separator
        assert!(BranchName::new("has space").is_err());
        assert!(BranchName::new("a".repeat(256)).is_err());
    }

    #[test]
    fn test_blob_id_is_git_compatible() {
        // `git hash-object` of an empty file
        let id = BlobId::of(b"").unwrap();
        assert_eq!(id.to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn test_id_hex_roundtrip() {
        let id = BlobId::of(b"hello").unwrap();
        let parsed = BlobId::from_hex(&id.to_string()).unwrap();
        assert_eq!(id, parsed);

        assert!(CommitId::from_hex("abcd").is_err()); // too short
        assert!(CommitId::from_hex(&"z".repeat(HEX_LEN)).is_err()); // not hex
    }

    #[test]
    fn test_id_serde_as_string() {
        let id = BlobId::of(b"x").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: BlobId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_commit_id_short() {
        let id = CommitId::hash(b"record").unwrap();
        assert_eq!(id.short().len(), 7);
        assert!(id.to_string().starts_with(&id.short()));
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(Signature::sprig().to_string(), "sprig <sprig@localhost>");
    }
}
