//! Checksums and the artifact manifest

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA256 checksum of generated content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn of_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify that content matches this checksum
    pub fn verify(&self, content: &[u8]) -> bool {
        Self::from_bytes(content) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Artifact Manifest
// =============================================================================

/// One written artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Registry key (`<identifier>-<artifactClass>`)
    pub key: String,
    pub path: PathBuf,
    pub checksum: Checksum,
}

/// Everything one build wrote, stored as `manifest.json` in the distribution root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub interface: String,
    pub created_at: DateTime<Utc>,
    pub artifacts: Vec<ManifestEntry>,
    /// Checksum over every artifact checksum, in order
    pub manifest_checksum: Checksum,
}

impl ArtifactManifest {
    pub const FILE_NAME: &'static str = "manifest.json";

    pub fn new(interface: impl Into<String>, artifacts: Vec<ManifestEntry>) -> Self {
        let combined = artifacts
            .iter()
            .map(|entry| entry.checksum.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            interface: interface.into(),
            created_at: Utc::now(),
            manifest_checksum: Checksum::of_str(&combined),
            artifacts,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.artifacts.iter().find(|entry| entry.key == key)
    }

    /// Write `manifest.json` into `dist_root`
    pub fn write(&self, dist_root: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dist_root)?;
        let path = dist_root.join(Self::FILE_NAME);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
