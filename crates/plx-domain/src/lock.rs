use indexmap::IndexMap;
use pep440_rs::Version;

use crate::error::ExportError;

pub const DEFAULT_GROUP: &str = "main";
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/simple";

/// Canonical package-name form: lowercase with `_` and `.` collapsed to `-`.
pub fn canonicalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['_', '.'], "-")
}

#[derive(Clone, Debug)]
pub struct Artifact {
    pub filename: String,
    pub hash: Option<String>,
    pub url: Option<String>,
}

impl Artifact {
    pub fn is_wheel(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".whl")
    }

    /// Splits an `algorithm:digest` hash into its two halves.
    pub fn hash_parts(&self) -> Option<(&str, &str)> {
        self.hash.as_deref().and_then(|hash| hash.split_once(':'))
    }
}

#[derive(Clone, Debug)]
pub enum ArchiveLocation {
    Path(String),
    Url(String),
}

#[derive(Clone, Debug)]
pub enum Origin {
    Index {
        url: String,
    },
    Vcs {
        kind: String,
        url: String,
        requested_revision: Option<String>,
        resolved_commit: Option<String>,
        subdirectory: Option<String>,
    },
    Directory {
        path: String,
        editable: bool,
    },
    Archive {
        location: ArchiveLocation,
        subdirectory: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct LockedPackage {
    pub name: String,
    pub version: Option<Version>,
    pub groups: Vec<String>,
    pub optional_for: Vec<String>,
    /// Marker text per group. A group without an entry always applies.
    pub markers: IndexMap<String, String>,
    pub origin: Origin,
    pub artifacts: Vec<Artifact>,
}

impl LockedPackage {
    pub fn wheel_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|artifact| artifact.is_wheel())
    }

    /// The single source distribution, if any. More than one is a
    /// data-integrity violation in the lock.
    pub fn sdist_artifact(&self) -> Result<Option<&Artifact>, ExportError> {
        let mut found = None;
        for artifact in &self.artifacts {
            if artifact.is_wheel() {
                continue;
            }
            if found.is_some() {
                return Err(ExportError::DuplicateSdist {
                    package: self.name.clone(),
                });
            }
            found = Some(artifact);
        }
        Ok(found)
    }
}
