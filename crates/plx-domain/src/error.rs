use thiserror::Error;

use crate::export::ExportFormat;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid marker `{text}`: {reason}")]
    MarkerSyntax { text: String, reason: String },
    #[error("cannot export {format} because the lock file is not at least version {minimum}")]
    LockVersionUnsupported {
        format: ExportFormat,
        found: String,
        minimum: &'static str,
    },
    #[error("package `{package}` declares more than one source distribution")]
    DuplicateSdist { package: String },
    #[error("package `{package}` has unknown source type `{kind}`")]
    UnknownSourceType { package: String, kind: String },
}

impl ExportError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MarkerSyntax { .. } => "marker_syntax",
            Self::LockVersionUnsupported { .. } => "lock_version_unsupported",
            Self::DuplicateSdist { .. } => "duplicate_sdist",
            Self::UnknownSourceType { .. } => "unknown_source_type",
        }
    }
}
