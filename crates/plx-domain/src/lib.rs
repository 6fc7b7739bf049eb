#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod error;
pub mod export;
pub mod lock;
pub mod marker;
pub mod pythons;

pub use error::ExportError;
pub use export::{
    render_pylock, render_requirements, select_packages, ExportContext, ExportFormat,
    ExportSelection, FilteredPackage, CREATED_BY, PYLOCK_VERSION,
};
pub use lock::{
    canonicalize_name, ArchiveLocation, Artifact, LockedPackage, Origin, DEFAULT_GROUP,
    DEFAULT_INDEX_URL,
};
pub use marker::{parse_marker, CompareOp, MarkerExpr, Truth};
pub use pythons::{derive_python_constraint, PythonConstraint, VersionInterval};
