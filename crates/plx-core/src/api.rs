// Intended public API surface for `plx-core`.
//
// This module exists to make it explicit which types/functions are part of
// the stable interface used by the CLI and by integration tests.

pub use crate::commands::export::{export, ExportRequest};
pub use crate::outcome::{to_json_response, CommandStatus, ExecutionOutcome};
pub use crate::reader::lock::{load_lock, parse_lock, LockDocument};
pub use crate::reader::project::{load_project, parse_project, ExtrasIndex, ProjectDescriptor};
pub use crate::reader::python::parse_python_intervals;
pub use crate::writer::emit;
