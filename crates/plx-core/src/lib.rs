#![deny(clippy::all, warnings)]

pub mod api;
mod commands;
mod outcome;
pub mod reader;
mod writer;

pub use crate::commands::export::{export, ExportRequest};
pub use crate::outcome::{to_json_response, CommandStatus, ExecutionOutcome};
pub use plx_domain::{ExportFormat, ExportSelection};
