use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::json;

use plx_domain::{
    derive_python_constraint, render_pylock, render_requirements, select_packages, ExportContext,
    ExportError, ExportFormat, ExportSelection, DEFAULT_GROUP,
};

use crate::outcome::ExecutionOutcome;
use crate::reader::{lock, project};
use crate::writer;

#[derive(Clone, Debug)]
pub struct ExportRequest {
    pub root: PathBuf,
    pub format: ExportFormat,
    pub output_dir: PathBuf,
    /// Defaults to the format's conventional file name; `-` means stdout.
    pub output_file: Option<String>,
    pub groups: Vec<String>,
    pub extras: Vec<String>,
}

pub fn export(request: &ExportRequest) -> Result<ExecutionOutcome> {
    let manifest_path = request.root.join("pyproject.toml");
    if !manifest_path.exists() {
        return Ok(ExecutionOutcome::user_error(
            format!("missing pyproject.toml at {}", manifest_path.display()),
            json!({
                "status": "missing_manifest",
                "pyproject": manifest_path.display().to_string(),
            }),
        ));
    }
    let descriptor = match project::load_project(&manifest_path) {
        Ok(descriptor) => descriptor,
        Err(err) => return Ok(input_error(&err)),
    };

    let lock_path = request.root.join("poetry.lock");
    if !lock_path.exists() {
        return Ok(ExecutionOutcome::user_error(
            format!(
                "missing poetry.lock at {} (resolve the project first)",
                lock_path.display()
            ),
            json!({
                "status": "missing_lock",
                "lockfile": lock_path.display().to_string(),
            }),
        ));
    }
    let lock = match lock::load_lock(&lock_path, &descriptor.extras) {
        Ok(lock) => lock,
        Err(err) => return Ok(input_error(&err)),
    };

    let selection = ExportSelection::new(&request.groups, &request.extras);
    for extra in &selection.extras {
        if !descriptor.extras.contains(extra) {
            return Ok(ExecutionOutcome::user_error(
                format!("extra `{extra}` is not defined for this project"),
                json!({
                    "status": "unknown_extra",
                    "extra": extra,
                    "known": descriptor.extras.names().collect::<Vec<_>>(),
                }),
            ));
        }
    }
    let known_groups: BTreeSet<&str> = lock
        .packages
        .iter()
        .flat_map(|package| package.groups.iter().map(String::as_str))
        .chain(std::iter::once(DEFAULT_GROUP))
        .collect();
    for group in &selection.groups {
        if !known_groups.contains(group.as_str()) {
            tracing::debug!(group = %group, "selected_group_not_in_lock");
        }
    }

    let constraint = derive_python_constraint(&descriptor.python_intervals);
    // Recorded lock paths resolve against absolute directories even when the
    // caller handed over relative ones.
    let ctx = ExportContext::new(absolutize(&request.root), absolutize(&request.output_dir));
    let filtered = match select_packages(&lock.packages, &selection) {
        Ok(filtered) => filtered,
        Err(err) => return Ok(domain_error(&err)),
    };
    tracing::debug!(
        format = %request.format,
        selected = filtered.len(),
        total = lock.packages.len(),
        "export_selection_complete"
    );

    let content = match request.format {
        ExportFormat::Requirements => render_requirements(&constraint, &filtered, &ctx),
        ExportFormat::Pylock => {
            match render_pylock(&lock.version, &constraint, &selection, &filtered, &ctx) {
                Ok(content) => content,
                Err(err) => return Ok(domain_error(&err)),
            }
        }
    };

    let filename = request
        .output_file
        .clone()
        .unwrap_or_else(|| request.format.file_name().to_string());
    let written = writer::emit(&request.output_dir, &filename, &content)?;
    let destination = written
        .as_ref()
        .map_or_else(|| "stdout".to_string(), |path| path.display().to_string());

    Ok(ExecutionOutcome::success(
        format!(
            "exported {} package(s) to {destination}",
            filtered.len()
        ),
        json!({
            "format": request.format.to_string(),
            "packages": filtered.len(),
            "destination": destination,
            "groups": selection.groups.iter().collect::<Vec<_>>(),
            "extras": selection.extras.iter().collect::<Vec<_>>(),
            "requires_python": constraint.requires_python,
        }),
    ))
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn domain_error(err: &ExportError) -> ExecutionOutcome {
    ExecutionOutcome::user_error(err.to_string(), json!({"status": err.kind()}))
}

/// Reader failures are input problems, with the domain cause surfaced when
/// one is buried in the chain.
fn input_error(err: &anyhow::Error) -> ExecutionOutcome {
    if let Some(domain) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ExportError>())
    {
        return domain_error(domain);
    }
    ExecutionOutcome::user_error(format!("{err:#}"), json!({"status": "invalid_input"}))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use crate::outcome::CommandStatus;

    use super::*;

    fn write_project(root: &Path, python: &str, lock_body: &str) {
        fs::write(
            root.join("pyproject.toml"),
            format!(
                "[tool.poetry]\nname = \"demo\"\nversion = \"0.1.0\"\n\n[tool.poetry.dependencies]\npython = \"{python}\"\n"
            ),
        )
        .expect("write pyproject");
        fs::write(root.join("poetry.lock"), lock_body).expect("write lock");
    }

    fn request(root: &Path, format: ExportFormat) -> ExportRequest {
        ExportRequest {
            root: root.to_path_buf(),
            format,
            output_dir: root.join("dist"),
            output_file: None,
            groups: Vec::new(),
            extras: Vec::new(),
        }
    }

    const SIMPLE_LOCK: &str = r#"[[package]]
name = "foo"
version = "1.0"
optional = false
groups = ["main"]
files = [
    {file = "foo-1.0-py3-none-any.whl", hash = "sha256:abcdef", url = "https://example.org/foo-1.0-py3-none-any.whl"},
]

[metadata]
lock-version = "2.1"
"#;

    #[test]
    fn exports_requirements_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(dir.path(), ">=3.9", SIMPLE_LOCK);
        let outcome = export(&request(dir.path(), ExportFormat::Requirements)).expect("export");
        assert_eq!(outcome.status, CommandStatus::Ok);
        let written = fs::read_to_string(dir.path().join("dist").join("requirements.txt"))
            .expect("read output");
        assert_eq!(written, "foo==1.0\n");
        assert_eq!(outcome.details["packages"], 1);
    }

    #[test]
    fn exports_pylock_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(dir.path(), ">=3.9", SIMPLE_LOCK);
        let outcome = export(&request(dir.path(), ExportFormat::Pylock)).expect("export");
        assert_eq!(outcome.status, CommandStatus::Ok);
        let written =
            fs::read_to_string(dir.path().join("dist").join("pylock.toml")).expect("read output");
        assert!(written.starts_with("lock-version = \"1.0\"\nrequires-python = \">=3.9\"\n"));
        assert!(written.contains("[tool.plx]"));
    }

    #[test]
    fn old_lock_version_fails_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(
            dir.path(),
            ">=3.9",
            "[metadata]\nlock-version = \"2.0\"\n",
        );
        let outcome = export(&request(dir.path(), ExportFormat::Pylock)).expect("export");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(
            outcome.message,
            "cannot export pylock.toml because the lock file is not at least version 2.1"
        );
        assert!(!dir.path().join("dist").join("pylock.toml").exists());
    }

    #[test]
    fn unknown_extras_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_project(dir.path(), ">=3.9", SIMPLE_LOCK);
        let mut req = request(dir.path(), ExportFormat::Requirements);
        req.extras = vec!["nope".to_string()];
        let outcome = export(&req).expect("export");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert!(outcome.message.contains("extra `nope`"));
    }

    #[test]
    fn missing_lock_is_a_user_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("pyproject.toml"),
            "[tool.poetry]\nname = \"demo\"\n",
        )
        .expect("write pyproject");
        let outcome = export(&request(dir.path(), ExportFormat::Requirements)).expect("export");
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert!(outcome.message.contains("missing poetry.lock"));
    }
}
