#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub fn write_project(root: &Path, pyproject: &str, lock: &str) {
    fs::write(root.join("pyproject.toml"), pyproject).expect("write pyproject.toml");
    fs::write(root.join("poetry.lock"), lock).expect("write poetry.lock");
}

pub fn basic_pyproject(python: &str) -> String {
    format!(
        "[tool.poetry]\nname = \"sample-project\"\nversion = \"1.2.3\"\n\n[tool.poetry.dependencies]\npython = \"{python}\"\n"
    )
}

pub const EMPTY_LOCK: &str = "[metadata]\nlock-version = \"2.1\"\n";

pub const PYPI_LOCK: &str = r#"[[package]]
name = "foo"
version = "1.0"
optional = false
groups = ["main"]
files = [
    {file = "foo-1.0-py3-none-any.whl", hash = "sha256:abcdef1234567890", url = "https://example.org/foo-1.0-py3-none-any.whl"},
    {file = "foo-1.0.tar.gz", hash = "sha256:0123456789abcdef", url = "https://example.org/foo-1.0.tar.gz"},
]

[metadata]
lock-version = "2.1"
"#;

pub const VCS_LOCK: &str = r#"[[package]]
name = "bar"
version = "2.3"
optional = false
groups = ["main"]

[package.source]
type = "git"
url = "https://github.com/bar/bar.git"
reference = "123456"
resolved_reference = "abcdef"
subdirectory = "subdir"

[metadata]
lock-version = "2.1"
"#;
