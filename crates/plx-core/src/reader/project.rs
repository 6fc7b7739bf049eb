use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use plx_domain::{canonicalize_name, VersionInterval};
use toml_edit::{DocumentMut, Item, TableLike, Value};

use super::python::parse_python_intervals;

/// Which optional extras each package participates in, keyed by extra name.
#[derive(Clone, Debug, Default)]
pub struct ExtrasIndex {
    by_extra: IndexMap<String, Vec<String>>,
}

impl ExtrasIndex {
    pub fn insert(&mut self, extra: &str, packages: Vec<String>) {
        self.by_extra.insert(canonicalize_name(extra), packages);
    }

    pub fn extras_for(&self, package: &str) -> Vec<String> {
        self.by_extra
            .iter()
            .filter(|(_, packages)| packages.iter().any(|name| name == package))
            .map(|(extra, _)| extra.clone())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_extra.keys().map(String::as_str)
    }

    pub fn contains(&self, extra: &str) -> bool {
        self.by_extra.contains_key(extra)
    }
}

/// The slice of pyproject.toml the exporter needs: identity, declared
/// python support, and the extras mapping.
#[derive(Clone, Debug)]
pub struct ProjectDescriptor {
    pub name: Option<String>,
    pub version: Option<String>,
    pub python_intervals: Vec<VersionInterval>,
    pub extras: ExtrasIndex,
}

pub fn load_project(path: &Path) -> Result<ProjectDescriptor> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_project(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_project(contents: &str) -> Result<ProjectDescriptor> {
    let doc: DocumentMut = contents.parse().context("invalid pyproject document")?;
    let project = doc.get("project").and_then(Item::as_table_like);
    let poetry = doc
        .get("tool")
        .and_then(Item::as_table_like)
        .and_then(|tool| tool.get("poetry"))
        .and_then(Item::as_table_like);

    let name = table_str(project, "name").or_else(|| table_str(poetry, "name"));
    let version = table_str(project, "version").or_else(|| table_str(poetry, "version"));

    let python_text = poetry
        .and_then(|table| table.get("dependencies"))
        .and_then(Item::as_table_like)
        .and_then(|dependencies| dependencies.get("python"))
        .and_then(python_requirement_text)
        .or_else(|| table_str(project, "requires-python"))
        .unwrap_or_else(|| "*".to_string());
    let python_intervals = parse_python_intervals(&python_text)
        .with_context(|| format!("unsupported python support declaration `{python_text}`"))?;

    let mut extras = ExtrasIndex::default();
    if let Some(table) = poetry
        .and_then(|poetry| poetry.get("extras"))
        .and_then(Item::as_table_like)
    {
        for (extra, packages) in table.iter() {
            extras.insert(extra, package_names(packages));
        }
    } else if let Some(table) = project
        .and_then(|project| project.get("optional-dependencies"))
        .and_then(Item::as_table_like)
    {
        for (extra, requirements) in table.iter() {
            extras.insert(extra, package_names(requirements));
        }
    }

    Ok(ProjectDescriptor {
        name,
        version,
        python_intervals,
        extras,
    })
}

fn table_str(table: Option<&dyn TableLike>, key: &str) -> Option<String> {
    table
        .and_then(|table| table.get(key))
        .and_then(Item::as_str)
        .map(ToString::to_string)
}

/// `python = ">=3.9"` or `python = { version = ">=3.9" }`.
fn python_requirement_text(item: &Item) -> Option<String> {
    if let Some(text) = item.as_str() {
        return Some(text.to_string());
    }
    item.as_table_like()
        .and_then(|table| table.get("version"))
        .and_then(Item::as_str)
        .map(ToString::to_string)
}

fn package_names(item: &Item) -> Vec<String> {
    item.as_array()
        .map(|array| {
            array
                .iter()
                .filter_map(Value::as_str)
                .map(requirement_name)
                .collect()
        })
        .unwrap_or_default()
}

/// The canonical package name at the head of a requirement string.
fn requirement_name(spec: &str) -> String {
    let trimmed = spec.trim();
    let mut end = trimmed.len();
    for (idx, ch) in trimmed.char_indices() {
        if ch.is_ascii_whitespace() || matches!(ch, '<' | '>' | '=' | '!' | '~' | ';' | '(') {
            end = idx;
            break;
        }
    }
    let head = &trimmed[..end];
    let base = head.split('[').next().unwrap_or(head);
    canonicalize_name(base)
}
