use toml_edit::{Array, ArrayOfTables, DocumentMut, Item, Table, Value as TomlValue};

use crate::error::ExportError;
use crate::lock::{ArchiveLocation, Artifact, Origin};
use crate::pythons::PythonConstraint;

use super::selection::{ExportSelection, FilteredPackage};
use super::{ExportContext, ExportFormat, CREATED_BY};

pub const PYLOCK_VERSION: &str = "1.0";

const MIN_LOCK_VERSION: (u64, u64) = (2, 1);
const MIN_LOCK_VERSION_TEXT: &str = "2.1";

/// Renders the structured lock document. Fails before producing any output
/// when the source lock format predates what this serializer understands.
pub fn render_pylock(
    lock_format_version: &str,
    constraint: &PythonConstraint,
    selection: &ExportSelection,
    packages: &[FilteredPackage],
    ctx: &ExportContext,
) -> Result<String, ExportError> {
    ensure_supported_lock(lock_format_version)?;

    let mut doc = DocumentMut::new();
    doc.insert("lock-version", Item::Value(TomlValue::from(PYLOCK_VERSION)));
    if let Some(environment) = &constraint.environment {
        let mut environments = Array::new();
        environments.push(TomlValue::from(environment.render()));
        doc.insert("environments", Item::Value(TomlValue::Array(environments)));
    }
    if let Some(range) = &constraint.requires_python {
        doc.insert("requires-python", Item::Value(TomlValue::from(range.clone())));
    }
    doc.insert("created-by", Item::Value(TomlValue::from(CREATED_BY)));

    if packages.is_empty() {
        // The empty result is an explicit token, not an omitted section.
        doc.insert("packages", Item::Value(TomlValue::Array(Array::new())));
    } else {
        let mut tables = ArrayOfTables::new();
        for entry in packages {
            tables.push(package_table(entry, ctx)?);
        }
        doc.insert("packages", Item::ArrayOfTables(tables));
    }

    let mut tool = Table::new();
    tool.set_implicit(true);
    tool.insert("plx", Item::Table(trailer_table(selection)));
    doc.insert("tool", Item::Table(tool));

    Ok(doc.to_string())
}

fn ensure_supported_lock(found: &str) -> Result<(), ExportError> {
    let supported = parse_lock_tag(found).is_some_and(|version| version >= MIN_LOCK_VERSION);
    if supported {
        Ok(())
    } else {
        Err(ExportError::LockVersionUnsupported {
            format: ExportFormat::Pylock,
            found: found.to_string(),
            minimum: MIN_LOCK_VERSION_TEXT,
        })
    }
}

fn parse_lock_tag(tag: &str) -> Option<(u64, u64)> {
    let mut parts = tag.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

fn package_table(entry: &FilteredPackage, ctx: &ExportContext) -> Result<Table, ExportError> {
    let package = &entry.package;
    let mut table = Table::new();
    table.insert("name", Item::Value(TomlValue::from(package.name.clone())));

    // A directory checkout is mutable, so no version claim is made for it.
    if !matches!(package.origin, Origin::Directory { .. }) {
        if let Some(version) = &package.version {
            table.insert("version", Item::Value(TomlValue::from(version.to_string())));
        }
    }
    if let Origin::Index { url } = &package.origin {
        table.insert("index", Item::Value(TomlValue::from(url.clone())));
    }
    if let Some(marker) = &entry.marker {
        table.insert("marker", Item::Value(TomlValue::from(marker.render())));
    }

    match &package.origin {
        Origin::Index { .. } => {
            let wheels: Vec<&Artifact> = package.wheel_artifacts().collect();
            if !wheels.is_empty() {
                let mut tables = ArrayOfTables::new();
                for wheel in wheels {
                    tables.push(distribution_table(wheel));
                }
                table.insert("wheels", Item::ArrayOfTables(tables));
            }
            if let Some(sdist) = package.sdist_artifact()? {
                table.insert("sdist", Item::Table(distribution_table(sdist)));
            }
        }
        Origin::Vcs {
            kind,
            url,
            requested_revision,
            resolved_commit,
            subdirectory,
        } => {
            let mut vcs = Table::new();
            vcs.insert("type", Item::Value(TomlValue::from(kind.clone())));
            vcs.insert("url", Item::Value(TomlValue::from(url.clone())));
            if let Some(revision) = requested_revision {
                vcs.insert(
                    "requested-revision",
                    Item::Value(TomlValue::from(revision.clone())),
                );
            }
            if let Some(commit) = resolved_commit {
                vcs.insert("commit-id", Item::Value(TomlValue::from(commit.clone())));
            }
            if let Some(subdirectory) = subdirectory {
                vcs.insert(
                    "subdirectory",
                    Item::Value(TomlValue::from(subdirectory.clone())),
                );
            }
            table.insert("vcs", Item::Table(vcs));
        }
        Origin::Directory { path, editable } => {
            let mut directory = Table::new();
            directory.insert(
                "path",
                Item::Value(TomlValue::from(ctx.resolve_path(path))),
            );
            if *editable {
                directory.insert("editable", Item::Value(TomlValue::from(true)));
            }
            table.insert("directory", Item::Table(directory));
        }
        Origin::Archive {
            location,
            subdirectory,
        } => {
            let mut archive = Table::new();
            match location {
                ArchiveLocation::Path(path) => {
                    archive.insert(
                        "path",
                        Item::Value(TomlValue::from(ctx.resolve_path(path))),
                    );
                }
                ArchiveLocation::Url(url) => {
                    archive.insert("url", Item::Value(TomlValue::from(url.clone())));
                }
            }
            if let Some(subdirectory) = subdirectory {
                archive.insert(
                    "subdirectory",
                    Item::Value(TomlValue::from(subdirectory.clone())),
                );
            }
            if let Some(hashes) = hashes_table(package.artifacts.iter()) {
                archive.insert("hashes", Item::Table(hashes));
            }
            table.insert("archive", Item::Table(archive));
        }
    }

    Ok(table)
}

fn distribution_table(artifact: &Artifact) -> Table {
    let mut table = Table::new();
    table.insert(
        "name",
        Item::Value(TomlValue::from(artifact.filename.clone())),
    );
    if let Some(url) = &artifact.url {
        table.insert("url", Item::Value(TomlValue::from(url.clone())));
    }
    if let Some(hashes) = hashes_table(std::iter::once(artifact)) {
        table.insert("hashes", Item::Table(hashes));
    }
    table
}

fn hashes_table<'a>(artifacts: impl Iterator<Item = &'a Artifact>) -> Option<Table> {
    let mut table = Table::new();
    let mut any = false;
    for artifact in artifacts {
        if let Some((algorithm, digest)) = artifact.hash_parts() {
            table.insert(algorithm, Item::Value(TomlValue::from(digest)));
            any = true;
        }
    }
    any.then_some(table)
}

fn trailer_table(selection: &ExportSelection) -> Table {
    let mut trailer = Table::new();
    let mut groups = Array::new();
    for group in &selection.groups {
        groups.push(TomlValue::from(group.as_str()));
    }
    trailer.insert("groups", Item::Value(TomlValue::Array(groups)));
    let mut extras = Array::new();
    for extra in &selection.extras {
        extras.push(TomlValue::from(extra.as_str()));
    }
    trailer.insert("extras", Item::Value(TomlValue::Array(extras)));
    trailer
}
