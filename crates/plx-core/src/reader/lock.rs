use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use pep440_rs::Version;
use plx_domain::{
    canonicalize_name, ArchiveLocation, Artifact, ExportError, LockedPackage, Origin,
    DEFAULT_GROUP, DEFAULT_INDEX_URL,
};
use toml_edit::{DocumentMut, Item, TableLike, Value};

use super::project::ExtrasIndex;

/// The lock as read from disk: the declared format version plus the
/// normalized package records, in file order.
#[derive(Clone, Debug)]
pub struct LockDocument {
    pub version: String,
    pub packages: Vec<LockedPackage>,
}

pub fn load_lock(path: &Path, extras: &ExtrasIndex) -> Result<LockDocument> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_lock(&contents, extras).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_lock(contents: &str, extras: &ExtrasIndex) -> Result<LockDocument> {
    let doc: DocumentMut = contents.parse().context("invalid lock document")?;
    let version = doc
        .get("metadata")
        .and_then(Item::as_table_like)
        .and_then(|metadata| metadata.get("lock-version"))
        .and_then(Item::as_str)
        .unwrap_or("0")
        .to_string();

    let mut packages = Vec::new();
    if let Some(tables) = doc.get("package").and_then(Item::as_array_of_tables) {
        for table in tables {
            packages.push(parse_package(table, extras)?);
        }
    }
    tracing::debug!(
        version = %version,
        packages = packages.len(),
        "lock_document_loaded"
    );
    Ok(LockDocument { version, packages })
}

fn parse_package(table: &dyn TableLike, extras: &ExtrasIndex) -> Result<LockedPackage> {
    let raw_name = table
        .get("name")
        .and_then(Item::as_str)
        .context("package entry missing `name`")?;
    let name = canonicalize_name(raw_name);

    let version = match table.get("version").and_then(Item::as_str) {
        Some(text) => Some(
            Version::from_str(text)
                .map_err(|err| anyhow!("invalid version `{text}` for `{name}`: {err}"))?,
        ),
        None => None,
    };

    let mut groups: Vec<String> = table
        .get("groups")
        .and_then(Item::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(Value::as_str)
                .map(canonicalize_name)
                .collect()
        })
        .unwrap_or_default();
    if groups.is_empty() {
        groups.push(DEFAULT_GROUP.to_string());
    }

    let markers = parse_markers(table, &groups);
    let optional = table
        .get("optional")
        .and_then(Item::as_bool)
        .unwrap_or(false);
    let optional_for = if optional {
        extras.extras_for(&name)
    } else {
        Vec::new()
    };
    let develop = table
        .get("develop")
        .and_then(Item::as_bool)
        .unwrap_or(false);
    let origin = parse_origin(table, &name, develop)?;
    let artifacts = parse_artifacts(table);

    Ok(LockedPackage {
        name,
        version,
        groups,
        optional_for,
        markers,
        origin,
        artifacts,
    })
}

/// The lock historically stores markers either as one flat string or as a
/// per-group mapping; both collapse to the same internal map here.
fn parse_markers(table: &dyn TableLike, groups: &[String]) -> IndexMap<String, String> {
    let mut markers = IndexMap::new();
    if let Some(item) = table.get("markers") {
        if let Some(flat) = item.as_str() {
            for group in groups {
                markers.insert(group.clone(), flat.to_string());
            }
        } else if let Some(mapping) = item.as_table_like() {
            for (group, marker) in mapping.iter() {
                if let Some(text) = marker.as_str() {
                    markers.insert(canonicalize_name(group), text.to_string());
                }
            }
        }
    }
    markers
}

fn parse_origin(table: &dyn TableLike, name: &str, develop: bool) -> Result<Origin> {
    let Some(source) = table.get("source").and_then(Item::as_table_like) else {
        return Ok(Origin::Index {
            url: DEFAULT_INDEX_URL.to_string(),
        });
    };
    let field = |key: &str| {
        source
            .get(key)
            .and_then(Item::as_str)
            .map(ToString::to_string)
    };
    let kind = field("type").unwrap_or_default();
    let url = field("url").unwrap_or_default();
    match kind.as_str() {
        "git" | "hg" | "svn" | "bzr" => Ok(Origin::Vcs {
            kind,
            url,
            requested_revision: field("reference"),
            resolved_commit: field("resolved_reference"),
            subdirectory: field("subdirectory"),
        }),
        "directory" => Ok(Origin::Directory {
            path: url,
            editable: develop,
        }),
        "file" => Ok(Origin::Archive {
            location: ArchiveLocation::Path(url),
            subdirectory: field("subdirectory"),
        }),
        "url" => Ok(Origin::Archive {
            location: ArchiveLocation::Url(url),
            subdirectory: field("subdirectory"),
        }),
        "legacy" => Ok(Origin::Index { url }),
        "" => Ok(Origin::Index {
            url: DEFAULT_INDEX_URL.to_string(),
        }),
        other => Err(ExportError::UnknownSourceType {
            package: name.to_string(),
            kind: other.to_string(),
        }
        .into()),
    }
}

fn parse_artifacts(table: &dyn TableLike) -> Vec<Artifact> {
    table
        .get("files")
        .and_then(Item::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(Value::as_inline_table)
                .map(|file| Artifact {
                    filename: file
                        .get("file")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    hash: file
                        .get("hash")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                    url: file
                        .get("url")
                        .and_then(Value::as_str)
                        .map(ToString::to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> LockDocument {
        parse_lock(contents, &ExtrasIndex::default()).expect("parse lock")
    }

    #[test]
    fn reads_version_groups_and_files() {
        let lock = parse(
            r#"[[package]]
name = "Foo_Bar"
version = "1.0"
optional = false
groups = ["main", "dev"]
files = [
    {file = "foo_bar-1.0-py3-none-any.whl", hash = "sha256:abcdef", url = "https://example.org/foo_bar-1.0-py3-none-any.whl"},
    {file = "foo_bar-1.0.tar.gz", hash = "sha256:012345"},
]

[metadata]
lock-version = "2.1"
"#,
        );
        assert_eq!(lock.version, "2.1");
        let package = &lock.packages[0];
        assert_eq!(package.name, "foo-bar");
        assert_eq!(package.version.as_ref().map(ToString::to_string), Some("1.0".to_string()));
        assert_eq!(package.groups, ["main", "dev"]);
        assert_eq!(package.artifacts.len(), 2);
        assert_eq!(
            package.artifacts[0].url.as_deref(),
            Some("https://example.org/foo_bar-1.0-py3-none-any.whl")
        );
        assert!(matches!(&package.origin, Origin::Index { url } if url == DEFAULT_INDEX_URL));
    }

    #[test]
    fn flat_marker_covers_every_group() {
        let lock = parse(
            r#"[[package]]
name = "foo"
version = "1.0"
groups = ["main", "dev"]
markers = "python_version >= \"3.6\""
"#,
        );
        let package = &lock.packages[0];
        assert_eq!(
            package.markers.get("main").map(String::as_str),
            Some("python_version >= \"3.6\"")
        );
        assert_eq!(
            package.markers.get("dev").map(String::as_str),
            Some("python_version >= \"3.6\"")
        );
    }

    #[test]
    fn group_keyed_markers_stay_per_group() {
        let lock = parse(
            r#"[[package]]
name = "foo"
version = "1.0"
groups = ["main", "dev"]
markers = {main = "python_version >= \"3.6\"", dev = "sys_platform == \"linux\""}
"#,
        );
        let package = &lock.packages[0];
        assert_eq!(package.markers.len(), 2);
        assert_eq!(
            package.markers.get("dev").map(String::as_str),
            Some("sys_platform == \"linux\"")
        );
    }

    #[test]
    fn source_tables_map_to_origins() {
        let lock = parse(
            r#"[[package]]
name = "vcs-dep"
version = "1.0"
groups = ["main"]

[package.source]
type = "git"
url = "https://github.com/foo/foo.git"
reference = "main"
resolved_reference = "abcdef"
subdirectory = "pkg"

[[package]]
name = "local-dep"
version = "2.0"
groups = ["main"]
develop = true

[package.source]
type = "directory"
url = "../local-dep"

[[package]]
name = "archive-dep"
version = "3.0"
groups = ["main"]

[package.source]
type = "url"
url = "https://example.org/archive.zip"

[[package]]
name = "mirrored"
version = "4.0"
groups = ["main"]

[package.source]
type = "legacy"
url = "https://mirror.example.org/simple"
reference = "mirror"
"#,
        );
        assert!(matches!(
            &lock.packages[0].origin,
            Origin::Vcs { kind, resolved_commit: Some(commit), subdirectory: Some(sub), .. }
                if kind == "git" && commit == "abcdef" && sub == "pkg"
        ));
        assert!(matches!(
            &lock.packages[1].origin,
            Origin::Directory { editable: true, .. }
        ));
        assert!(matches!(
            &lock.packages[2].origin,
            Origin::Archive { location: ArchiveLocation::Url(_), .. }
        ));
        assert!(matches!(
            &lock.packages[3].origin,
            Origin::Index { url } if url == "https://mirror.example.org/simple"
        ));
    }

    #[test]
    fn unknown_source_types_are_fatal() {
        let err = parse_lock(
            r#"[[package]]
name = "odd"
version = "1.0"

[package.source]
type = "carrier-pigeon"
url = "coop://loft"
"#,
            &ExtrasIndex::default(),
        )
        .expect_err("must fail");
        let domain = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ExportError>())
            .expect("domain error");
        assert!(matches!(domain, ExportError::UnknownSourceType { .. }));
    }

    #[test]
    fn optional_packages_pick_up_their_extras() {
        let mut extras = ExtrasIndex::default();
        extras.insert("databases", vec!["psycopg2-binary".to_string()]);
        let lock = parse_lock(
            r#"[[package]]
name = "psycopg2_binary"
version = "2.9"
optional = true
groups = ["main"]
"#,
            &extras,
        )
        .expect("parse lock");
        assert_eq!(lock.packages[0].optional_for, vec!["databases".to_string()]);
    }
}
