use std::fmt::Write as _;

use crate::lock::{ArchiveLocation, Origin};
use crate::marker::MarkerExpr;
use crate::pythons::PythonConstraint;

use super::selection::FilteredPackage;
use super::ExportContext;

/// Line-oriented requirements output: one pin per selected package, in
/// filtered order, with the marker clause appended when one remains.
pub fn render_requirements(
    constraint: &PythonConstraint,
    packages: &[FilteredPackage],
    ctx: &ExportContext,
) -> String {
    let mut out = String::new();
    for entry in packages {
        let package = &entry.package;
        let pin = match &package.origin {
            Origin::Index { .. } => match &package.version {
                Some(version) => format!("{}=={}", package.name, version),
                None => package.name.clone(),
            },
            Origin::Vcs {
                kind,
                url,
                requested_revision,
                resolved_commit,
                subdirectory,
            } => {
                let mut pin = format!("{} @ {kind}+{url}", package.name);
                if let Some(revision) = resolved_commit
                    .as_deref()
                    .or(requested_revision.as_deref())
                {
                    let _ = write!(pin, "@{revision}");
                }
                if let Some(subdirectory) = subdirectory {
                    let _ = write!(pin, "#subdirectory={subdirectory}");
                }
                pin
            }
            Origin::Directory { path, editable } => {
                let resolved = ctx.resolve_path(path);
                if *editable {
                    format!("-e {resolved}")
                } else {
                    format!("{} @ {resolved}", package.name)
                }
            }
            Origin::Archive { location, .. } => {
                let target = match location {
                    ArchiveLocation::Path(path) => ctx.resolve_path(path),
                    ArchiveLocation::Url(url) => url.clone(),
                };
                format!("{} @ {target}", package.name)
            }
        };

        out.push_str(&pin);
        if let Some(marker) = effective_marker(entry, constraint) {
            out.push_str(" ; ");
            out.push_str(&marker.render());
        }
        out.push('\n');
    }
    out
}

fn effective_marker(
    entry: &FilteredPackage,
    constraint: &PythonConstraint,
) -> Option<MarkerExpr> {
    match (&entry.marker, &constraint.environment) {
        (None, None) => None,
        (Some(marker), None) => Some(marker.clone()),
        (None, Some(environment)) => Some(environment.clone()),
        (Some(marker), Some(environment)) => Some(marker.clone().and(environment.clone())),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use indexmap::IndexMap;
    use pep440_rs::Version;

    use crate::lock::{Artifact, LockedPackage, DEFAULT_GROUP, DEFAULT_INDEX_URL};
    use crate::marker::parse_marker;
    use crate::pythons::{derive_python_constraint, VersionInterval};

    use super::*;

    fn ctx() -> ExportContext {
        ExportContext::new("/project", "/project/dist")
    }

    fn filtered(name: &str, version: Option<&str>, origin: Origin) -> FilteredPackage {
        FilteredPackage {
            package: LockedPackage {
                name: name.to_string(),
                version: version.map(|v| Version::from_str(v).expect("valid version")),
                groups: vec![DEFAULT_GROUP.to_string()],
                optional_for: Vec::new(),
                markers: IndexMap::new(),
                origin,
                artifacts: vec![Artifact {
                    filename: format!("{name}.tar.gz"),
                    hash: Some("sha256:0123456789abcdef".to_string()),
                    url: None,
                }],
            },
            marker: None,
        }
    }

    #[test]
    fn index_packages_pin_by_version() {
        let packages = vec![filtered(
            "foo",
            Some("1.2.3"),
            Origin::Index {
                url: DEFAULT_INDEX_URL.to_string(),
            },
        )];
        let output = render_requirements(&PythonConstraint::default(), &packages, &ctx());
        assert_eq!(output, "foo==1.2.3\n");
    }

    #[test]
    fn vcs_packages_pin_by_commit_and_subdirectory() {
        let packages = vec![filtered(
            "bar",
            Some("2.3"),
            Origin::Vcs {
                kind: "git".to_string(),
                url: "https://github.com/bar/bar.git".to_string(),
                requested_revision: Some("123456".to_string()),
                resolved_commit: Some("abcdef".to_string()),
                subdirectory: Some("subdir".to_string()),
            },
        )];
        let output = render_requirements(&PythonConstraint::default(), &packages, &ctx());
        assert_eq!(
            output,
            "bar @ git+https://github.com/bar/bar.git@abcdef#subdirectory=subdir\n"
        );
    }

    #[test]
    fn editable_directories_use_the_editable_flag() {
        let packages = vec![
            filtered(
                "tooling",
                None,
                Origin::Directory {
                    path: "tooling".to_string(),
                    editable: true,
                },
            ),
            filtered(
                "vendored",
                None,
                Origin::Directory {
                    path: "/project/vendored".to_string(),
                    editable: false,
                },
            ),
        ];
        let output = render_requirements(&PythonConstraint::default(), &packages, &ctx());
        assert_eq!(
            output,
            "-e /project/tooling\nvendored @ /project/vendored\n"
        );
    }

    #[test]
    fn archive_urls_pass_through() {
        let packages = vec![filtered(
            "demo",
            Some("0.1.0"),
            Origin::Archive {
                location: ArchiveLocation::Url(
                    "https://example.org/demo-0.1.0.tar.gz".to_string(),
                ),
                subdirectory: None,
            },
        )];
        let output = render_requirements(&PythonConstraint::default(), &packages, &ctx());
        assert_eq!(output, "demo @ https://example.org/demo-0.1.0.tar.gz\n");
    }

    #[test]
    fn markers_trail_the_pin() {
        let mut entry = filtered(
            "foo",
            Some("1.0"),
            Origin::Index {
                url: DEFAULT_INDEX_URL.to_string(),
            },
        );
        entry.marker = Some(parse_marker("sys_platform == 'linux'").expect("valid marker"));
        let output = render_requirements(&PythonConstraint::default(), &[entry], &ctx());
        assert_eq!(output, "foo==1.0 ; sys_platform == \"linux\"\n");
    }

    #[test]
    fn gap_environment_is_conjoined_into_every_line() {
        let constraint = derive_python_constraint(&[
            VersionInterval {
                lower: Some(Version::from_str("2.7").expect("version")),
                upper: Some(Version::from_str("2.8").expect("version")),
            },
            VersionInterval {
                lower: Some(Version::from_str("3.6").expect("version")),
                upper: None,
            },
        ]);
        let mut entry = filtered(
            "foo",
            Some("1.0"),
            Origin::Index {
                url: DEFAULT_INDEX_URL.to_string(),
            },
        );
        entry.marker = Some(parse_marker("sys_platform == 'linux'").expect("valid marker"));
        let output = render_requirements(&constraint, &[entry], &ctx());
        assert_eq!(
            output,
            "foo==1.0 ; sys_platform == \"linux\" and (python_version == \"2.7\" or python_version >= \"3.6\")\n"
        );
    }

    #[test]
    fn empty_selection_renders_no_lines() {
        let output = render_requirements(&PythonConstraint::default(), &[], &ctx());
        assert_eq!(output, "");
    }
}
