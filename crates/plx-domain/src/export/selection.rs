use std::collections::BTreeSet;

use crate::error::ExportError;
use crate::lock::{canonicalize_name, LockedPackage, DEFAULT_GROUP};
use crate::marker::{parse_marker, simplify, MarkerExpr, Truth};

/// Which dependency groups and optional extras one export call covers.
#[derive(Clone, Debug)]
pub struct ExportSelection {
    pub groups: BTreeSet<String>,
    pub extras: BTreeSet<String>,
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl ExportSelection {
    pub fn new(groups: &[String], extras: &[String]) -> Self {
        let mut canonical_groups: BTreeSet<String> =
            groups.iter().map(|group| canonicalize_name(group)).collect();
        if canonical_groups.is_empty() {
            canonical_groups.insert(DEFAULT_GROUP.to_string());
        }
        let extras = extras.iter().map(|extra| canonicalize_name(extra)).collect();
        Self {
            groups: canonical_groups,
            extras,
        }
    }
}

/// One package that survived filtering, with its simplified marker.
#[derive(Clone, Debug)]
pub struct FilteredPackage {
    pub package: LockedPackage,
    pub marker: Option<MarkerExpr>,
}

/// Stable filter over the locked packages: group membership first, then the
/// marker algebra decides inclusion and the residual marker text.
pub fn select_packages(
    packages: &[LockedPackage],
    selection: &ExportSelection,
) -> Result<Vec<FilteredPackage>, ExportError> {
    let mut selected = Vec::new();
    for package in packages {
        let active_groups: Vec<&String> = package
            .groups
            .iter()
            .filter(|group| selection.groups.contains(*group))
            .collect();
        if active_groups.is_empty() {
            tracing::debug!(package = %package.name, "package_outside_selected_groups");
            continue;
        }
        package.sdist_artifact()?;

        // OR across the selected groups; a group without a marker entry
        // always applies and annihilates the disjunction. A flat lock marker
        // lands on every group, so identical entries count once.
        let mut condition = Truth::Never;
        let mut seen: Vec<Option<&String>> = Vec::new();
        for group in active_groups {
            let text = package.markers.get(group);
            if seen.contains(&text) {
                continue;
            }
            seen.push(text);
            let group_condition = match text {
                None => Truth::Always,
                Some(text) => simplify(&parse_marker(text)?, &selection.extras),
            };
            condition = condition.or(group_condition);
            if condition == Truth::Always {
                break;
            }
        }

        if !package.optional_for.is_empty() {
            let requested = package
                .optional_for
                .iter()
                .any(|extra| selection.extras.contains(extra));
            let gate = if requested { Truth::Always } else { Truth::Never };
            condition = condition.and(gate);
        }

        match condition {
            Truth::Never => {
                tracing::debug!(package = %package.name, "package_marker_never_applies");
            }
            Truth::Always => selected.push(FilteredPackage {
                package: package.clone(),
                marker: None,
            }),
            Truth::Expr(expr) => selected.push(FilteredPackage {
                package: package.clone(),
                marker: Some(expr),
            }),
        }
    }
    Ok(selected)
}
