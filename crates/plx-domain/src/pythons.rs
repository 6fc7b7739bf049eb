use std::cmp::Ordering;
use std::str::FromStr;

use pep440_rs::Version;

use crate::marker::{CompareOp, MarkerExpr};

/// Half-open interval `[lower, upper)` of supported interpreter versions.
/// `None` bounds are unbounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionInterval {
    pub lower: Option<Version>,
    pub upper: Option<Version>,
}

impl VersionInterval {
    pub fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    pub fn is_universal(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

/// What the declared python support turns into on output: a single
/// requires-python range, or one environment marker covering a gappy union.
#[derive(Clone, Debug, Default)]
pub struct PythonConstraint {
    pub requires_python: Option<String>,
    pub environment: Option<MarkerExpr>,
}

pub fn derive_python_constraint(intervals: &[VersionInterval]) -> PythonConstraint {
    if intervals.is_empty() || intervals.iter().any(VersionInterval::is_universal) {
        return PythonConstraint::default();
    }

    let mut ordered = intervals.to_vec();
    ordered.sort_by(|a, b| compare_lower(a.lower.as_ref(), b.lower.as_ref()));

    if let [interval] = ordered.as_slice() {
        return PythonConstraint {
            requires_python: requires_range(interval),
            environment: None,
        };
    }

    let mut environment: Option<MarkerExpr> = None;
    for interval in &ordered {
        let clause = interval_marker(interval);
        environment = Some(match environment {
            Some(chain) => chain.or(clause),
            None => clause,
        });
    }
    PythonConstraint {
        requires_python: None,
        environment,
    }
}

fn compare_lower(a: Option<&Version>, b: Option<&Version>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => left.cmp(right),
    }
}

fn requires_range(interval: &VersionInterval) -> Option<String> {
    match (&interval.lower, &interval.upper) {
        (None, None) => None,
        (Some(lower), None) => Some(format!(">={lower}")),
        (None, Some(upper)) => Some(format!("<{upper}")),
        (Some(lower), Some(upper)) => Some(format!(">={lower},<{upper}")),
    }
}

fn interval_marker(interval: &VersionInterval) -> MarkerExpr {
    match (&interval.lower, &interval.upper) {
        (Some(lower), None) => {
            MarkerExpr::comparison("python_version", CompareOp::Ge, &lower.to_string())
        }
        (None, Some(upper)) => {
            MarkerExpr::comparison("python_version", CompareOp::Lt, &upper.to_string())
        }
        (Some(lower), Some(upper)) => {
            if let Some((minor_text, next)) = single_minor(lower) {
                if next == *upper {
                    return MarkerExpr::comparison("python_version", CompareOp::Eq, &minor_text);
                }
            }
            MarkerExpr::comparison("python_version", CompareOp::Ge, &lower.to_string()).and(
                MarkerExpr::comparison("python_version", CompareOp::Lt, &upper.to_string()),
            )
        }
        // Universal intervals are filtered out before marker derivation.
        (None, None) => MarkerExpr::comparison("python_version", CompareOp::Ge, "0"),
    }
}

/// For a plain `X.Y` release, the `X.Y` text plus the start of the next
/// minor. An interval that spans exactly one minor renders as equality.
fn single_minor(version: &Version) -> Option<(String, Version)> {
    let text = version.to_string();
    let mut parts = Vec::new();
    for part in text.split('.') {
        parts.push(part.parse::<u64>().ok()?);
    }
    if parts.len() < 2 || parts.iter().skip(2).any(|&p| p != 0) {
        return None;
    }
    let minor_text = format!("{}.{}", parts[0], parts[1]);
    let next = Version::from_str(&format!("{}.{}", parts[0], parts[1] + 1)).ok()?;
    Some((minor_text, next))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(text: &str) -> Version {
        Version::from_str(text).expect("valid version")
    }

    fn interval(lower: Option<&str>, upper: Option<&str>) -> VersionInterval {
        VersionInterval {
            lower: lower.map(version),
            upper: upper.map(version),
        }
    }

    #[test]
    fn unconstrained_support_yields_nothing() {
        let constraint = derive_python_constraint(&[VersionInterval::unbounded()]);
        assert_eq!(constraint.requires_python, None);
        assert!(constraint.environment.is_none());
    }

    #[test]
    fn open_ended_interval_becomes_requires_python() {
        let constraint = derive_python_constraint(&[interval(Some("3.9"), None)]);
        assert_eq!(constraint.requires_python.as_deref(), Some(">=3.9"));
        assert!(constraint.environment.is_none());
    }

    #[test]
    fn bounded_interval_becomes_requires_python_pair() {
        let constraint = derive_python_constraint(&[interval(Some("3.9"), Some("4.0"))]);
        assert_eq!(constraint.requires_python.as_deref(), Some(">=3.9,<4.0"));
        assert!(constraint.environment.is_none());
    }

    #[test]
    fn gappy_union_becomes_environment_marker() {
        let constraint = derive_python_constraint(&[
            interval(Some("3.6"), Some("4.0")),
            interval(Some("2.7"), Some("2.8")),
        ]);
        assert_eq!(constraint.requires_python, None);
        let environment = constraint.environment.expect("environment marker");
        assert_eq!(
            environment.render(),
            "python_version == \"2.7\" or python_version >= \"3.6\" and python_version < \"4.0\""
        );
    }

    #[test]
    fn intervals_are_ordered_by_ascending_lower_bound() {
        let constraint = derive_python_constraint(&[
            interval(Some("3.10"), None),
            interval(Some("2.7"), Some("2.8")),
        ]);
        let environment = constraint.environment.expect("environment marker");
        assert_eq!(
            environment.render(),
            "python_version == \"2.7\" or python_version >= \"3.10\""
        );
    }

    #[test]
    fn one_minor_interval_renders_as_equality() {
        let constraint = derive_python_constraint(&[
            interval(Some("2.7"), Some("2.8")),
            interval(Some("3.9.1"), Some("3.10")),
        ]);
        let environment = constraint.environment.expect("environment marker");
        // 3.9.1 does not start at the minor boundary, so no equality there.
        assert_eq!(
            environment.render(),
            "python_version == \"2.7\" or python_version >= \"3.9.1\" and python_version < \"3.10\""
        );
    }
}
