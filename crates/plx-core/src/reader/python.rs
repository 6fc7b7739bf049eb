use std::str::FromStr;

use anyhow::{anyhow, Result};
use pep440_rs::Version;
use plx_domain::VersionInterval;

/// Parses a poetry-style python support declaration (`^3.9`, `~2.7`,
/// `>=3.9,<4.0`, `*`, and `||` unions of those) into the normalized,
/// non-overlapping interval set the constraint deriver consumes.
pub fn parse_python_intervals(text: &str) -> Result<Vec<VersionInterval>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return Ok(vec![VersionInterval::unbounded()]);
    }
    let mut intervals = Vec::new();
    for branch in trimmed.split("||") {
        if let Some(interval) = parse_branch(branch.trim())? {
            intervals.push(interval);
        }
    }
    if intervals.is_empty() {
        return Err(anyhow!("python support `{text}` matches no version at all"));
    }
    Ok(merge_intervals(intervals))
}

fn parse_branch(branch: &str) -> Result<Option<VersionInterval>> {
    let mut lower: Option<Version> = None;
    let mut upper: Option<Version> = None;
    for constraint in branch.split(',') {
        let constraint = constraint.trim();
        if constraint.is_empty() || constraint == "*" {
            continue;
        }
        let (low, high) = parse_constraint(constraint)?;
        if let Some(low) = low {
            lower = Some(match lower {
                Some(existing) if existing >= low => existing,
                _ => low,
            });
        }
        if let Some(high) = high {
            upper = Some(match upper {
                Some(existing) if existing <= high => existing,
                _ => high,
            });
        }
    }
    if let (Some(low), Some(high)) = (&lower, &upper) {
        if low >= high {
            return Ok(None);
        }
    }
    Ok(Some(VersionInterval { lower, upper }))
}

fn parse_constraint(text: &str) -> Result<(Option<Version>, Option<Version>)> {
    if let Some(rest) = text.strip_prefix('^') {
        let parts = release_parts(rest)?;
        return Ok((Some(parse_version(rest)?), Some(caret_upper(&parts)?)));
    }
    if let Some(rest) = text.strip_prefix("~=") {
        let parts = release_parts(rest)?;
        return Ok((Some(parse_version(rest)?), Some(compatible_upper(&parts)?)));
    }
    if let Some(rest) = text.strip_prefix('~') {
        let parts = release_parts(rest)?;
        return Ok((Some(parse_version(rest)?), Some(tilde_upper(&parts)?)));
    }
    if let Some(rest) = text.strip_prefix(">=") {
        return Ok((Some(parse_version(rest)?), None));
    }
    // A strictly-greater lower bound is widened to inclusive; the derived
    // requires-python range is conservative rather than wrong.
    if let Some(rest) = text.strip_prefix('>') {
        return Ok((Some(parse_version(rest)?), None));
    }
    if let Some(rest) = text.strip_prefix("<=") {
        let parts = release_parts(rest)?;
        return Ok((None, Some(bump_last(&parts)?)));
    }
    if let Some(rest) = text.strip_prefix('<') {
        return Ok((None, Some(parse_version(rest)?)));
    }
    if let Some(rest) = text.strip_prefix("==") {
        let parts = release_parts(rest)?;
        return Ok((Some(parse_version(rest)?), Some(bump_last(&parts)?)));
    }
    // A bare version means "that release series": 3.9 covers 3.9.*.
    let parts = release_parts(text)?;
    Ok((Some(parse_version(text)?), Some(bump_last(&parts)?)))
}

fn release_parts(text: &str) -> Result<Vec<u64>> {
    let cleaned = text.trim().trim_end_matches(".*");
    let mut parts = Vec::new();
    for part in cleaned.split('.') {
        parts.push(
            part.parse::<u64>()
                .map_err(|_| anyhow!("invalid python version `{text}`"))?,
        );
    }
    if parts.is_empty() {
        return Err(anyhow!("invalid python version `{text}`"));
    }
    Ok(parts)
}

fn parse_version(text: &str) -> Result<Version> {
    let cleaned = text.trim().trim_end_matches(".*");
    Version::from_str(cleaned).map_err(|err| anyhow!("invalid python version `{text}`: {err}"))
}

fn version_from_parts(parts: &[u64]) -> Result<Version> {
    let text = parts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".");
    Version::from_str(&text).map_err(|err| anyhow!("invalid python version `{text}`: {err}"))
}

fn caret_upper(parts: &[u64]) -> Result<Version> {
    // ^X bumps the leftmost non-zero component and zeroes the rest, keeping
    // the declared precision (`^3.6` caps at 4.0, not 4).
    for (idx, &part) in parts.iter().enumerate() {
        if part != 0 {
            let mut bumped = vec![0; parts.len()];
            bumped[..idx].copy_from_slice(&parts[..idx]);
            bumped[idx] = part + 1;
            return version_from_parts(&bumped);
        }
    }
    bump_last(parts)
}

fn tilde_upper(parts: &[u64]) -> Result<Version> {
    if parts.len() >= 2 {
        version_from_parts(&[parts[0], parts[1] + 1])
    } else {
        version_from_parts(&[parts[0] + 1])
    }
}

fn compatible_upper(parts: &[u64]) -> Result<Version> {
    if parts.len() < 2 {
        return Err(anyhow!("`~=` requires at least two version components"));
    }
    bump_last(&parts[..parts.len() - 1])
}

fn bump_last(parts: &[u64]) -> Result<Version> {
    let Some((last, head)) = parts.split_last() else {
        return Err(anyhow!("empty version release"));
    };
    let mut bumped = head.to_vec();
    bumped.push(last + 1);
    version_from_parts(&bumped)
}

fn merge_intervals(mut intervals: Vec<VersionInterval>) -> Vec<VersionInterval> {
    intervals.sort_by(|a, b| match (&a.lower, &b.lower) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(left), Some(right)) => left.cmp(right),
    });

    let mut merged: Vec<VersionInterval> = Vec::new();
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            let touches = match (&last.upper, &interval.lower) {
                (None, _) | (_, None) => true,
                (Some(upper), Some(lower)) => lower <= upper,
            };
            if touches {
                last.upper = match (&last.upper, &interval.upper) {
                    (None, _) | (_, None) => None,
                    (Some(a), Some(b)) => Some(a.max(b).clone()),
                };
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}
