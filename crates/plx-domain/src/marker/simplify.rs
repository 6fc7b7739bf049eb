use std::collections::BTreeSet;

use crate::lock::canonicalize_name;

use super::{CompareOp, MarkerExpr};

/// Simplification outcome: universal truth (no marker emitted), universal
/// falsehood (package dropped), or a residual expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Truth {
    Always,
    Never,
    Expr(MarkerExpr),
}

impl Truth {
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Never, _) | (_, Self::Never) => Self::Never,
            (Self::Always, other) | (other, Self::Always) => other,
            (Self::Expr(left), Self::Expr(right)) => Self::Expr(left.and(right)),
        }
    }

    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (Self::Never, other) | (other, Self::Never) => other,
            (Self::Expr(left), Self::Expr(right)) => Self::Expr(left.or(right)),
        }
    }

    pub fn into_expr(self) -> Option<MarkerExpr> {
        match self {
            Self::Expr(expr) => Some(expr),
            Self::Always | Self::Never => None,
        }
    }
}

/// Bottom-up constant folding. Each `extra` comparison is resolved against
/// the requested-extras set before `and`/`or` folding, so a clause gated on
/// an inactive extra collapses and drops out of an enclosing `or`.
pub fn simplify(expr: &MarkerExpr, requested_extras: &BTreeSet<String>) -> Truth {
    match expr {
        MarkerExpr::Comparison {
            variable,
            op,
            literal,
        } if variable == "extra" => {
            let active = requested_extras.contains(&canonicalize_name(literal));
            match op {
                CompareOp::Eq => {
                    if active {
                        Truth::Always
                    } else {
                        Truth::Never
                    }
                }
                CompareOp::Ne => {
                    if active {
                        Truth::Never
                    } else {
                        Truth::Always
                    }
                }
                _ => Truth::Expr(expr.clone()),
            }
        }
        MarkerExpr::Comparison { .. } => Truth::Expr(expr.clone()),
        MarkerExpr::And(left, right) => {
            simplify(left, requested_extras).and(simplify(right, requested_extras))
        }
        MarkerExpr::Or(left, right) => {
            simplify(left, requested_extras).or(simplify(right, requested_extras))
        }
    }
}
