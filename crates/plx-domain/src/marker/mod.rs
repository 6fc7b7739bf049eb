pub(crate) mod parse;
pub(crate) mod simplify;

pub use parse::parse_marker;
pub use simplify::{simplify, Truth};

/// Boolean expression over PEP 508 environment variables. `and` binds
/// tighter than `or`; comparisons always keep the variable on the left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkerExpr {
    Comparison {
        variable: String,
        op: CompareOp,
        literal: String,
    },
    And(Box<MarkerExpr>, Box<MarkerExpr>),
    Or(Box<MarkerExpr>, Box<MarkerExpr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Compatible,
    In,
    NotIn,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Compatible => "~=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }

    /// The operator that preserves meaning when the two operands swap sides.
    pub(crate) fn mirrored(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Eq),
            Self::Ne => Some(Self::Ne),
            Self::Lt => Some(Self::Gt),
            Self::Le => Some(Self::Ge),
            Self::Gt => Some(Self::Lt),
            Self::Ge => Some(Self::Le),
            Self::Compatible | Self::In | Self::NotIn => None,
        }
    }
}

impl MarkerExpr {
    pub fn comparison(variable: &str, op: CompareOp, literal: &str) -> Self {
        Self::Comparison {
            variable: variable.to_string(),
            op,
            literal: literal.to_string(),
        }
    }

    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Canonical text form, stable under re-parsing.
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_into(self, false, &mut out);
        out
    }
}

fn render_into(expr: &MarkerExpr, under_and: bool, out: &mut String) {
    match expr {
        MarkerExpr::Comparison {
            variable,
            op,
            literal,
        } => {
            out.push_str(variable);
            out.push(' ');
            out.push_str(op.as_str());
            out.push_str(" \"");
            out.push_str(literal);
            out.push('"');
        }
        MarkerExpr::And(left, right) => {
            render_into(left, true, out);
            out.push_str(" and ");
            render_into(right, true, out);
        }
        MarkerExpr::Or(left, right) => {
            // An `or` nested under `and` needs explicit grouping.
            if under_and {
                out.push('(');
            }
            render_into(left, false, out);
            out.push_str(" or ");
            render_into(right, false, out);
            if under_and {
                out.push(')');
            }
        }
    }
}
