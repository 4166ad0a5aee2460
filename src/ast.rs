//! The AST of a JMESPath expression.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use crate::value::Value;

/// A node of a parsed expression.
///
/// Nodes are produced by the parser and are read-only thereafter. The
/// `Expref` child is reference-counted so that an expression-reference
/// value can share the subtree with the cached AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// `@`, the current value.
    Identity,
    /// `$`, the root of the evaluated document.
    Root,
    /// Identifier lookup, like `foo` or `"foo bar"`.
    Field { name: String },
    /// Array index, like `[0]` or `[-1]`.
    Index { index: i64 },
    /// A literal value: `` `…` `` or a raw string `'…'`.
    Literal { value: Value },
    /// `lhs.rhs`: `rhs` is evaluated against the result of `lhs`.
    Subexpression { lhs: Box<Ast>, rhs: Box<Ast> },
    /// A comparison, like `a == b` or `a < b`.
    Comparison {
        op: Comparator,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    /// `lhs && rhs`.
    And { lhs: Box<Ast>, rhs: Box<Ast> },
    /// `lhs || rhs`.
    Or { lhs: Box<Ast>, rhs: Box<Ast> },
    /// `!expr`.
    Not { expr: Box<Ast> },
    /// `lhs | rhs`: feeds the materialized result of `lhs` to `rhs`.
    Pipe { lhs: Box<Ast>, rhs: Box<Ast> },
    /// `expr[]`: flattens one level of nested arrays.
    Flatten { expr: Box<Ast> },
    /// `lhs[*].rhs`: applies `rhs` to each element of the array `lhs`.
    Projection { lhs: Box<Ast>, rhs: Box<Ast> },
    /// `lhs.*.rhs`: applies `rhs` to each member value of the object `lhs`.
    ObjectProjection { lhs: Box<Ast>, rhs: Box<Ast> },
    /// `lhs[start:stop:step].rhs`.
    SliceProjection {
        lhs: Box<Ast>,
        slice: Slice,
        rhs: Box<Ast>,
    },
    /// `lhs[?predicate].rhs`.
    FilterProjection {
        lhs: Box<Ast>,
        predicate: Box<Ast>,
        rhs: Box<Ast>,
    },
    /// `[a, b, …]` evaluated against the current value.
    MultiSelectList { elements: Vec<Ast> },
    /// `{k: a, …}` evaluated against the current value, in declared order.
    MultiSelectHash { entries: Vec<(String, Ast)> },
    /// A function call, like `length(@)`.
    Function { name: String, args: Vec<Ast> },
    /// `&expr`, an unevaluated expression reference.
    Expref { expr: Arc<Ast> },
}

/// The `start:stop:step` triple of a slice. Missing bounds default by the
/// sign of the step at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Ast {
    pub(crate) fn subexpression(lhs: Ast, rhs: Ast) -> Self {
        Ast::Subexpression {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub(crate) fn projection(lhs: Ast, rhs: Ast) -> Self {
        Ast::Projection {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub(crate) fn object_projection(lhs: Ast, rhs: Ast) -> Self {
        Ast::ObjectProjection {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

fn write_opt(f: &mut Formatter<'_>, v: Option<i64>) -> fmt::Result {
    match v {
        Some(v) => write!(f, "{v}"),
        None => Ok(()),
    }
}

impl Display for Ast {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Identity => write!(f, "@"),
            Ast::Root => write!(f, "$"),
            Ast::Field { name } => write!(f, "{name}"),
            Ast::Index { index } => write!(f, "[{index}]"),
            Ast::Literal { value } => write!(f, "`{value}`"),
            Ast::Subexpression { lhs, rhs } => write!(f, "{lhs}.{rhs}"),
            Ast::Comparison { op, lhs, rhs } => write!(f, "({lhs} {op} {rhs})"),
            Ast::And { lhs, rhs } => write!(f, "({lhs} && {rhs})"),
            Ast::Or { lhs, rhs } => write!(f, "({lhs} || {rhs})"),
            Ast::Not { expr } => write!(f, "!({expr})"),
            Ast::Pipe { lhs, rhs } => write!(f, "({lhs} | {rhs})"),
            Ast::Flatten { expr } => write!(f, "{expr}[]"),
            Ast::Projection { lhs, rhs } => write!(f, "{lhs}[*].{rhs}"),
            Ast::ObjectProjection { lhs, rhs } => write!(f, "{lhs}.*.{rhs}"),
            Ast::SliceProjection { lhs, slice, rhs } => {
                write!(f, "{lhs}[")?;
                write_opt(f, slice.start)?;
                write!(f, ":")?;
                write_opt(f, slice.stop)?;
                write!(f, ":")?;
                write_opt(f, slice.step)?;
                write!(f, "].{rhs}")
            }
            Ast::FilterProjection {
                lhs,
                predicate,
                rhs,
            } => write!(f, "{lhs}[?{predicate}].{rhs}"),
            Ast::MultiSelectList { elements } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Ast::MultiSelectHash { entries } => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Ast::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Ast::Expref { expr } => write!(f, "&{expr}"),
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}
