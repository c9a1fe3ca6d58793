//! The JSONPath abstract syntax tree.
//!
//! A complete expression — including any filter sub-expressions — is
//! parsed into this tree exactly once; [`super::eval`] then walks the
//! tree once per candidate node instead of re-parsing filter text for
//! every element.

use crate::value::Value;

/// One step in a compiled path, applied in sequence to a working set of
/// candidate nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name` or `['name']`
    Child(String),
    /// `.*` or `[*]`
    Wildcard,
    /// `[i1,i2,...]` (a single index is the one-element case)
    Indices(Vec<i64>),
    /// `['a','b',...]`
    Keys(Vec<String>),
    /// `[start:end:step]`
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: i64,
    },
    /// `[?(expr)]`
    Filter(FilterExpr),
    /// `..` followed by the selector it applies to the descendant set.
    RecursiveDescent(Box<Step>),
}

/// A compiled filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare(CompareOp, FilterTerm, FilterTerm),
    /// A bare `@....` traversal with no comparator: truthy iff it yields a
    /// non-null, non-false value.
    Truthy(FilterTerm),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One operand of a comparison or a bare truthy test.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTerm {
    Literal(Value),
    /// `@` followed by a chain of single-valued traversal steps.
    Current(Vec<CurrentStep>),
    /// `@..`: recognized at parse time but not evaluated. Strict evaluation
    /// rejects it; lenient evaluation treats it as `false`.
    UnsupportedRecursive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurrentStep {
    Name(String),
    Index(i64),
}

/// A fully compiled expression: the root is always implicit `$`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    pub steps: Vec<Step>,
}
