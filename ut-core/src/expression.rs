//! Expression descriptors
//!
//! An assertion needs two things from its expression: whether it held, and a
//! human readable rendering of the operands for diagnostics. The builders in
//! this module evaluate their operands exactly once, up front, and keep the
//! rendered text in an [`Expression`].

use std::fmt::{self, Debug};
use std::ops::Not;
use serde::Serialize;

/// Comparison operator of a binary expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn symbol(self) -> &'static str {
        match self {
            Connective::And => "&&",
            Connective::Or => "||",
        }
    }
}

/// Rendered form of an evaluated expression
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    /// A plain boolean
    Value { value: String },

    /// `lhs op rhs`
    Binary {
        lhs: String,
        op: Operator,
        rhs: String,
    },

    /// `|lhs - rhs| <= epsilon`
    Approx {
        lhs: String,
        rhs: String,
        epsilon: String,
    },

    Not { inner: Box<Expression> },

    Logical {
        lhs: Box<Expression>,
        op: Connective,
        rhs: Box<Expression>,
    },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value { value } => write!(f, "{}", value),
            Expression::Binary { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
            Expression::Approx { lhs, rhs, epsilon } => {
                write!(f, "{} ~ {} (epsilon {})", lhs, rhs, epsilon)
            }
            Expression::Not { inner } => write!(f, "!({})", inner),
            Expression::Logical { lhs, op, rhs } => {
                write!(f, "({}) {} ({})", lhs, op.symbol(), rhs)
            }
        }
    }
}

/// Outcome of an expression together with its rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub passed: bool,
    pub expression: Expression,
}

impl Evaluated {
    pub fn new(passed: bool, expression: Expression) -> Self {
        Self { passed, expression }
    }

    /// Both sides were already evaluated; no short-circuiting happens here.
    pub fn and(self, other: Evaluated) -> Evaluated {
        Evaluated {
            passed: self.passed && other.passed,
            expression: Expression::Logical {
                lhs: Box::new(self.expression),
                op: Connective::And,
                rhs: Box::new(other.expression),
            },
        }
    }

    pub fn or(self, other: Evaluated) -> Evaluated {
        Evaluated {
            passed: self.passed || other.passed,
            expression: Expression::Logical {
                lhs: Box::new(self.expression),
                op: Connective::Or,
                rhs: Box::new(other.expression),
            },
        }
    }
}

impl Not for Evaluated {
    type Output = Evaluated;

    fn not(self) -> Evaluated {
        Evaluated {
            passed: !self.passed,
            expression: Expression::Not {
                inner: Box::new(self.expression),
            },
        }
    }
}

impl From<bool> for Evaluated {
    fn from(value: bool) -> Self {
        that(value)
    }
}

pub fn that(value: bool) -> Evaluated {
    Evaluated::new(
        value,
        Expression::Value {
            value: value.to_string(),
        },
    )
}

fn binary<L: Debug, R: Debug>(passed: bool, lhs: &L, op: Operator, rhs: &R) -> Evaluated {
    Evaluated::new(
        passed,
        Expression::Binary {
            lhs: format!("{:?}", lhs),
            op,
            rhs: format!("{:?}", rhs),
        },
    )
}

pub fn eq<L, R>(lhs: L, rhs: R) -> Evaluated
where
    L: PartialEq<R> + Debug,
    R: Debug,
{
    binary(lhs == rhs, &lhs, Operator::Eq, &rhs)
}

pub fn ne<L, R>(lhs: L, rhs: R) -> Evaluated
where
    L: PartialEq<R> + Debug,
    R: Debug,
{
    binary(lhs != rhs, &lhs, Operator::Ne, &rhs)
}

pub fn lt<L, R>(lhs: L, rhs: R) -> Evaluated
where
    L: PartialOrd<R> + Debug,
    R: Debug,
{
    binary(lhs < rhs, &lhs, Operator::Lt, &rhs)
}

pub fn le<L, R>(lhs: L, rhs: R) -> Evaluated
where
    L: PartialOrd<R> + Debug,
    R: Debug,
{
    binary(lhs <= rhs, &lhs, Operator::Le, &rhs)
}

pub fn gt<L, R>(lhs: L, rhs: R) -> Evaluated
where
    L: PartialOrd<R> + Debug,
    R: Debug,
{
    binary(lhs > rhs, &lhs, Operator::Gt, &rhs)
}

pub fn ge<L, R>(lhs: L, rhs: R) -> Evaluated
where
    L: PartialOrd<R> + Debug,
    R: Debug,
{
    binary(lhs >= rhs, &lhs, Operator::Ge, &rhs)
}

pub fn approx(lhs: f64, rhs: f64, epsilon: f64) -> Evaluated {
    Evaluated::new(
        (lhs - rhs).abs() <= epsilon,
        Expression::Approx {
            lhs: format!("{:?}", lhs),
            rhs: format!("{:?}", rhs),
            epsilon: format!("{:?}", epsilon),
        },
    )
}
