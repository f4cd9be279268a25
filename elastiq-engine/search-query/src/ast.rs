use std::fmt;

use serde::Deserialize;

use crate::error::QueryError;
use crate::value::Value;

/// A comparison operator between a property and a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

/// The string matching operators.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringOpKind {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringOpKind {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
        }
    }

    fn from_method(method: &str) -> Option<Self> {
        match method.to_ascii_lowercase().as_str() {
            "contains" => Some(Self::Contains),
            "startswith" | "starts_with" => Some(Self::StartsWith),
            "endswith" | "ends_with" => Some(Self::EndsWith),
            _ => None,
        }
    }
}

/// A boolean predicate over the properties of a document.
///
/// Predicates are produced by a query front end and are never mutated,
/// the translator only ever borrows them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// `property <op> value`
    Comparison {
        property: String,
        op: ComparisonOp,
        value: Value,
    },

    /// `left && right` or `left || right`
    Logical {
        op: LogicalOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },

    /// `!operand`
    Not { operand: Box<Predicate> },

    /// `property.Contains(pattern)` and friends.
    StringOp {
        #[serde(rename = "method")]
        op: StringOpKind,
        property: String,
        pattern: String,
    },

    /// `candidates.Contains(property)`
    Membership {
        property: String,
        #[serde(default)]
        candidates: Vec<Value>,
    },

    /// A bare boolean property, equivalent to `property == true`.
    Property { property: String },

    /// A literal evaluated on the caller's side.
    Constant { value: Value },

    /// `(operand) == value` where value is a boolean literal.
    BoolComparison {
        operand: Box<Predicate>,
        op: ComparisonOp,
        value: bool,
    },

    /// A method call the front end could not classify.
    Call {
        method: String,
        property: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// The outcome of folding the literals out of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Normalized {
    /// The predicate holds for every document.
    Always,

    /// The predicate holds for no document.
    Never,

    /// A predicate that has to be evaluated by the backend.
    Expr(Predicate),
}

impl Normalized {
    fn negate(self) -> Self {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Expr(Predicate::Not { operand }) => Self::Expr(*operand),
            Self::Expr(expr) => Self::Expr(expr.not()),
        }
    }
}

impl Predicate {
    pub fn comparison(property: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self::Comparison {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(property, ComparisonOp::Eq, value)
    }

    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(property, ComparisonOp::Ne, value)
    }

    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(property, ComparisonOp::Gt, value)
    }

    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(property, ComparisonOp::Ge, value)
    }

    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(property, ComparisonOp::Lt, value)
    }

    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::comparison(property, ComparisonOp::Le, value)
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Self::eq(property, Value::Null)
    }

    pub fn is_not_null(property: impl Into<String>) -> Self {
        Self::ne(property, Value::Null)
    }

    pub fn property(property: impl Into<String>) -> Self {
        Self::Property {
            property: property.into(),
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant {
            value: value.into(),
        }
    }

    pub fn contains(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::string_op(StringOpKind::Contains, property, pattern)
    }

    pub fn starts_with(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::string_op(StringOpKind::StartsWith, property, pattern)
    }

    pub fn ends_with(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::string_op(StringOpKind::EndsWith, property, pattern)
    }

    fn string_op(
        op: StringOpKind,
        property: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Self {
        Self::StringOp {
            op,
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        property: impl Into<String>,
        candidates: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Membership {
            property: property.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Self::Logical {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        Self::Logical {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not {
            operand: Box::new(self),
        }
    }

    /// `(self) == value`
    pub fn equals(self, value: bool) -> Self {
        Self::BoolComparison {
            operand: Box::new(self),
            op: ComparisonOp::Eq,
            value,
        }
    }

    /// Folds literals, redundant boolean comparisons and double negations
    /// out of the tree and classifies any raw method calls.
    pub(crate) fn normalize(&self) -> Result<Normalized, QueryError> {
        let normalized = match self {
            Self::Constant { value: Value::Bool(true) } => Normalized::Always,
            Self::Constant { value: Value::Bool(false) } => Normalized::Never,
            Self::Constant { value } => {
                return Err(QueryError::unsupported(format!(
                    "{} (a {} constant used as a condition)",
                    value,
                    value.kind_name()
                )))
            },
            Self::Logical { op, left, right } => {
                let left = left.normalize()?;
                let right = right.normalize()?;

                match (op, left, right) {
                    (LogicalOp::And, Normalized::Never, _) => Normalized::Never,
                    (LogicalOp::And, _, Normalized::Never) => Normalized::Never,
                    (LogicalOp::And, Normalized::Always, other) => other,
                    (LogicalOp::And, other, Normalized::Always) => other,
                    (LogicalOp::Or, Normalized::Always, _) => Normalized::Always,
                    (LogicalOp::Or, _, Normalized::Always) => Normalized::Always,
                    (LogicalOp::Or, Normalized::Never, other) => other,
                    (LogicalOp::Or, other, Normalized::Never) => other,
                    (op, Normalized::Expr(left), Normalized::Expr(right)) => {
                        Normalized::Expr(Self::Logical {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        })
                    },
                }
            },
            Self::Not { operand } => operand.normalize()?.negate(),
            Self::BoolComparison { operand, op, value } => {
                let keep = match (op, value) {
                    (ComparisonOp::Eq, true) | (ComparisonOp::Ne, false) => true,
                    (ComparisonOp::Eq, false) | (ComparisonOp::Ne, true) => false,
                    _ => return Err(QueryError::unsupported(self)),
                };

                let operand = operand.normalize()?;
                if keep {
                    operand
                } else {
                    operand.negate()
                }
            },
            Self::Call {
                method,
                property,
                args,
            } => match (StringOpKind::from_method(method), args.as_slice()) {
                (Some(op), [Value::Text(pattern)]) => {
                    Normalized::Expr(Self::string_op(op, property.as_str(), pattern.as_str()))
                },
                _ => return Err(QueryError::unsupported(self)),
            },
            other => Normalized::Expr(other.clone()),
        };

        Ok(normalized)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison {
                property,
                op,
                value,
            } => write!(f, "{} {} {}", property, op.as_str(), value),
            Self::Logical { op, left, right } => {
                let op = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "({} {} {})", left, op, right)
            },
            Self::Not { operand } => write!(f, "!{}", operand),
            Self::StringOp {
                op,
                property,
                pattern,
            } => write!(f, "{}.{}({:?})", property, op.method_name(), pattern),
            Self::Membership {
                property,
                candidates,
            } => {
                write!(f, "[")?;
                for (i, candidate) in candidates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", candidate)?;
                }
                write!(f, "].Contains({})", property)
            },
            Self::Property { property } => f.write_str(property),
            Self::Constant { value } => write!(f, "{}", value),
            Self::BoolComparison { operand, op, value } => {
                write!(f, "({}) {} {}", operand, op.as_str(), value)
            },
            Self::Call {
                method,
                property,
                args,
            } => {
                write!(f, "{}.{}(", property, method)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            },
        }
    }
}
