//! FHIRPath abstract syntax tree

use rust_decimal::Decimal;
use std::fmt;

/// A parsed FHIRPath expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Member navigation from the focus (`name`, `Patient`)
    Identifier(String),
    /// Environment variable (`%resource`)
    Variable(String),
    /// `$this`
    This,
    /// Member navigation from a target (`name.given`)
    Member {
        target: Box<Expression>,
        name: String,
    },
    /// Function invocation, on the focus when `target` is `None`
    Function {
        target: Option<Box<Expression>>,
        name: String,
        args: Vec<Expression>,
    },
    /// Indexer (`name[0]`)
    Indexer {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    /// Unary polarity operator
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// Binary operator
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `is` / `as` type operator
    TypeOperation {
        op: TypeOp,
        operand: Box<Expression>,
        type_name: String,
    },
}

impl Expression {
    /// Create a binary expression
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a member navigation
    pub fn member(target: Expression, name: impl Into<String>) -> Self {
        Self::Member {
            target: Box::new(target),
            name: name.into(),
        }
    }

    /// Dotted type name spelled by an identifier chain (`FHIR.Quantity`)
    pub fn as_type_name(&self) -> Option<String> {
        match self {
            Expression::Identifier(name) => Some(name.clone()),
            Expression::Member { target, name } => {
                target.as_type_name().map(|prefix| format!("{prefix}.{name}"))
            }
            _ => None,
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `{}`
    Empty,
    Boolean(bool),
    String(String),
    Integer(i64),
    Decimal(Decimal),
    /// `@2020-01-01`, `@2020-01-01T10:00:00Z`, `@T10:00`
    DateTime(String),
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Div,
    Mod,
    Add,
    Subtract,
    Concatenate,
    Union,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    In,
    Contains,
    And,
    Or,
    Xor,
    Implies,
}

impl BinaryOp {
    /// Operator as written in FHIRPath
    pub const fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Concatenate => "&",
            BinaryOp::Union => "|",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Equivalent => "~",
            BinaryOp::NotEquivalent => "!~",
            BinaryOp::In => "in",
            BinaryOp::Contains => "contains",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Implies => "implies",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Type operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOp {
    Is,
    As,
}
