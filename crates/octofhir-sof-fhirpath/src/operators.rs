//! FHIRPath operator semantics
//!
//! Operators take fully evaluated operand collections. Empty operands
//! propagate as an empty result, except for the boolean operators which
//! follow three-valued logic.

use crate::ast::BinaryOp;
use crate::error::{PathError, PathResult};
use crate::node::Node;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::str::FromStr;

/// Apply a binary operator to evaluated operands
pub(crate) fn binary<'a>(
    op: BinaryOp,
    left: Vec<Node<'a>>,
    right: Vec<Node<'a>>,
) -> PathResult<Vec<Node<'a>>> {
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::Implies => {
            let l = to_boolean(&left, op.symbol())?;
            let r = to_boolean(&right, op.symbol())?;
            Ok(from_boolean(logic(op, l, r)))
        }
        BinaryOp::Union => Ok(union(left, right)),
        BinaryOp::Equal => Ok(from_boolean(equal(&left, &right))),
        BinaryOp::NotEqual => Ok(from_boolean(equal(&left, &right).map(|eq| !eq))),
        BinaryOp::Equivalent => Ok(vec![Node::boolean(equivalent(&left, &right))]),
        BinaryOp::NotEquivalent => Ok(vec![Node::boolean(!equivalent(&left, &right))]),
        BinaryOp::In => membership(op, &left, &right),
        BinaryOp::Contains => membership(op, &right, &left),
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            compare(op, &left, &right)
        }
        BinaryOp::Concatenate => {
            let l = concat_operand(&left)?;
            let r = concat_operand(&right)?;
            Ok(vec![Node::string(format!("{}{}", l, r))])
        }
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Div
        | BinaryOp::Mod => arithmetic(op, &left, &right),
    }
}

/// Singleton evaluation of a collection as a boolean
///
/// Empty is unknown, a single boolean is its value, and any other single
/// item counts as `true`.
pub(crate) fn to_boolean(nodes: &[Node<'_>], operation: &str) -> PathResult<Option<bool>> {
    match nodes {
        [] => Ok(None),
        [node] => Ok(Some(node.as_bool().unwrap_or(true))),
        _ => Err(PathError::not_singleton(operation, nodes.len())),
    }
}

pub(crate) fn from_boolean<'a>(value: Option<bool>) -> Vec<Node<'a>> {
    value.map(Node::boolean).into_iter().collect()
}

fn logic(op: BinaryOp, l: Option<bool>, r: Option<bool>) -> Option<bool> {
    match op {
        BinaryOp::And => match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        BinaryOp::Or => match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
        BinaryOp::Xor => match (l, r) {
            (Some(a), Some(b)) => Some(a != b),
            _ => None,
        },
        BinaryOp::Implies => match (l, r) {
            (Some(true), r) => r,
            (Some(false), _) => Some(true),
            (None, Some(true)) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

/// Numeric view of a JSON value
pub(crate) fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
        },
        _ => None,
    }
}

/// Node holding a computed decimal
pub(crate) fn decimal_node<'a>(value: Decimal) -> Option<Node<'a>> {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(i) = normalized.to_i64() {
            return Some(Node::owned(Value::Number(Number::from(i))));
        }
    }
    normalized
        .to_f64()
        .and_then(Number::from_f64)
        .map(|n| Node::owned(Value::Number(n)))
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (as_decimal(a), as_decimal(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn equal(left: &[Node<'_>], right: &[Node<'_>]) -> Option<bool> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    if left.len() != right.len() {
        return Some(false);
    }
    Some(
        left.iter()
            .zip(right)
            .all(|(l, r)| values_equal(l.value(), r.value())),
    )
}

fn values_equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => normalize_text(x) == normalize_text(y),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| values_equivalent(value, other)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equivalent(l, r))
        }
        _ => values_equal(a, b),
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Order-independent equivalence; two empty collections are equivalent
fn equivalent(left: &[Node<'_>], right: &[Node<'_>]) -> bool {
    left.len() == right.len()
        && left.iter().all(|l| {
            right
                .iter()
                .any(|r| values_equivalent(l.value(), r.value()))
        })
}

fn union<'a>(left: Vec<Node<'a>>, right: Vec<Node<'a>>) -> Vec<Node<'a>> {
    distinct(left.into_iter().chain(right))
}

/// Remove repeated values, keeping first occurrences
pub(crate) fn distinct<'a>(nodes: impl IntoIterator<Item = Node<'a>>) -> Vec<Node<'a>> {
    let mut result: Vec<Node<'a>> = Vec::new();
    for node in nodes {
        if !result.iter().any(|seen| values_equal(seen.value(), node.value())) {
            result.push(node);
        }
    }
    result
}

fn membership<'a>(
    op: BinaryOp,
    item: &[Node<'a>],
    collection: &[Node<'a>],
) -> PathResult<Vec<Node<'a>>> {
    match item {
        [] => Ok(Vec::new()),
        [single] => Ok(vec![Node::boolean(
            collection
                .iter()
                .any(|candidate| values_equal(single.value(), candidate.value())),
        )]),
        _ => Err(PathError::not_singleton(op.symbol(), item.len())),
    }
}

fn singleton<'n, 'a>(nodes: &'n [Node<'a>], op: BinaryOp) -> PathResult<Option<&'n Node<'a>>> {
    match nodes {
        [] => Ok(None),
        [node] => Ok(Some(node)),
        _ => Err(PathError::not_singleton(op.symbol(), nodes.len())),
    }
}

fn compare<'a>(op: BinaryOp, left: &[Node<'a>], right: &[Node<'a>]) -> PathResult<Vec<Node<'a>>> {
    let (Some(l), Some(r)) = (singleton(left, op)?, singleton(right, op)?) else {
        return Ok(Vec::new());
    };

    let ordering = match (l.value(), r.value()) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (a, b) => match (as_decimal(a), as_decimal(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                return Err(PathError::invalid_operand(
                    op.symbol(),
                    format!("cannot compare {} with {}", l.fhir_type(), r.fhir_type()),
                ));
            }
        },
    };

    let result = match op {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessOrEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(vec![Node::boolean(result)])
}

fn concat_operand(nodes: &[Node<'_>]) -> PathResult<String> {
    match nodes {
        [] => Ok(String::new()),
        [node] => match node.value() {
            Value::String(s) => Ok(s.clone()),
            other => Err(PathError::invalid_operand(
                "&",
                format!("expected a string, found {}", other),
            )),
        },
        _ => Err(PathError::not_singleton("&", nodes.len())),
    }
}

fn arithmetic<'a>(op: BinaryOp, left: &[Node<'a>], right: &[Node<'a>]) -> PathResult<Vec<Node<'a>>> {
    let (Some(l), Some(r)) = (singleton(left, op)?, singleton(right, op)?) else {
        return Ok(Vec::new());
    };

    if op == BinaryOp::Add {
        if let (Value::String(a), Value::String(b)) = (l.value(), r.value()) {
            return Ok(vec![Node::string(format!("{}{}", a, b))]);
        }
    }

    let (Some(a), Some(b)) = (as_decimal(l.value()), as_decimal(r.value())) else {
        return Err(PathError::invalid_operand(
            op.symbol(),
            format!("expected numbers, found {} and {}", l.fhir_type(), r.fhir_type()),
        ));
    };

    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Div => a.checked_div(b).map(|q| q.trunc()),
        BinaryOp::Mod => a.checked_rem(b),
        _ => None,
    };

    // Division by zero and overflow yield empty
    Ok(result.and_then(decimal_node).into_iter().collect())
}

/// Negate a numeric operand
pub(crate) fn negate<'a>(operand: Vec<Node<'a>>) -> PathResult<Vec<Node<'a>>> {
    match operand.as_slice() {
        [] => Ok(Vec::new()),
        [node] => match as_decimal(node.value()) {
            Some(value) => Ok(decimal_node(-value).into_iter().collect()),
            None => Err(PathError::invalid_operand(
                "-",
                format!("expected a number, found {}", node.fhir_type()),
            )),
        },
        _ => Err(PathError::not_singleton("-", operand.len())),
    }
}
