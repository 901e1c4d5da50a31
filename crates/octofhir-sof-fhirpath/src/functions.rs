//! FHIRPath function library
//!
//! Functions receive their input collection already evaluated. Criteria
//! arguments (`where`, `select`, `exists`, `all`) are evaluated once per
//! input item with that item as `$this`; other arguments are evaluated
//! against the focus the invocation appeared in.

use crate::ast::{Expression, Literal};
use crate::error::{PathError, PathResult};
use crate::evaluator::{Context, evaluate};
use crate::node::Node;
use crate::operators::{self, from_boolean, to_boolean};
use serde_json::Value;
use std::slice;

/// Invoke the function `name` on `input`
pub(crate) fn call<'a>(
    name: &str,
    input: Vec<Node<'a>>,
    args: &[Expression],
    outer: &[Node<'a>],
    ctx: &Context<'a>,
) -> PathResult<Vec<Node<'a>>> {
    match name {
        // Filtering and projection
        "where" => {
            arity(name, args, 1, 1)?;
            let mut kept = Vec::new();
            for item in input {
                let result = evaluate(&args[0], slice::from_ref(&item), ctx)?;
                if to_boolean(&result, name)? == Some(true) {
                    kept.push(item);
                }
            }
            Ok(kept)
        }
        "select" => {
            arity(name, args, 1, 1)?;
            let mut projected = Vec::new();
            for item in &input {
                projected.extend(evaluate(&args[0], slice::from_ref(item), ctx)?);
            }
            Ok(projected)
        }
        "ofType" | "as" => {
            arity(name, args, 1, 1)?;
            let type_name = type_argument(name, &args[0])?;
            Ok(input
                .into_iter()
                .filter(|node| node.is_type(&type_name))
                .collect())
        }
        "is" => {
            arity(name, args, 1, 1)?;
            let type_name = type_argument(name, &args[0])?;
            is_type(input, &type_name, name)
        }
        "extension" => {
            arity(name, args, 1, 1)?;
            let Some(url) = string_argument(name, &args[0], outer, ctx)? else {
                return Ok(Vec::new());
            };
            Ok(input
                .iter()
                .flat_map(|node| node.children("extension"))
                .filter(|ext| ext.value().get("url").and_then(Value::as_str) == Some(url.as_str()))
                .collect())
        }

        // Existence
        "exists" => {
            arity(name, args, 0, 1)?;
            let found = match args.first() {
                None => !input.is_empty(),
                Some(criteria) => {
                    let mut found = false;
                    for item in &input {
                        let result = evaluate(criteria, slice::from_ref(item), ctx)?;
                        if to_boolean(&result, name)? == Some(true) {
                            found = true;
                            break;
                        }
                    }
                    found
                }
            };
            Ok(vec![Node::boolean(found)])
        }
        "all" => {
            arity(name, args, 1, 1)?;
            let mut all = true;
            for item in &input {
                let result = evaluate(&args[0], slice::from_ref(item), ctx)?;
                if to_boolean(&result, name)? != Some(true) {
                    all = false;
                    break;
                }
            }
            Ok(vec![Node::boolean(all)])
        }
        "empty" => {
            arity(name, args, 0, 0)?;
            Ok(vec![Node::boolean(input.is_empty())])
        }
        "hasValue" => {
            arity(name, args, 0, 0)?;
            Ok(vec![Node::boolean(
                matches!(input.as_slice(), [node] if node.is_primitive()),
            )])
        }
        "count" => {
            arity(name, args, 0, 0)?;
            Ok(vec![Node::integer(
                i64::try_from(input.len()).unwrap_or(i64::MAX),
            )])
        }
        "distinct" => {
            arity(name, args, 0, 0)?;
            Ok(operators::distinct(input))
        }

        // Subsetting
        "first" => {
            arity(name, args, 0, 0)?;
            Ok(input.into_iter().next().into_iter().collect())
        }
        "last" => {
            arity(name, args, 0, 0)?;
            Ok(input.into_iter().last().into_iter().collect())
        }
        "tail" => {
            arity(name, args, 0, 0)?;
            Ok(input.into_iter().skip(1).collect())
        }
        "single" => {
            arity(name, args, 0, 0)?;
            if input.len() > 1 {
                return Err(PathError::not_singleton(name, input.len()));
            }
            Ok(input)
        }

        // Boolean logic
        "not" => {
            arity(name, args, 0, 0)?;
            Ok(from_boolean(to_boolean(&input, name)?.map(|b| !b)))
        }
        "iif" => {
            arity(name, args, 2, 3)?;
            let criterion = evaluate(&args[0], &input, ctx)?;
            if to_boolean(&criterion, name)? == Some(true) {
                evaluate(&args[1], &input, ctx)
            } else if let Some(otherwise) = args.get(2) {
                evaluate(otherwise, &input, ctx)
            } else {
                Ok(Vec::new())
            }
        }

        // Strings
        "join" => {
            arity(name, args, 0, 1)?;
            let separator = match args.first() {
                Some(arg) => string_argument(name, arg, outer, ctx)?.unwrap_or_default(),
                None => String::new(),
            };
            let parts: Vec<String> = input.iter().filter_map(text_of).collect();
            Ok(vec![Node::string(parts.join(&separator))])
        }
        "startsWith" | "endsWith" | "contains" => {
            arity(name, args, 1, 1)?;
            let Some(text) = string_input(name, &input)? else {
                return Ok(Vec::new());
            };
            let Some(arg) = string_argument(name, &args[0], outer, ctx)? else {
                return Ok(Vec::new());
            };
            let result = match name {
                "startsWith" => text.starts_with(&arg),
                "endsWith" => text.ends_with(&arg),
                _ => text.contains(&arg),
            };
            Ok(vec![Node::boolean(result)])
        }
        "lower" | "upper" => {
            arity(name, args, 0, 0)?;
            Ok(string_input(name, &input)?
                .map(|text| {
                    Node::string(if name == "lower" {
                        text.to_lowercase()
                    } else {
                        text.to_uppercase()
                    })
                })
                .into_iter()
                .collect())
        }
        "length" => {
            arity(name, args, 0, 0)?;
            Ok(string_input(name, &input)?
                .map(|text| Node::integer(i64::try_from(text.chars().count()).unwrap_or(i64::MAX)))
                .into_iter()
                .collect())
        }
        "toString" => {
            arity(name, args, 0, 0)?;
            match input.as_slice() {
                [] => Ok(Vec::new()),
                [node] => Ok(text_of(node).map(Node::string).into_iter().collect()),
                _ => Err(PathError::not_singleton(name, input.len())),
            }
        }

        _ => Err(PathError::unknown_function(name)),
    }
}

/// `is` test of a singleton collection
pub(crate) fn is_type<'a>(
    input: Vec<Node<'a>>,
    type_name: &str,
    operation: &str,
) -> PathResult<Vec<Node<'a>>> {
    match input.as_slice() {
        [] => Ok(Vec::new()),
        [node] => Ok(vec![Node::boolean(node.is_type(type_name))]),
        _ => Err(PathError::not_singleton(operation, input.len())),
    }
}

fn arity(name: &str, args: &[Expression], min: usize, max: usize) -> PathResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}-{}", min, max)
        };
        return Err(PathError::wrong_arity(name, expected, args.len()));
    }
    Ok(())
}

fn type_argument(name: &str, arg: &Expression) -> PathResult<String> {
    match arg {
        Expression::Literal(Literal::String(type_name)) => Ok(type_name.clone()),
        _ => arg
            .as_type_name()
            .ok_or_else(|| PathError::invalid_operand(name, "expected a type name")),
    }
}

/// String value of a singleton input, `None` for empty input
fn string_input(name: &str, input: &[Node<'_>]) -> PathResult<Option<String>> {
    match input {
        [] => Ok(None),
        [node] => node.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
            PathError::invalid_operand(name, format!("expected a string, found {}", node.fhir_type()))
        }),
        _ => Err(PathError::not_singleton(name, input.len())),
    }
}

fn string_argument<'a>(
    name: &str,
    arg: &Expression,
    outer: &[Node<'a>],
    ctx: &Context<'a>,
) -> PathResult<Option<String>> {
    let value = evaluate(arg, outer, ctx)?;
    string_input(name, &value)
}

/// String form of a primitive node
fn text_of(node: &Node<'_>) -> Option<String> {
    match node.value() {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
