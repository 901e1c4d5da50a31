//! Tree-walking evaluation of parsed expressions

use crate::ast::{Expression, Literal, TypeOp, UnaryOp};
use crate::error::{PathError, PathResult};
use crate::functions;
use crate::node::Node;
use crate::operators;
use crate::version::FhirVersion;

/// Environment shared by one evaluation
pub(crate) struct Context<'a> {
    /// Node the evaluation started from; bound to `%resource` and `%context`
    pub(crate) resource: Node<'a>,
    /// Release whose data types choice elements may carry
    pub(crate) version: FhirVersion,
}

impl<'a> Context<'a> {
    /// Children of `node` named `name`, without choice types the release lacks
    fn children(&self, node: &Node<'a>, name: &str) -> Vec<Node<'a>> {
        let mut children = node.children(name);
        children.retain(|child| self.version.has_type(child.fhir_type()));
        children
    }
}

/// Evaluate `expr` against the focus collection
pub(crate) fn evaluate<'a>(
    expr: &Expression,
    focus: &[Node<'a>],
    ctx: &Context<'a>,
) -> PathResult<Vec<Node<'a>>> {
    match expr {
        Expression::Literal(literal) => Ok(literal_nodes(literal)),

        Expression::Identifier(name) => Ok(focus
            .iter()
            .flat_map(|node| {
                // A leading type name selects the resource itself
                if node.is_resource() && node.fhir_type() == name.as_str() {
                    vec![node.clone()]
                } else {
                    ctx.children(node, name)
                }
            })
            .collect()),

        Expression::Variable(name) => variable(name, ctx),

        Expression::This => Ok(focus.to_vec()),

        Expression::Member { target, name } => {
            let items = evaluate(target, focus, ctx)?;
            Ok(items.iter().flat_map(|node| ctx.children(node, name)).collect())
        }

        Expression::Function { target, name, args } => {
            let input = match target {
                Some(target) => evaluate(target, focus, ctx)?,
                None => focus.to_vec(),
            };
            functions::call(name, input, args, focus, ctx)
        }

        Expression::Indexer { target, index } => {
            let items = evaluate(target, focus, ctx)?;
            let index = evaluate(index, focus, ctx)?;
            match index.as_slice() {
                [] => Ok(Vec::new()),
                [position] => {
                    let position = position
                        .value()
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .ok_or_else(|| {
                            PathError::invalid_operand("[]", "index must be a non-negative integer")
                        })?;
                    Ok(items.into_iter().nth(position).into_iter().collect())
                }
                _ => Err(PathError::not_singleton("[]", index.len())),
            }
        }

        Expression::Unary { op, operand } => {
            let value = evaluate(operand, focus, ctx)?;
            match op {
                UnaryOp::Plus => Ok(value),
                UnaryOp::Negate => operators::negate(value),
            }
        }

        Expression::Binary { op, left, right } => {
            let left = evaluate(left, focus, ctx)?;
            let right = evaluate(right, focus, ctx)?;
            operators::binary(*op, left, right)
        }

        Expression::TypeOperation {
            op,
            operand,
            type_name,
        } => {
            let items = evaluate(operand, focus, ctx)?;
            match op {
                TypeOp::Is => functions::is_type(items, type_name, "is"),
                TypeOp::As => Ok(items
                    .into_iter()
                    .filter(|node| node.is_type(type_name))
                    .collect()),
            }
        }
    }
}

fn literal_nodes<'a>(literal: &Literal) -> Vec<Node<'a>> {
    match literal {
        Literal::Empty => Vec::new(),
        Literal::Boolean(b) => vec![Node::boolean(*b)],
        Literal::String(s) => vec![Node::string(s.as_str())],
        Literal::Integer(i) => vec![Node::integer(*i)],
        Literal::Decimal(d) => operators::decimal_node(*d).into_iter().collect(),
        Literal::DateTime(text) => vec![Node::string(text.as_str())],
    }
}

fn variable<'a>(name: &str, ctx: &Context<'a>) -> PathResult<Vec<Node<'a>>> {
    match name {
        "resource" | "rootResource" | "context" => Ok(vec![ctx.resource.clone()]),
        "ucum" => Ok(vec![Node::string("http://unitsofmeasure.org")]),
        "sct" => Ok(vec![Node::string("http://snomed.info/sct")]),
        "loinc" => Ok(vec![Node::string("http://loinc.org")]),
        _ => Err(PathError::UndefinedVariable {
            name: name.to_string(),
        }),
    }
}
