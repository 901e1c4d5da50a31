//! FHIRPath parser using winnow
//!
//! Recursive descent with one function per precedence level, from the
//! loosest binding operator (`implies`) down to invocation chains and terms.

use crate::ast::{BinaryOp, Expression, Literal, TypeOp, UnaryOp};
use crate::error::{PathError, PathResult};
use rust_decimal::Decimal;
use std::str::FromStr;
use winnow::Parser;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::error::{ContextError, ErrMode};
use winnow::token::{any, take_while};

type Input<'a> = &'a str;
type PResult<T> = Result<T, ErrMode<ContextError>>;

/// A precedence level: parses operands of the next tighter level
type Level = for<'a> fn(&mut Input<'a>) -> PResult<Expression>;
/// An operator recognised at one precedence level
type Operator = for<'a> fn(&mut Input<'a>) -> PResult<BinaryOp>;

/// Parse a FHIRPath expression
pub fn parse(source: &str) -> PathResult<Expression> {
    let mut input: Input<'_> = source;

    let expr = expression(&mut input)
        .map_err(|e| PathError::parse(source, format!("Parse error: {:?}", e)))?;
    ws(&mut input).map_err(|e| PathError::parse(source, format!("Parse error: {:?}", e)))?;
    if !input.is_empty() {
        return Err(PathError::parse(
            source,
            format!("unexpected input at '{}'", input),
        ));
    }
    Ok(expr)
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn spaces<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    multispace0.parse_next(input)
}

/// Skip whitespace and comments
fn ws(input: &mut Input<'_>) -> PResult<()> {
    loop {
        spaces(input)?;
        let current = *input;
        if let Some(rest) = current.strip_prefix("//") {
            *input = rest.find('\n').map_or("", |end| &rest[end..]);
        } else if let Some(rest) = current.strip_prefix("/*") {
            *input = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return Ok(());
        }
    }
}

/// Match punctuation, skipping surrounding whitespace
fn symbol<'a>(text: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| delimited(ws, text, ws).parse_next(input)
}

/// Match a whole-word keyword, skipping surrounding whitespace
fn keyword<'a>(word: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        delimited(ws, identifier_text.verify(move |text: &str| text == word), ws)
            .parse_next(input)
    }
}

fn identifier_text<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
        .verify(|text: &str| !text.starts_with(|c: char| c.is_ascii_digit()))
        .parse_next(input)
}

/// Plain or backtick-delimited identifier
fn identifier(input: &mut Input<'_>) -> PResult<String> {
    alt((
        delimited('`', take_while(1.., |c: char| c != '`'), '`'),
        identifier_text,
    ))
    .map(str::to_string)
    .parse_next(input)
}

/// Dotted type name (`Quantity`, `FHIR.Quantity`, `System.String`)
fn qualified_name(input: &mut Input<'_>) -> PResult<String> {
    let parts: Vec<String> = separated(1.., identifier, '.').parse_next(input)?;
    Ok(parts.join("."))
}

// ============================================================================
// Literals
// ============================================================================

fn quote(input: &mut Input<'_>) -> PResult<char> {
    '\''.parse_next(input)
}

fn next_char(input: &mut Input<'_>) -> PResult<char> {
    any.parse_next(input)
}

fn digits<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    digit1.parse_next(input)
}

/// Single-quoted string with FHIRPath escapes
fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    quote(input)?;
    let mut text = String::new();
    loop {
        match next_char(input)? {
            '\'' => return Ok(text),
            '\\' => match next_char(input)? {
                'n' => text.push('\n'),
                'r' => text.push('\r'),
                't' => text.push('\t'),
                'f' => text.push('\u{c}'),
                'u' => {
                    let mut code = 0u32;
                    for _ in 0..4 {
                        let digit = next_char(input)?.to_digit(16).ok_or_else(backtrack)?;
                        code = code * 16 + digit;
                    }
                    text.push(char::from_u32(code).ok_or_else(backtrack)?);
                }
                other => text.push(other),
            },
            other => text.push(other),
        }
    }
}

fn number_literal(input: &mut Input<'_>) -> PResult<Literal> {
    let whole = digits(input)?;
    let fraction = opt(preceded('.', digits)).parse_next(input)?;
    match fraction {
        Some(fraction) => Decimal::from_str(&format!("{}.{}", whole, fraction))
            .map(Literal::Decimal)
            .map_err(|_| backtrack()),
        None => whole
            .parse::<i64>()
            .map(Literal::Integer)
            .map_err(|_| backtrack()),
    }
}

fn datetime_literal(input: &mut Input<'_>) -> PResult<Literal> {
    preceded(
        '@',
        take_while(1.., |c: char| {
            c.is_ascii_digit() || matches!(c, '-' | ':' | 'T' | '.' | 'Z' | '+')
        }),
    )
    .map(|text: &str| Literal::DateTime(text.to_string()))
    .parse_next(input)
}

// ============================================================================
// Expressions
// ============================================================================

/// Parse an expression (entry point for nested expressions)
pub(crate) fn expression(input: &mut Input<'_>) -> PResult<Expression> {
    implies_expr(input)
}

/// Left-associative binary operators at one precedence level
fn binary_level(input: &mut Input<'_>, operand: Level, operator: Operator) -> PResult<Expression> {
    let mut left = operand(input)?;
    while let Some(op) = opt(operator).parse_next(input)? {
        let right = operand(input)?;
        left = Expression::binary(op, left, right);
    }
    Ok(left)
}

fn implies_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, or_expr, implies_op)
}

fn or_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, and_expr, or_op)
}

fn and_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, membership_expr, and_op)
}

fn membership_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, equality_expr, membership_op)
}

fn equality_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, comparison_expr, equality_op)
}

fn comparison_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, union_expr, comparison_op)
}

fn union_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, type_expr, union_op)
}

fn type_expr(input: &mut Input<'_>) -> PResult<Expression> {
    let mut expr = additive_expr(input)?;
    while let Some(op) = opt(alt((
        keyword("is").value(TypeOp::Is),
        keyword("as").value(TypeOp::As),
    )))
    .parse_next(input)?
    {
        let type_name = qualified_name(input)?;
        expr = Expression::TypeOperation {
            op,
            operand: Box::new(expr),
            type_name,
        };
    }
    Ok(expr)
}

fn additive_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, multiplicative_expr, additive_op)
}

fn multiplicative_expr(input: &mut Input<'_>) -> PResult<Expression> {
    binary_level(input, unary_expr, multiplicative_op)
}

fn unary_expr(input: &mut Input<'_>) -> PResult<Expression> {
    let op = opt(alt((
        symbol("-").value(UnaryOp::Negate),
        symbol("+").value(UnaryOp::Plus),
    )))
    .parse_next(input)?;
    match op {
        Some(op) => {
            let operand = unary_expr(input)?;
            Ok(Expression::Unary {
                op,
                operand: Box::new(operand),
            })
        }
        None => invocation_expr(input),
    }
}

/// A term followed by `.member`, `.function(...)` and `[index]` steps
fn invocation_expr(input: &mut Input<'_>) -> PResult<Expression> {
    let mut expr = term(input)?;
    loop {
        if opt(symbol(".")).parse_next(input)?.is_some() {
            let name = identifier(input)?;
            expr = if opt(symbol("(")).parse_next(input)?.is_some() {
                Expression::Function {
                    target: Some(Box::new(expr)),
                    name,
                    args: arguments(input)?,
                }
            } else {
                Expression::member(expr, name)
            };
        } else if opt(symbol("[")).parse_next(input)?.is_some() {
            let index = expression(input)?;
            symbol("]").parse_next(input)?;
            expr = Expression::Indexer {
                target: Box::new(expr),
                index: Box::new(index),
            };
        } else {
            return Ok(expr);
        }
    }
}

/// Argument list after the opening parenthesis
fn arguments(input: &mut Input<'_>) -> PResult<Vec<Expression>> {
    let args: Vec<Expression> = separated(0.., expression, symbol(",")).parse_next(input)?;
    symbol(")").parse_next(input)?;
    Ok(args)
}

fn term(input: &mut Input<'_>) -> PResult<Expression> {
    ws(input)?;
    alt((
        delimited(symbol("("), expression, symbol(")")),
        (symbol("{"), symbol("}")).value(Expression::Literal(Literal::Empty)),
        string_literal.map(|text| Expression::Literal(Literal::String(text))),
        datetime_literal.map(Expression::Literal),
        number_literal.map(Expression::Literal),
        "$this".value(Expression::This),
        preceded('%', alt((identifier, string_literal))).map(Expression::Variable),
        identifier_term,
    ))
    .parse_next(input)
}

/// Identifier, boolean literal, or unqualified function call
fn identifier_term(input: &mut Input<'_>) -> PResult<Expression> {
    let name = identifier(input)?;
    if opt(symbol("(")).parse_next(input)?.is_some() {
        return Ok(Expression::Function {
            target: None,
            name,
            args: arguments(input)?,
        });
    }
    Ok(match name.as_str() {
        "true" => Expression::Literal(Literal::Boolean(true)),
        "false" => Expression::Literal(Literal::Boolean(false)),
        _ => Expression::Identifier(name),
    })
}

// ============================================================================
// Operators
// ============================================================================

fn implies_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    keyword("implies").value(BinaryOp::Implies).parse_next(input)
}

fn or_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        keyword("or").value(BinaryOp::Or),
        keyword("xor").value(BinaryOp::Xor),
    ))
    .parse_next(input)
}

fn and_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    keyword("and").value(BinaryOp::And).parse_next(input)
}

fn membership_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        keyword("in").value(BinaryOp::In),
        keyword("contains").value(BinaryOp::Contains),
    ))
    .parse_next(input)
}

fn equality_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        symbol("!=").value(BinaryOp::NotEqual),
        symbol("!~").value(BinaryOp::NotEquivalent),
        symbol("=").value(BinaryOp::Equal),
        symbol("~").value(BinaryOp::Equivalent),
    ))
    .parse_next(input)
}

fn comparison_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        symbol("<=").value(BinaryOp::LessOrEqual),
        symbol(">=").value(BinaryOp::GreaterOrEqual),
        symbol("<").value(BinaryOp::Less),
        symbol(">").value(BinaryOp::Greater),
    ))
    .parse_next(input)
}

fn union_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    symbol("|").value(BinaryOp::Union).parse_next(input)
}

fn additive_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        symbol("+").value(BinaryOp::Add),
        symbol("-").value(BinaryOp::Subtract),
        symbol("&").value(BinaryOp::Concatenate),
    ))
    .parse_next(input)
}

fn multiplicative_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        symbol("*").value(BinaryOp::Multiply),
        symbol("/").value(BinaryOp::Divide),
        keyword("div").value(BinaryOp::Div),
        keyword("mod").value(BinaryOp::Mod),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_skips_comments() {
        let expr = parse("name // trailing comment").unwrap();
        assert_eq!(expr, Expression::Identifier("name".to_string()));

        let expr = parse("/* leading */ name").unwrap();
        assert_eq!(expr, Expression::Identifier("name".to_string()));
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        // `index` must not be read as the `in` operator
        let expr = parse("a.index").unwrap();
        assert_eq!(
            expr,
            Expression::member(Expression::Identifier("a".to_string()), "index")
        );
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(parse("name )").is_err());
        assert!(parse("name.").is_err());
    }
}
