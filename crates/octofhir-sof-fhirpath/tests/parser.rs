//! Tests for FHIRPath parsing
//!
//! Covers:
//! - Literals (strings with escapes, numbers, dates, booleans, empty)
//! - Navigation, function invocation and indexers
//! - Operator precedence and associativity
//! - Type operators and qualified type names
//! - Rejection of malformed input

use octofhir_sof_fhirpath::{
    BinaryOp, Expression, Literal, PathError, TypeOp, UnaryOp, parse,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use rust_decimal::Decimal;
use std::str::FromStr;

fn parse_expr(input: &str) -> Expression {
    parse(input).unwrap_or_else(|e| panic!("Failed to parse '{}': {:?}", input, e))
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

fn string(value: &str) -> Expression {
    Expression::Literal(Literal::String(value.to_string()))
}

fn int(value: i64) -> Expression {
    Expression::Literal(Literal::Integer(value))
}

fn assert_binary_op(expr: &Expression) -> (&Expression, BinaryOp, &Expression) {
    match expr {
        Expression::Binary { op, left, right } => (left.as_ref(), *op, right.as_ref()),
        _ => panic!("Expected Binary, got: {:?}", expr),
    }
}

// === Literals ===

#[test]
fn test_string_escapes() {
    assert_eq!(parse_expr(r"'it\'s'"), string("it's"));
    assert_eq!(parse_expr(r"'line\nbreak'"), string("line\nbreak"));
    assert_eq!(parse_expr(r"'ABC'"), string("ABC"));
}

#[test]
fn test_numbers() {
    assert_eq!(parse_expr("42"), int(42));
    assert_eq!(
        parse_expr("1.50"),
        Expression::Literal(Literal::Decimal(Decimal::from_str("1.50").unwrap()))
    );
}

#[test]
fn test_booleans_and_empty() {
    assert_eq!(parse_expr("true"), Expression::Literal(Literal::Boolean(true)));
    assert_eq!(parse_expr("false"), Expression::Literal(Literal::Boolean(false)));
    assert_eq!(parse_expr("{ }"), Expression::Literal(Literal::Empty));
}

#[rstest]
#[case("@2020-01-01", "2020-01-01")]
#[case("@2020-01-01T10:30:00Z", "2020-01-01T10:30:00Z")]
#[case("@2020-01-01T10:30:00.000+02:00", "2020-01-01T10:30:00.000+02:00")]
fn test_date_literals(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(
        parse_expr(input),
        Expression::Literal(Literal::DateTime(expected.to_string()))
    );
}

// === Navigation ===

#[test]
fn test_member_chain() {
    assert_eq!(
        parse_expr("name.given"),
        Expression::member(ident("name"), "given")
    );
}

#[test]
fn test_backtick_identifier() {
    assert_eq!(parse_expr("`div`"), ident("div"));
}

#[test]
fn test_function_with_criteria() {
    let expr = parse_expr("name.where(use = 'official')");
    assert_eq!(
        expr,
        Expression::Function {
            target: Some(Box::new(ident("name"))),
            name: "where".to_string(),
            args: vec![Expression::binary(
                BinaryOp::Equal,
                ident("use"),
                string("official")
            )],
        }
    );
}

#[test]
fn test_unqualified_function() {
    assert_eq!(
        parse_expr("getResourceKey()"),
        Expression::Function {
            target: None,
            name: "getResourceKey".to_string(),
            args: vec![],
        }
    );
}

#[test]
fn test_indexer() {
    assert_eq!(
        parse_expr("name[0].family"),
        Expression::member(
            Expression::Indexer {
                target: Box::new(ident("name")),
                index: Box::new(int(0)),
            },
            "family"
        )
    );
}

#[test]
fn test_variables() {
    assert_eq!(parse_expr("%resource"), Expression::Variable("resource".to_string()));
    assert_eq!(parse_expr("$this"), Expression::This);
}

// === Operators ===

#[rstest]
#[case("1 + 2", BinaryOp::Add)]
#[case("1 - 2", BinaryOp::Subtract)]
#[case("1 * 2", BinaryOp::Multiply)]
#[case("1 / 2", BinaryOp::Divide)]
#[case("1 div 2", BinaryOp::Div)]
#[case("1 mod 2", BinaryOp::Mod)]
#[case("a & b", BinaryOp::Concatenate)]
#[case("a | b", BinaryOp::Union)]
#[case("1 = 2", BinaryOp::Equal)]
#[case("1 != 2", BinaryOp::NotEqual)]
#[case("1 ~ 2", BinaryOp::Equivalent)]
#[case("1 !~ 2", BinaryOp::NotEquivalent)]
#[case("1 < 2", BinaryOp::Less)]
#[case("1 <= 2", BinaryOp::LessOrEqual)]
#[case("1 > 2", BinaryOp::Greater)]
#[case("1 >= 2", BinaryOp::GreaterOrEqual)]
#[case("a in b", BinaryOp::In)]
#[case("a contains b", BinaryOp::Contains)]
#[case("a and b", BinaryOp::And)]
#[case("a or b", BinaryOp::Or)]
#[case("a xor b", BinaryOp::Xor)]
#[case("a implies b", BinaryOp::Implies)]
fn test_binary_operators(#[case] input: &str, #[case] expected_op: BinaryOp) {
    let expr = parse_expr(input);
    let (_, op, _) = assert_binary_op(&expr);
    assert_eq!(op, expected_op);
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let expr = parse_expr("1 + 2 * 3");
    let (left, op, right) = assert_binary_op(&expr);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(left, &int(1));
    assert_eq!(
        right,
        &Expression::binary(BinaryOp::Multiply, int(2), int(3))
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse_expr("a or b and c");
    let (left, op, right) = assert_binary_op(&expr);
    assert_eq!(op, BinaryOp::Or);
    assert_eq!(left, &ident("a"));
    assert_eq!(right, &Expression::binary(BinaryOp::And, ident("b"), ident("c")));
}

#[test]
fn test_left_associativity() {
    let expr = parse_expr("10 - 3 - 2");
    let (left, op, right) = assert_binary_op(&expr);
    assert_eq!(op, BinaryOp::Subtract);
    assert_eq!(left, &Expression::binary(BinaryOp::Subtract, int(10), int(3)));
    assert_eq!(right, &int(2));
}

#[test]
fn test_unary_minus() {
    assert_eq!(
        parse_expr("-5"),
        Expression::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(int(5)),
        }
    );
}

#[test]
fn test_parentheses_override_precedence() {
    let expr = parse_expr("(1 + 2) * 3");
    let (left, op, _) = assert_binary_op(&expr);
    assert_eq!(op, BinaryOp::Multiply);
    assert_eq!(left, &Expression::binary(BinaryOp::Add, int(1), int(2)));
}

// === Type Operators ===

#[rstest]
#[case("value is Quantity", TypeOp::Is, "Quantity")]
#[case("value as FHIR.Quantity", TypeOp::As, "FHIR.Quantity")]
#[case("value is System.String", TypeOp::Is, "System.String")]
fn test_type_operators(#[case] input: &str, #[case] expected_op: TypeOp, #[case] expected_type: &str) {
    match parse_expr(input) {
        Expression::TypeOperation { op, operand, type_name } => {
            assert_eq!(op, expected_op);
            assert_eq!(operand.as_ref(), &ident("value"));
            assert_eq!(type_name, expected_type);
        }
        other => panic!("Expected TypeOperation, got: {:?}", other),
    }
}

#[test]
fn test_keywords_need_word_boundaries() {
    // `isActive` is a member, not `is Active`
    assert_eq!(parse_expr("isActive"), ident("isActive"));
    assert_eq!(parse_expr("a.order"), Expression::member(ident("a"), "order"));
}

// === Errors ===

#[rstest]
#[case("")]
#[case("name.")]
#[case("(name")]
#[case("'unterminated")]
#[case("1 +")]
#[case("name.where(use = 'x'")]
#[case("name ]")]
fn test_malformed_input(#[case] input: &str) {
    match parse(input) {
        Err(PathError::Parse { expression, .. }) => assert_eq!(expression, input),
        other => panic!("Expected parse error for '{}', got: {:?}", input, other),
    }
}
