//! FHIRPath evaluation tests
//!
//! Evaluates expressions against in-memory JSON resources through the
//! `PathEvaluator` seam, the way view application uses the engine.

use octofhir_sof_fhirpath::{FhirPathEngine, Node, PathError, PathEvaluator};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

// ============================================================================
// Test Helpers
// ============================================================================

fn patient() -> Value {
    json!({
        "resourceType": "Patient",
        "id": "pt-1",
        "active": true,
        "gender": "female",
        "birthDate": "1990-04-12",
        "name": [
            {"use": "official", "family": "Smith", "given": ["Jane", "Q"]},
            {"use": "nickname", "given": ["JJ"]}
        ],
        "telecom": [
            {"system": "phone", "value": "555-0100"},
            {"system": "email", "value": "jane@example.org"}
        ],
        "extension": [
            {"url": "http://example.org/race", "valueString": "unknown"},
            {"url": "http://example.org/birthPlace", "valueAddress": {"city": "Oslo"}}
        ],
        "managingOrganization": {"reference": "Organization/org-1"}
    })
}

fn observation() -> Value {
    json!({
        "resourceType": "Observation",
        "id": "obs-1",
        "status": "final",
        "valueQuantity": {"value": 7.5, "unit": "mmol/L"},
        "component": [
            {"code": {"text": "a"}, "valueInteger": 3},
            {"code": {"text": "b"}, "valueString": "high"}
        ]
    })
}

fn eval(resource: &Value, path: &str) -> Vec<Value> {
    let engine = FhirPathEngine::default();
    engine
        .evaluate(&Node::borrowed(resource), path)
        .unwrap_or_else(|e| panic!("Failed to evaluate '{}': {}", path, e))
        .into_iter()
        .map(Node::into_value)
        .collect()
}

fn eval_err(resource: &Value, path: &str) -> PathError {
    FhirPathEngine::default()
        .evaluate(&Node::borrowed(resource), path)
        .expect_err("expected evaluation to fail")
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_member_navigation_flattens() {
    assert_eq!(
        eval(&patient(), "name.given"),
        vec![json!("Jane"), json!("Q"), json!("JJ")]
    );
}

#[test]
fn test_leading_resource_type_is_optional() {
    assert_eq!(eval(&patient(), "Patient.gender"), vec![json!("female")]);
    assert_eq!(eval(&patient(), "gender"), vec![json!("female")]);
}

#[test]
fn test_missing_element_is_empty() {
    assert!(eval(&patient(), "deceasedBoolean").is_empty());
    assert!(eval(&patient(), "name.prefix").is_empty());
}

#[test]
fn test_indexer() {
    assert_eq!(eval(&patient(), "name[1].given"), vec![json!("JJ")]);
    assert!(eval(&patient(), "name[5]").is_empty());
}

#[test]
fn test_choice_element_navigation() {
    assert_eq!(eval(&observation(), "value.unit"), vec![json!("mmol/L")]);
    assert_eq!(
        eval(&observation(), "value.ofType(Quantity).value"),
        vec![json!(7.5)]
    );
    assert!(eval(&observation(), "value.ofType(string)").is_empty());
}

#[test]
fn test_resource_variable() {
    assert_eq!(
        eval(&patient(), "name.where(family.exists()).select(%resource.id)"),
        vec![json!("pt-1")]
    );
}

// ============================================================================
// Functions
// ============================================================================

#[rstest]
#[case("name.where(use = 'official').family", vec![json!("Smith")])]
#[case("name.first().given.first()", vec![json!("Jane")])]
#[case("name.last().use", vec![json!("nickname")])]
#[case("name.given.tail()", vec![json!("Q"), json!("JJ")])]
#[case("name.count()", vec![json!(2)])]
#[case("name.exists()", vec![json!(true)])]
#[case("name.exists(use = 'maiden')", vec![json!(false)])]
#[case("name.all(given.exists())", vec![json!(true)])]
#[case("photo.empty()", vec![json!(true)])]
#[case("name.given.join(', ')", vec![json!("Jane, Q, JJ")])]
#[case("telecom.where(system = 'email').value", vec![json!("jane@example.org")])]
#[case("telecom.select(system)", vec![json!("phone"), json!("email")])]
#[case("name.use.distinct().count()", vec![json!(2)])]
#[case("active.not()", vec![json!(false)])]
#[case("gender.hasValue()", vec![json!(true)])]
#[case("iif(active, 'yes', 'no')", vec![json!("yes")])]
fn test_functions(#[case] path: &str, #[case] expected: Vec<Value>) {
    assert_eq!(eval(&patient(), path), expected);
}

#[test]
fn test_extension_lookup() {
    assert_eq!(
        eval(&patient(), "extension('http://example.org/race').value.ofType(string)"),
        vec![json!("unknown")]
    );
    assert_eq!(
        eval(&patient(), "extension('http://example.org/birthPlace').value.city"),
        vec![json!("Oslo")]
    );
    assert!(eval(&patient(), "extension('http://example.org/other')").is_empty());
}

#[rstest]
#[case("gender.startsWith('fem')", true)]
#[case("gender.endsWith('male')", true)]
#[case("gender.contains('x')", false)]
#[case("gender.upper() = 'FEMALE'", true)]
#[case("gender.length() = 6", true)]
#[case("birthDate.toString() = '1990-04-12'", true)]
fn test_string_functions(#[case] path: &str, #[case] expected: bool) {
    assert_eq!(eval(&patient(), path), vec![json!(expected)]);
}

#[test]
fn test_type_tests() {
    assert_eq!(eval(&observation(), "value is Quantity"), vec![json!(true)]);
    assert_eq!(eval(&observation(), "value.is(Range)"), vec![json!(false)]);
    assert_eq!(
        eval(&observation(), "component.value.ofType(integer)"),
        vec![json!(3)]
    );
    assert_eq!(
        eval(&observation(), "component.value.ofType(string)"),
        vec![json!("high")]
    );
    assert_eq!(
        eval(&patient(), "managingOrganization.ofType(Reference).reference"),
        vec![json!("Organization/org-1")]
    );
}

// ============================================================================
// Operators
// ============================================================================

#[rstest]
#[case("1 + 2 * 3", json!(7))]
#[case("10 div 3", json!(3))]
#[case("10 mod 3", json!(1))]
#[case("1 / 2", json!(0.5))]
#[case("-(2 + 3)", json!(-5))]
#[case("'a' + 'b'", json!("ab"))]
#[case("'a' & {}", json!("a"))]
#[case("1 < 2 and 'b' > 'a'", json!(true))]
#[case("true xor true", json!(false))]
#[case("false implies {}", json!(true))]
#[case("'Jane' in name.given", json!(true))]
#[case("name.given contains 'Bob'", json!(false))]
#[case("'ABC' ~ 'abc'", json!(true))]
#[case("1 != 1.0", json!(false))]
fn test_operators(#[case] path: &str, #[case] expected: Value) {
    assert_eq!(eval(&patient(), path), vec![expected]);
}

#[test]
fn test_empty_propagates() {
    assert!(eval(&patient(), "photo = 1").is_empty());
    assert!(eval(&patient(), "photo + 1").is_empty());
    assert!(eval(&patient(), "{} and true").is_empty());
    assert!(eval(&patient(), "1 / 0").is_empty());
}

#[test]
fn test_union_removes_duplicates() {
    assert_eq!(
        eval(&patient(), "name.use | name.use"),
        vec![json!("official"), json!("nickname")]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_function() {
    let err = eval_err(&patient(), "name.frobnicate()");
    assert_eq!(err, PathError::unknown_function("frobnicate"));
}

#[test]
fn test_view_only_functions_are_not_evaluated() {
    assert!(matches!(
        eval_err(&patient(), "getResourceKey()"),
        PathError::UnknownFunction { .. }
    ));
}

#[test]
fn test_wrong_arity() {
    assert!(matches!(
        eval_err(&patient(), "name.where()"),
        PathError::WrongArity { found: 0, .. }
    ));
}

#[test]
fn test_where_criteria_must_be_singleton() {
    assert!(matches!(
        eval_err(&patient(), "name.where(given)"),
        PathError::NotSingleton { count: 2, .. }
    ));
}

#[test]
fn test_undefined_variable() {
    assert!(matches!(
        eval_err(&patient(), "%missing"),
        PathError::UndefinedVariable { .. }
    ));
}

#[test]
fn test_comparing_unrelated_types_fails() {
    assert!(matches!(
        eval_err(&patient(), "gender < 3"),
        PathError::InvalidOperand { .. }
    ));
}
