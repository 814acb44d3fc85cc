use super::*;
use crate::value::Value;
use std::collections::BTreeMap;

fn record(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn resolve(record: &BTreeMap<String, Value>) -> impl Fn(&str) -> Option<Value> + '_ {
    move |field| record.get(field).cloned()
}

#[test]
fn field_eq_matches_and_rejects() {
    let row = record(&[("id", Value::from("1")), ("data", Value::from("a"))]);

    let hit = Expr::field_eq("id", "1");
    let miss = Expr::field_eq("id", "2");

    assert!(eval(&hit, &resolve(&row)).unwrap());
    assert!(!eval(&miss, &resolve(&row)).unwrap());
}

#[test]
fn logical_operators_compose() {
    let row = record(&[("a", Value::Int(1)), ("b", Value::Int(2))]);

    let both = Expr::and(Expr::field_eq("a", 1i64), Expr::field_eq("b", 2i64));
    let either = Expr::or(Expr::field_eq("a", 9i64), Expr::field_eq("b", 2i64));
    let negated = Expr::not(Expr::field_eq("a", 9i64));

    assert!(eval(&both, &resolve(&row)).unwrap());
    assert!(eval(&either, &resolve(&row)).unwrap());
    assert!(eval(&negated, &resolve(&row)).unwrap());
}

#[test]
fn timestamp_literal_compares_against_timestamp_fields() {
    let row = record(&[("created_at", Value::Timestamp(1000))]);

    let hit = Expr::equal(Expr::ident("created_at"), Expr::timestamp(1000));
    assert!(eval(&hit, &resolve(&row)).unwrap());

    // an int literal is not a timestamp
    let typed_miss = Expr::equal(Expr::ident("created_at"), Expr::scalar(1000i64));
    assert!(!eval(&typed_miss, &resolve(&row)).unwrap());
}

#[test]
fn integer_literals_match_unsigned_fields() {
    let row = record(&[("id", Value::Uint(7))]);

    let hit = Expr::field_eq("id", 7i64);
    assert!(eval(&hit, &resolve(&row)).unwrap());

    let miss = Expr::field_eq("id", 8i64);
    assert!(!eval(&miss, &resolve(&row)).unwrap());
}

#[test]
fn unknown_field_is_an_error() {
    let row = record(&[]);
    let expr = Expr::field_eq("nope", 1i64);

    let err = eval(&expr, &resolve(&row)).unwrap_err();
    assert!(matches!(err, EvalError::UnknownField { field } if field == "nope"));
}

#[test]
fn bare_leaf_is_rejected() {
    let row = record(&[("id", Value::from("1"))]);

    let err = eval(&Expr::ident("id"), &resolve(&row)).unwrap_err();
    assert!(matches!(err, EvalError::BareLeaf { kind: "identifier" }));
}

#[test]
fn nested_equality_reduces_to_boolean() {
    let row = record(&[("a", Value::Int(1))]);

    // (a = 1) = true
    let expr = Expr::equal(Expr::field_eq("a", 1i64), Expr::scalar(true));
    assert!(eval(&expr, &resolve(&row)).unwrap());
}
