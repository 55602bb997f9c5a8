// SPDX-License-Identifier: MIT

//! Tree-walking evaluator for condition expressions
//!
//! The only names in scope are the fields of the document (reachable either
//! directly or through `doc.`) and the `int`/`float`/`str` coercions. Every
//! operation is total, so a parsed expression always yields a boolean.

use super::ast::{Coercion, CompareOp, Expression, Literal, Operand};
use super::parser::parse;
use crate::workflow::document::DocumentRecord;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Name bound to the document record itself
pub const DOC_BINDING: &str = "doc";

/// Evaluate a condition expression against a document
pub fn evaluate(expr: &Expression, doc: &DocumentRecord) -> bool {
    match expr {
        Expression::True => true,
        Expression::False => false,
        Expression::Compare { left, op, right } => {
            evaluate_compare(&resolve(left, doc), *op, &resolve(right, doc))
        }
        Expression::Truthy(operand) => resolve(operand, doc).truthy(),
        Expression::And(terms) => terms.iter().all(|t| evaluate(t, doc)),
        Expression::Or(terms) => terms.iter().any(|t| evaluate(t, doc)),
        Expression::Not(inner) => !evaluate(inner, doc),
    }
}

/// Parse and evaluate a translated condition; any parse failure yields `false`
pub fn evaluate_condition(translated: &str, doc: &DocumentRecord) -> bool {
    match parse(translated) {
        Ok(expr) => evaluate(&expr, doc),
        Err(e) => {
            log::warn!("Failed to parse condition '{}': {}", translated, e);
            false
        }
    }
}

/// Runtime value of an operand
#[derive(Debug, Clone, PartialEq)]
enum Val<'a> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Cow<'a, str>),
    /// Objects and arrays from the document
    Composite(&'a Value),
    /// The document record bound to `doc`
    Record,
}

impl<'a> Val<'a> {
    fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Null => Val::Null,
            Value::Bool(b) => Val::Bool(*b),
            Value::Number(n) => n.as_f64().map(Val::Number).unwrap_or(Val::Undefined),
            Value::String(s) => Val::Str(Cow::Borrowed(s.as_str())),
            other => Val::Composite(other),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Val::Undefined | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Number(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            Val::Composite(_) | Val::Record => true,
        }
    }

    fn is_nullish(&self) -> bool {
        matches!(self, Val::Undefined | Val::Null)
    }

    fn to_number(&self) -> f64 {
        match self {
            Val::Null => 0.0,
            Val::Bool(b) => f64::from(u8::from(*b)),
            Val::Number(n) => *n,
            Val::Str(s) => string_to_number(s),
            Val::Undefined | Val::Composite(_) | Val::Record => f64::NAN,
        }
    }

    fn to_text(&self) -> String {
        match self {
            Val::Undefined => "undefined".to_string(),
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Number(n) => format_number(*n),
            Val::Str(s) => s.to_string(),
            Val::Composite(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => Val::from_json(other).to_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Val::Composite(_) | Val::Record => "[object Object]".to_string(),
        }
    }
}

/// Numeric value of a string: blank is 0, `Infinity` is the only spelled-out
/// number, anything else must be plain decimal notation
fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    match t {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => t.parse().unwrap_or(f64::NAN),
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn resolve<'a>(operand: &'a Operand, doc: &'a DocumentRecord) -> Val<'a> {
    match operand {
        Operand::Literal(Literal::String(s)) => Val::Str(Cow::Borrowed(s.as_str())),
        Operand::Literal(Literal::Number(n)) => Val::Number(*n),
        Operand::Literal(Literal::Boolean(b)) => Val::Bool(*b),
        Operand::Literal(Literal::Null) => Val::Null,
        Operand::Field(path) => resolve_field(path, doc),
        Operand::Group(expr) => Val::Bool(evaluate(expr, doc)),
        Operand::Call { func, arg } => apply(*func, &resolve(arg, doc)),
    }
}

fn resolve_field<'a>(path: &'a [String], doc: &'a DocumentRecord) -> Val<'a> {
    let segments = match path.split_first() {
        Some((first, [])) if first == DOC_BINDING => return Val::Record,
        Some((first, rest)) if first == DOC_BINDING => rest,
        _ => path,
    };
    doc.get_segments(segments)
        .map(Val::from_json)
        .unwrap_or(Val::Undefined)
}

fn apply(func: Coercion, value: &Val<'_>) -> Val<'static> {
    match func {
        Coercion::Str => Val::Str(Cow::Owned(value.to_text())),
        Coercion::Int => Val::Number(match value {
            Val::Number(n) if n.is_finite() => n.trunc(),
            other => parse_leading_int(&other.to_text()),
        }),
        Coercion::Float => Val::Number(match value {
            Val::Number(n) => *n,
            other => parse_leading_float(&other.to_text()),
        }),
    }
}

/// Longest `[+-]digits` prefix, NaN when there is none
fn parse_leading_int(text: &str) -> f64 {
    let t = text.trim_start();
    let sign_len = usize::from(t.starts_with(|c: char| c == '+' || c == '-'));
    let digits = t[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(t.len() - sign_len);
    if digits == 0 {
        return f64::NAN;
    }
    t[..sign_len + digits].parse().unwrap_or(f64::NAN)
}

/// Longest decimal prefix (with optional fraction and exponent), NaN when there is none
fn parse_leading_float(text: &str) -> f64 {
    let t = text.trim_start();
    let bytes = t.as_bytes();
    let mut end = usize::from(t.starts_with(|c: char| c == '+' || c == '-'));
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    t[..end].parse().unwrap_or(f64::NAN)
}

fn evaluate_compare(left: &Val<'_>, op: CompareOp, right: &Val<'_>) -> bool {
    match op {
        CompareOp::StrictEq => strict_equal(left, right),
        CompareOp::StrictNotEq => !strict_equal(left, right),
        CompareOp::Eq => loose_equal(left, right),
        CompareOp::NotEq => !loose_equal(left, right),
        CompareOp::Gt => relate(left, right).is_some_and(Ordering::is_gt),
        CompareOp::Gte => relate(left, right).is_some_and(Ordering::is_ge),
        CompareOp::Lt => relate(left, right).is_some_and(Ordering::is_lt),
        CompareOp::Lte => relate(left, right).is_some_and(Ordering::is_le),
    }
}

/// Same type and value; an absent field also equals `null`
fn strict_equal(left: &Val<'_>, right: &Val<'_>) -> bool {
    match (left, right) {
        (l, r) if l.is_nullish() && r.is_nullish() => true,
        (Val::Bool(a), Val::Bool(b)) => a == b,
        (Val::Number(a), Val::Number(b)) => a == b,
        (Val::Str(a), Val::Str(b)) => a == b,
        (Val::Composite(a), Val::Composite(b)) => std::ptr::eq(*a, *b),
        (Val::Record, Val::Record) => true,
        _ => false,
    }
}

fn loose_equal(left: &Val<'_>, right: &Val<'_>) -> bool {
    if left.is_nullish() || right.is_nullish() {
        return left.is_nullish() && right.is_nullish();
    }
    match (left, right) {
        (Val::Composite(_) | Val::Record, _) | (_, Val::Composite(_) | Val::Record) => {
            strict_equal(left, right)
        }
        (Val::Str(a), Val::Str(b)) => a == b,
        _ => left.to_number() == right.to_number(),
    }
}

/// Two strings order lexicographically, anything else numerically
fn relate(left: &Val<'_>, right: &Val<'_>) -> Option<Ordering> {
    match (left, right) {
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> DocumentRecord {
        DocumentRecord::from_json(value)
    }

    fn eval(condition: &str, record: &DocumentRecord) -> bool {
        evaluate_condition(condition, record)
    }

    #[test]
    fn test_nested_field_equality() {
        assert!(eval(r#"a.b === "x""#, &doc(json!({"a": {"b": "x"}}))));
        assert!(!eval(r#"a.b === "x""#, &doc(json!({"a": {"b": "y"}}))));
    }

    #[test]
    fn test_doc_binding() {
        let record = doc(json!({"status": "Open", "customer": {"tier": "gold"}}));
        assert!(eval(r#"doc.status === "Open""#, &record));
        assert!(eval(r#"doc.customer.tier === "gold""#, &record));
        assert!(eval("doc", &record));
        assert!(!eval(r#"doc.status === "Closed""#, &record));
    }

    #[test]
    fn test_negation() {
        assert!(!eval("!(a === true)", &doc(json!({"a": true}))));
        assert!(eval("!(a === true)", &doc(json!({"a": false}))));
    }

    #[test]
    fn test_absent_fields() {
        let record = DocumentRecord::empty();
        assert!(eval("missing === null", &record));
        assert!(eval("doc.missing === null", &record));
        assert!(!eval(r#"missing === "value""#, &record));
        assert!(!eval("missing === 0", &record));
        assert!(!eval("missing > 0", &record));
        assert!(!eval("missing < 0", &record));
        assert!(!eval("missing", &record));
    }

    #[test]
    fn test_strict_equality_is_type_sensitive() {
        let record = doc(json!({"qty": 5, "code": "5"}));
        assert!(eval("qty === 5", &record));
        assert!(!eval(r#"qty === "5""#, &record));
        assert!(!eval("code === 5", &record));
        assert!(eval("code == 5", &record));
        assert!(eval("qty !== 6", &record));
        assert!(eval("qty != 6", &record));
    }

    #[test]
    fn test_relational_operators() {
        let record = doc(json!({"amount": 50, "grade": "B"}));
        assert!(!eval("doc.amount > 100", &record));
        assert!(eval("doc.amount < 100", &record));
        assert!(eval("doc.amount >= 50", &record));
        assert!(eval("doc.amount <= 50", &record));
        assert!(eval(r#"doc.grade > "A""#, &record));
        assert!(eval(r#"doc.amount < "60""#, &record));
    }

    #[test]
    fn test_logic_short_circuit_and_precedence() {
        let record = doc(json!({"type": "feature", "priority": 5}));
        assert!(eval(r#"type === "bug" || priority > 3"#, &record));
        assert!(!eval(r#"type === "bug" && priority > 3"#, &record));
        assert!(eval(
            r#"type === "feature" || type === "bug" && priority > 10"#,
            &record
        ));
        assert!(!eval(
            r#"(type === "feature" || type === "bug") && priority > 10"#,
            &record
        ));
    }

    #[test]
    fn test_truthiness() {
        let record = doc(json!({
            "zero": 0, "one": 1, "empty": "", "text": "x",
            "nothing": null, "list": [], "flag": false
        }));
        assert!(!eval("zero", &record));
        assert!(eval("one", &record));
        assert!(!eval("empty", &record));
        assert!(eval("text", &record));
        assert!(!eval("nothing", &record));
        assert!(eval("list", &record));
        assert!(eval("!flag", &record));
        assert!(!eval("null", &record));
    }

    #[test]
    fn test_coercions() {
        let record = doc(json!({"qty": "12 units", "rate": "2.5e1x", "n": 7.9, "flag": true}));
        assert!(eval("int(doc.qty) === 12", &record));
        assert!(eval("float(doc.rate) === 25", &record));
        assert!(eval("int(doc.n) === 7", &record));
        assert!(eval("float(doc.n) > 7.8", &record));
        assert!(eval(r#"str(doc.n) === "7.9""#, &record));
        assert!(eval(r#"str(int(doc.qty)) === "12""#, &record));
        assert!(eval(r#"str(doc.flag) === "true""#, &record));
        assert!(eval(r#"str(doc.missing) === "undefined""#, &record));
        assert!(!eval("int(doc.flag) === 1", &record));
        assert!(!eval("int(doc.missing) === int(doc.missing)", &record));
    }

    #[test]
    fn test_leading_number_parsers() {
        assert_eq!(parse_leading_int("  -42abc"), -42.0);
        assert!(parse_leading_int("abc").is_nan());
        assert!(parse_leading_int("-").is_nan());
        assert_eq!(parse_leading_float(".5"), 0.5);
        assert_eq!(parse_leading_float("3.25kg"), 3.25);
        assert_eq!(parse_leading_float("1e"), 1.0);
        assert!(parse_leading_float(".").is_nan());
    }

    #[test]
    fn test_group_as_value() {
        let record = doc(json!({"a": 1}));
        assert!(eval("(a === 1) === true", &record));
        assert!(eval("(a === 2) === false", &record));
    }

    #[test]
    fn test_malformed_conditions_fail_closed() {
        let record = doc(json!({"a": 1}));
        for bad in [
            "",
            "a ===",
            "a = 1",
            "frappe.get_doc(\"User\")",
            "a === 1 b",
            "(((a === 1",
            "doc.status == \"Open\" and doc.qty > 1",
            "alert(1)",
        ] {
            assert!(!eval(bad, &record), "expected '{}' to fail closed", bad);
        }
    }

    #[test]
    fn test_spelled_out_numbers_are_not_numeric() {
        for text in ["inf", "infinity", "nan", "NaN", "-inf"] {
            let record = doc(json!({"x": text}));
            assert!(!eval("doc.x > 5", &record), "'{}' should not compare as a number", text);
            assert!(!eval("doc.x < 5", &record), "'{}' should not compare as a number", text);
        }
        assert!(eval("doc.x > 5", &doc(json!({"x": "Infinity"}))));
        assert!(eval("doc.x > 5", &doc(json!({"x": " 1e3 "}))));
        assert!(eval("doc.x == 0", &doc(json!({"x": ""}))));
    }

    #[test]
    fn test_long_chains_evaluate_without_overflow() {
        let record = doc(json!({"a": 1}));
        let all = vec!["a"; 200_000].join(" && ");
        assert!(evaluate_condition(&all, &record));

        let mut any = vec!["b"; 200_000];
        any.push("a");
        assert!(evaluate_condition(&any.join(" || "), &record));
        assert!(!evaluate_condition(&vec!["b"; 200_000].join(" || "), &record));

        let grouped = vec!["(a === 1 && !b)"; 50_000].join(" && ");
        assert!(evaluate_condition(&grouped, &record));
    }

    #[test]
    fn test_same_input_same_result() {
        let record = doc(json!({"amount": 120}));
        let expr = parse("amount > 100 && !(amount > 200)").unwrap();
        assert!(evaluate(&expr, &record));
        assert!(evaluate(&expr, &record));
    }
}
