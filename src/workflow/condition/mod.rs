// SPDX-License-Identifier: MIT

//! Condition translation and evaluation for workflow transitions
//!
//! A transition's `condition` is authored Python-style, e.g.
//! - `doc.status == "Open"`
//! - `doc.grand_total > 1000 and not doc.is_return`
//!
//! [`translate`] rewrites it into operator syntax, [`parse`] builds an
//! [`Expression`] tree and [`evaluate`] walks it against a document. Nothing is
//! compiled or executed dynamically.

mod ast;
mod evaluator;
mod lexer;
mod parser;
mod translator;

pub use ast::{Coercion, CompareOp, Expression, Literal, Operand};
pub use evaluator::{evaluate, evaluate_condition, DOC_BINDING};
pub use parser::{parse, MAX_DEPTH};
pub use translator::translate;

use crate::error::ConditionError;
use crate::workflow::document::DocumentRecord;

/// Translate and parse an authored condition, reporting why it is invalid
pub fn validate(condition: &str) -> Result<Expression, ConditionError> {
    parse(&translate(condition))
}

/// Whether an authored condition holds for `doc`; empty conditions always hold
pub fn holds(condition: Option<&str>, doc: &DocumentRecord) -> bool {
    match condition.map(str::trim).filter(|c| !c.is_empty()) {
        None => true,
        Some(c) => evaluate_condition(&translate(c), doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate() {
        assert!(validate(r#"doc.status == "Open" and not doc.is_return"#).is_ok());
        assert!(validate("doc.grand_total >= 1000").is_ok());
        assert!(matches!(
            validate("frappe.db.get_value(\"User\", doc.owner)"),
            Err(ConditionError::UnexpectedChar { ch: ',', .. })
        ));
        assert!(matches!(
            validate("doc.x in ['a']"),
            Err(ConditionError::UnexpectedChar { ch: '[', .. })
        ));
        assert_eq!(
            validate("doc.owner.startswith(\"a\")"),
            Err(ConditionError::UnexpectedToken {
                found: "(".to_string(),
                offset: 20,
                expected: "end of expression",
            })
        );
    }

    #[test]
    fn test_holds() {
        let doc = DocumentRecord::from_json(json!({"status": "Open", "is_return": 0}));
        assert!(holds(None, &doc));
        assert!(holds(Some(""), &doc));
        assert!(holds(Some("  "), &doc));
        assert!(holds(Some(r#"doc.status == "Open" and not doc.is_return"#), &doc));
        assert!(!holds(Some(r#"doc.status == "Closed""#), &doc));
        assert!(!holds(Some("doc.status ="), &doc));
    }

    #[test]
    fn test_python_style_end_to_end() {
        let doc = DocumentRecord::from_json(json!({
            "a": "x", "b": "y", "qty": 3, "flag": true, "note": null
        }));
        assert!(holds(Some(r#"doc.a == "x" and doc.b == "y""#), &doc));
        assert!(holds(Some("doc.qty == 3 and doc.flag == True"), &doc));
        assert!(holds(Some("doc.note == None"), &doc));
        assert!(holds(Some("doc.missing == None"), &doc));
        assert!(holds(Some("int(doc.qty) == 3 or False"), &doc));
        assert!(!holds(Some("not (doc.qty == 3)"), &doc));
    }
}
