//! Verdict parsing from model output.

use serde_json::Value;
use tracing::warn;

use patchwatch_common::{Severity, Verdict};

use crate::util::{extract_json_object, one_line};

/// Parse a completion into a normalized verdict.
///
/// Never fails: output without a JSON object, or without a boolean
/// `is_vulnerable`, becomes [`Verdict::negative`] and is logged.
pub fn parse_verdict(content: &str) -> Verdict {
    let Some(json) = extract_json_object(content) else {
        warn!(
            output = %one_line(content, 120),
            "Classifier output contained no JSON object; treating as negative"
        );
        return Verdict::negative();
    };

    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Classifier JSON did not parse; treating as negative");
            return Verdict::negative();
        }
    };

    let Some(is_vulnerable) = read_flag(&value) else {
        warn!("Classifier JSON lacks a boolean is_vulnerable; treating as negative");
        return Verdict::negative();
    };

    Verdict {
        is_vulnerable,
        vulnerability_type: read_text(&value, "vulnerability_type"),
        severity: read_text(&value, "severity").and_then(|s| Severity::parse_lenient(&s)),
        description: read_text(&value, "description"),
        evidence: read_text(&value, "evidence"),
        proof_of_concept: read_text(&value, "proof_of_concept"),
        cwe_id: read_text(&value, "cwe_id"),
        attack_vector: read_text(&value, "attack_vector"),
        affected_component: read_text(&value, "affected_component"),
    }
    .normalize()
}

/// Accepts a JSON bool, or the strings "true"/"false" some models emit.
fn read_flag(value: &Value) -> Option<bool> {
    match value.get("is_vulnerable")? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Strings are taken as-is; numbers are stringified (e.g. `"cwe_id": 79`).
fn read_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
