//! Classification verdicts.
//!
//! A [`Verdict`] is the oracle's judgment about whether a commit patches an
//! exploitable issue. Oracle output is untrusted: every verdict that leaves
//! the classifier goes through [`Verdict::normalize`], which enforces the
//! contract that a negative verdict carries no detail fields and cleans up
//! the detail text of positive ones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted value for short classification fields.
const MAX_SHORT_FIELD: usize = 200;
/// Longest accepted value for free-text fields (description, evidence, PoC).
const MAX_TEXT_FIELD: usize = 8_000;

/// Severity of a detected vulnerability, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl Severity {
    /// Lenient parse used on oracle output; unknown strings yield `None`.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "informational" | "info" => Some(Self::Informational),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Informational => "informational",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_vulnerable: bool,
    pub vulnerability_type: Option<String>,
    pub severity: Option<Severity>,
    pub description: Option<String>,
    pub evidence: Option<String>,
    pub proof_of_concept: Option<String>,
    /// CWE identifier, e.g. `CWE-79`.
    pub cwe_id: Option<String>,
    /// e.g. `network`, `local`, `adjacent`.
    pub attack_vector: Option<String>,
    pub affected_component: Option<String>,
}

impl Verdict {
    /// The all-null negative verdict.
    pub fn negative() -> Self {
        Self::default()
    }

    /// Enforce the verdict contract on untrusted oracle output.
    ///
    /// A negative verdict is returned with every detail field cleared, no
    /// matter what the raw response contained. For positive verdicts each text
    /// field is stripped of control characters, trimmed, capped in length and
    /// dropped if empty.
    pub fn normalize(self) -> Self {
        if !self.is_vulnerable {
            return Self::negative();
        }
        Self {
            is_vulnerable: true,
            vulnerability_type: clean(self.vulnerability_type, MAX_SHORT_FIELD, false),
            severity: self.severity,
            description: clean(self.description, MAX_TEXT_FIELD, true),
            evidence: clean(self.evidence, MAX_TEXT_FIELD, true),
            proof_of_concept: clean(self.proof_of_concept, MAX_TEXT_FIELD, true),
            cwe_id: clean(self.cwe_id, MAX_SHORT_FIELD, false),
            attack_vector: clean(self.attack_vector, MAX_SHORT_FIELD, false),
            affected_component: clean(self.affected_component, MAX_SHORT_FIELD, false),
        }
    }

    /// True when no detail field is set.
    pub fn has_no_details(&self) -> bool {
        self.vulnerability_type.is_none()
            && self.severity.is_none()
            && self.description.is_none()
            && self.evidence.is_none()
            && self.proof_of_concept.is_none()
            && self.cwe_id.is_none()
            && self.attack_vector.is_none()
            && self.affected_component.is_none()
    }
}

fn clean(value: Option<String>, max_chars: usize, multiline: bool) -> Option<String> {
    let value = value?;
    let filtered: String = value
        .chars()
        .map(|c| {
            if !multiline && (c == '\t' || c == '\n') {
                ' '
            } else {
                c
            }
        })
        .filter(|c| !c.is_control() || (multiline && (*c == '\n' || *c == '\t')))
        .take(max_chars)
        .collect();
    let trimmed = filtered.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_negative() -> Verdict {
        Verdict {
            is_vulnerable: false,
            vulnerability_type: Some("SQL injection".into()),
            severity: Some(Severity::High),
            description: Some("looks bad".into()),
            evidence: Some("line 4".into()),
            proof_of_concept: Some("' OR 1=1".into()),
            cwe_id: Some("CWE-89".into()),
            attack_vector: Some("network".into()),
            affected_component: Some("db".into()),
        }
    }

    #[test]
    fn negative_verdict_is_forced_to_all_null() {
        let normalized = noisy_negative().normalize();
        assert!(!normalized.is_vulnerable);
        assert!(normalized.has_no_details());
        assert_eq!(normalized, Verdict::negative());
    }

    #[test]
    fn positive_verdict_keeps_details() {
        let mut verdict = noisy_negative();
        verdict.is_vulnerable = true;
        let normalized = verdict.clone().normalize();
        assert_eq!(normalized, verdict);
    }

    #[test]
    fn positive_verdict_strips_control_characters() {
        let verdict = Verdict {
            is_vulnerable: true,
            vulnerability_type: Some("XSS\u{1b}[31m\tin\nform".into()),
            description: Some("  line one\nline\u{7} two  ".into()),
            ..Verdict::default()
        };
        let normalized = verdict.normalize();
        assert_eq!(
            normalized.vulnerability_type.as_deref(),
            Some("XSS[31m in form")
        );
        assert_eq!(normalized.description.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn positive_verdict_drops_blank_fields_and_caps_length() {
        let verdict = Verdict {
            is_vulnerable: true,
            evidence: Some("   ".into()),
            cwe_id: Some("x".repeat(500)),
            ..Verdict::default()
        };
        let normalized = verdict.normalize();
        assert!(normalized.evidence.is_none());
        assert_eq!(normalized.cwe_id.unwrap().len(), MAX_SHORT_FIELD);
    }

    #[test]
    fn severity_parse_is_lenient() {
        assert_eq!(Severity::parse_lenient("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse_lenient(" moderate "), Some(Severity::Medium));
        assert_eq!(Severity::parse_lenient("info"), Some(Severity::Informational));
        assert_eq!(Severity::parse_lenient("catastrophic"), None);
    }

    #[test]
    fn severity_orders_most_severe_first() {
        assert!(Severity::Critical < Severity::Low);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }
}
