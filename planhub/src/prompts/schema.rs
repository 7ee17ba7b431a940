//! Per-template variable schemas
//!
//! Validation runs before any hashing or storage I/O and collects every
//! violation rather than stopping at the first, so a caller fixing input
//! errors sees the full list at once.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Variable value kinds a template can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    String,
    Number,
    Array,
    Enum,
}

/// Schema for one template variable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableSpec {
    pub name: String,
    pub kind: VariableKind,
    pub required: bool,
    /// Minimum value (numbers) or length (strings, arrays)
    pub min: Option<f64>,
    /// Maximum value (numbers) or length (strings, arrays)
    pub max: Option<f64>,
    /// Regex the string form must match
    pub pattern: Option<String>,
    /// Allowed values for enum variables
    pub allowed: Option<Vec<String>>,
}

impl Default for VariableSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: VariableKind::String,
            required: true,
            min: None,
            max: None,
            pattern: None,
            allowed: None,
        }
    }
}

impl VariableSpec {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Number,
            ..Default::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// One schema violation for one variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub variable: String,
    pub reason: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.variable, self.reason)
    }
}

fn violation(variable: &str, reason: impl Into<String>) -> Violation {
    Violation {
        variable: variable.to_string(),
        reason: reason.into(),
    }
}

/// Validate variables against their specs, collecting all violations
pub fn validate_variables(specs: &[VariableSpec], variables: &Map<String, Value>) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();

    for spec in specs {
        match variables.get(&spec.name) {
            None => {
                if spec.required {
                    violations.push(violation(&spec.name, "required variable is missing"));
                }
            }
            Some(value) => check_value(spec, value, &mut violations),
        }
    }

    // Variables outside the schema would silently change the content hash
    // without affecting the render, so they are rejected too.
    for name in variables.keys() {
        if !specs.iter().any(|s| &s.name == name) {
            violations.push(violation(name, "variable is not declared by the template"));
        }
    }

    if violations.is_empty() { Ok(()) } else { Err(violations) }
}

fn check_value(spec: &VariableSpec, value: &Value, violations: &mut Vec<Violation>) {
    match spec.kind {
        VariableKind::String => {
            let Some(s) = value.as_str() else {
                violations.push(violation(&spec.name, "expected a string"));
                return;
            };
            check_length(spec, s.chars().count(), "characters", violations);
            if let Some(pattern) = &spec.pattern {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            violations.push(violation(&spec.name, format!("does not match pattern {}", pattern)));
                        }
                    }
                    Err(_) => violations.push(violation(&spec.name, format!("template pattern {} is invalid", pattern))),
                }
            }
        }
        VariableKind::Number => {
            let Some(n) = value.as_f64() else {
                violations.push(violation(&spec.name, "expected a number"));
                return;
            };
            if let Some(min) = spec.min {
                if n < min {
                    violations.push(violation(&spec.name, format!("below minimum {}", min)));
                }
            }
            if let Some(max) = spec.max {
                if n > max {
                    violations.push(violation(&spec.name, format!("above maximum {}", max)));
                }
            }
        }
        VariableKind::Array => {
            let Some(items) = value.as_array() else {
                violations.push(violation(&spec.name, "expected an array"));
                return;
            };
            check_length(spec, items.len(), "items", violations);
        }
        VariableKind::Enum => {
            let Some(s) = value.as_str() else {
                violations.push(violation(&spec.name, "expected a string from the allowed set"));
                return;
            };
            let allowed = spec.allowed.as_deref().unwrap_or_default();
            if !allowed.iter().any(|a| a == s) {
                violations.push(violation(
                    &spec.name,
                    format!("'{}' is not one of [{}]", s, allowed.join(", ")),
                ));
            }
        }
    }
}

fn check_length(spec: &VariableSpec, len: usize, unit: &str, violations: &mut Vec<Violation>) {
    if let Some(min) = spec.min {
        if (len as f64) < min {
            violations.push(violation(&spec.name, format!("fewer than {} {}", min, unit)));
        }
    }
    if let Some(max) = spec.max {
        if (len as f64) > max {
            violations.push(violation(&spec.name, format!("more than {} {}", max, unit)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn track_specs() -> Vec<VariableSpec> {
        vec![
            VariableSpec::string("TRACK_LABEL").bounds(1.0, 64.0),
            VariableSpec::number("TIME_PER_WEEK").bounds(1.0, 60.0),
            VariableSpec {
                name: "LEVEL".to_string(),
                kind: VariableKind::Enum,
                required: false,
                allowed: Some(vec!["beginner".into(), "intermediate".into(), "advanced".into()]),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_valid_variables_pass() {
        let result = validate_variables(
            &track_specs(),
            &vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5})),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_all_violations_collected_not_just_first() {
        let result = validate_variables(
            &track_specs(),
            &vars(json!({"TIME_PER_WEEK": 900, "LEVEL": "wizard"})),
        );

        let violations = result.unwrap_err();
        // missing TRACK_LABEL + out-of-range TIME_PER_WEEK + bad enum LEVEL
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().any(|v| v.variable == "TRACK_LABEL"));
        assert!(violations.iter().any(|v| v.variable == "TIME_PER_WEEK"));
        assert!(violations.iter().any(|v| v.variable == "LEVEL"));
    }

    #[test]
    fn test_type_mismatch_reported() {
        let result = validate_variables(&track_specs(), &vars(json!({"TRACK_LABEL": 7, "TIME_PER_WEEK": 5})));
        let violations = result.unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].reason.contains("string"));
    }

    #[test]
    fn test_undeclared_variable_rejected() {
        let result = validate_variables(
            &track_specs(),
            &vars(json!({"TRACK_LABEL": "AI/ML", "TIME_PER_WEEK": 5, "EXTRA": true})),
        );
        let violations = result.unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].variable, "EXTRA");
    }

    #[test]
    fn test_optional_variable_may_be_absent() {
        let specs = vec![VariableSpec::string("NOTE").optional()];
        assert!(validate_variables(&specs, &Map::new()).is_ok());
    }

    #[test]
    fn test_string_pattern_enforced() {
        let specs = vec![VariableSpec {
            name: "WEEK".to_string(),
            pattern: Some(r"^week-\d+$".to_string()),
            ..Default::default()
        }];
        assert!(validate_variables(&specs, &vars(json!({"WEEK": "week-3"}))).is_ok());
        assert!(validate_variables(&specs, &vars(json!({"WEEK": "3"}))).is_err());
    }

    #[test]
    fn test_array_length_bounds() {
        let specs = vec![VariableSpec {
            name: "TOPICS".to_string(),
            kind: VariableKind::Array,
            min: Some(1.0),
            max: Some(3.0),
            ..Default::default()
        }];
        assert!(validate_variables(&specs, &vars(json!({"TOPICS": ["a", "b"]}))).is_ok());
        assert!(validate_variables(&specs, &vars(json!({"TOPICS": []}))).is_err());
        assert!(validate_variables(&specs, &vars(json!({"TOPICS": ["a", "b", "c", "d"]}))).is_err());
    }
}
