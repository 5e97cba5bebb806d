//! Schema validation.
//!
//! # Design Decisions
//! - Fields are checked independently; each failing field gets one message
//! - A missing value on an optional field skips every other check
//! - `custom` runs only after the kind checks pass
//! - Numeric strings are coerced the way a JavaScript `Number()` call does

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, FieldErrors};
use crate::validation::rule::{FieldKind, FieldPattern, ValidationRule, ValidationSchema, Verdict};

/// Outcome of validating one value against a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

/// Validates `data` against every field of `schema`.
pub fn validate(data: &Value, schema: &ValidationSchema) -> ValidationResult {
    let mut errors = FieldErrors::new();

    for (field, rule) in schema.iter() {
        let value = data.as_object().and_then(|obj| obj.get(field));
        if let Some(message) = check_field(value, field, rule) {
            errors.entry(field.to_string()).or_default().push(message);
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors: (!errors.is_empty()).then_some(errors),
    }
}

/// Validates and fails with a 422 `ApiError::Validation` carrying every field error.
pub fn validate_or_throw(data: &Value, schema: &ValidationSchema) -> Result<(), ApiError> {
    match validate(data, schema).errors {
        Some(errors) => Err(ApiError::validation(errors)),
        None => Ok(()),
    }
}

/// Validates a request body and hands it back.
pub fn validate_body(body: Value, schema: &ValidationSchema) -> Result<Value, ApiError> {
    validate_or_throw(&body, schema)?;
    Ok(body)
}

/// Validates query parameters and hands them back.
pub fn validate_query(query: Value, schema: &ValidationSchema) -> Result<Value, ApiError> {
    validate_or_throw(&query, schema)?;
    Ok(query)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn check_field(value: Option<&Value>, field: &str, rule: &ValidationRule) -> Option<String> {
    if is_blank(value) {
        return rule.required.then(|| format!("{field} is required"));
    }
    let value = value?;

    if let Some(message) = check_kind(value, field, rule) {
        return Some(message);
    }

    let custom = rule.custom.as_ref()?;
    match custom(value) {
        Verdict::Valid => None,
        Verdict::Invalid => Some(format!("{field} is invalid")),
        Verdict::Message(message) => Some(message),
    }
}

fn check_kind(value: &Value, field: &str, rule: &ValidationRule) -> Option<String> {
    match rule.kind {
        FieldKind::String => {
            let Value::String(s) = value else {
                return Some(format!("{field} must be a string"));
            };
            let len = s.chars().count() as f64;
            if let Some(min) = rule.min.filter(|min| len < *min) {
                return Some(format!("{field} must be at least {min} characters"));
            }
            if let Some(max) = rule.max.filter(|max| len > *max) {
                return Some(format!("{field} must be at most {max} characters"));
            }
            if let Some(pattern) = &rule.pattern {
                return match pattern_matches(pattern, s) {
                    Some(true) => None,
                    Some(false) => Some(format!("{field} does not match the required pattern")),
                    None => Some(format!("{field} has an invalid pattern")),
                };
            }
            None
        }
        FieldKind::Number => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => coerce_number(s),
                _ => None,
            };
            let Some(number) = number.filter(|n| !n.is_nan()) else {
                return Some(format!("{field} must be a number"));
            };
            if let Some(min) = rule.min.filter(|min| number < *min) {
                return Some(format!("{field} must be at least {min}"));
            }
            if let Some(max) = rule.max.filter(|max| number > *max) {
                return Some(format!("{field} must be at most {max}"));
            }
            None
        }
        FieldKind::Boolean => match value {
            Value::Bool(_) => None,
            Value::String(s)
                if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") =>
            {
                None
            }
            _ => Some(format!("{field} must be a boolean")),
        },
        FieldKind::Object => {
            (!value.is_object()).then(|| format!("{field} must be an object"))
        }
        FieldKind::Array => {
            let Value::Array(items) = value else {
                return Some(format!("{field} must be an array"));
            };
            let len = items.len() as f64;
            if let Some(min) = rule.min.filter(|min| len < *min) {
                return Some(format!("{field} must have at least {min} items"));
            }
            if let Some(max) = rule.max.filter(|max| len > *max) {
                return Some(format!("{field} must have at most {max} items"));
            }
            None
        }
    }
}

/// `None` when the pattern source does not compile.
fn pattern_matches(pattern: &FieldPattern, value: &str) -> Option<bool> {
    match pattern {
        FieldPattern::Compiled(re) => Some(re.is_match(value)),
        FieldPattern::Source(source) => Regex::new(source).ok().map(|re| re.is_match(value)),
    }
}

/// Numeric coercion of a string, following JavaScript `Number()`.
fn coerce_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0.0);
    }

    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u128::from_str_radix(digits, radix).ok().map(|n| n as f64);
    }

    // Rust accepts "inf" and "nan", JavaScript does not.
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse::<f64>().ok()
}
