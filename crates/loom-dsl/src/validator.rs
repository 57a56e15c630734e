use serde_json::Value;

/// A single schema or policy violation, as a JSON Pointer plus a
/// user-visible message (spec §4.4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub pointer: String,
    pub message: String,
}

impl ValidationError {
    fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

const ASSERT_KINDS: &[&str] = &[
    "visible",
    "invisible",
    "text_contains",
    "text_equals",
    "text_regex",
    "count_equals",
    "count_at_least",
];

const TEXT_ASSERT_KINDS: &[&str] = &["text_contains", "text_equals", "text_regex"];
const COUNT_ASSERT_KINDS: &[&str] = &["count_equals", "count_at_least"];

/// Selector fragments that never belong in a Playwright-compatible CSS
/// selector (spec §3 invariant, §4.4).
pub const DISALLOWED_SELECTOR_FRAGMENTS: &[&str] = &[":contains", "::", "contains(", "[text()"];

/// Validates a raw ActionPlan JSON value against the fixed DSL schema.
/// Returns every violation found; an empty vec means the plan is accepted.
pub fn validate_action_plan(plan: &Value) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let Some(meta) = plan.get("meta") else {
        errors.push(ValidationError::new("/meta", "meta is required"));
        errors.push(ValidationError::new("/steps", "steps is required"));
        return errors;
    };

    if !meta
        .get("testId")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
    {
        errors.push(ValidationError::new("/meta/testId", "meta.testId is required"));
    }
    if !meta
        .get("baseUrl")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
    {
        errors.push(ValidationError::new("/meta/baseUrl", "meta.baseUrl is required"));
    }

    match plan.get("steps") {
        Some(Value::Array(steps)) => {
            for (index, step) in steps.iter().enumerate() {
                validate_step(index, step, &mut errors);
            }
        }
        Some(_) => errors.push(ValidationError::new("/steps", "steps must be an array")),
        None => errors.push(ValidationError::new("/steps", "steps is required")),
    }

    errors
}

fn validate_step(index: usize, step: &Value, errors: &mut Vec<ValidationError>) {
    let base = format!("/steps/{index}");
    let t = step.get("t").and_then(Value::as_str);

    let Some(t) = t else {
        errors.push(ValidationError::new(format!("{base}/t"), "step.t is required"));
        return;
    };

    match t {
        "goto" => require_non_empty_string(step, "url", &base, errors),
        "fill" => {
            require_non_empty_string(step, "selector", &base, errors);
            if step.get("value").is_none() {
                errors.push(ValidationError::new(
                    format!("{base}/value"),
                    "fill requires value",
                ));
            }
        }
        "click" => require_non_empty_string(step, "selector", &base, errors),
        "assert" => {
            require_non_empty_string(step, "selector", &base, errors);
            validate_assert_kind(step, &base, errors);
        }
        other => {
            errors.push(ValidationError::new(
                format!("{base}/t"),
                format!("unknown step type: {other}"),
            ));
        }
    }

    if let Some(selector) = step.get("selector").and_then(Value::as_str) {
        check_selector_fragments(selector, &format!("{base}/selector"), errors);
    }
}

fn validate_assert_kind(step: &Value, base: &str, errors: &mut Vec<ValidationError>) {
    let Some(kind) = step.get("kind").and_then(Value::as_str) else {
        errors.push(ValidationError::new(
            format!("{base}/kind"),
            "assert requires kind",
        ));
        return;
    };

    if !ASSERT_KINDS.contains(&kind) {
        errors.push(ValidationError::new(
            format!("{base}/kind"),
            format!("unknown assert kind: {kind}"),
        ));
        return;
    }

    if TEXT_ASSERT_KINDS.contains(&kind) && step.get("value").is_none() {
        errors.push(ValidationError::new(
            format!("{base}/value"),
            format!("assert kind {kind} requires value"),
        ));
    }

    if COUNT_ASSERT_KINDS.contains(&kind) {
        match step.get("value") {
            Some(Value::Number(n)) if n.as_i64().is_some_and(|v| v >= 0) => {}
            Some(Value::String(s)) if s.parse::<u64>().is_ok() => {}
            _ => errors.push(ValidationError::new(
                format!("{base}/value"),
                format!("assert kind {kind} requires a non-negative integer value"),
            )),
        }
    }
}

fn require_non_empty_string(
    step: &Value,
    field: &str,
    base: &str,
    errors: &mut Vec<ValidationError>,
) {
    if !step
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
    {
        errors.push(ValidationError::new(
            format!("{base}/{field}"),
            format!("{field} is required"),
        ));
    }
}

fn check_selector_fragments(selector: &str, pointer: &str, errors: &mut Vec<ValidationError>) {
    for fragment in DISALLOWED_SELECTOR_FRAGMENTS {
        if selector.contains(fragment) {
            errors.push(ValidationError::new(
                pointer,
                format!("selector contains disallowed fragment `{fragment}`: {selector}"),
            ));
        }
    }
}

/// Renders a set of violations as a single user-visible message, used to
/// build the compiler's repair-prompt follow-up.
pub fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.pointer, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_a_minimal_valid_plan() {
        let plan = json!({
            "meta": {"testId": "REQ-X", "baseUrl": "https://example.com"},
            "steps": [
                {"t": "goto", "url": "https://example.com"},
                {"t": "fill", "selector": "#q", "value": "hi"},
                {"t": "click", "selector": "#submit"},
                {"t": "assert", "selector": "#result", "kind": "visible"},
            ]
        });
        assert!(validate_action_plan(&plan).is_empty());
    }

    #[test]
    fn rejects_missing_meta_fields() {
        let plan = json!({"meta": {}, "steps": []});
        let errors = validate_action_plan(&plan);
        assert!(errors.iter().any(|e| e.pointer == "/meta/testId"));
        assert!(errors.iter().any(|e| e.pointer == "/meta/baseUrl"));
    }

    #[test]
    fn rejects_disallowed_selector_fragments() {
        let plan = json!({
            "meta": {"testId": "REQ-X", "baseUrl": "https://example.com"},
            "steps": [{"t": "click", "selector": "div:contains('buy')"}]
        });
        let errors = validate_action_plan(&plan);
        assert!(errors.iter().any(|e| e.pointer == "/steps/0/selector"));
    }

    #[test]
    fn requires_value_for_text_assertions() {
        let plan = json!({
            "meta": {"testId": "REQ-X", "baseUrl": "https://example.com"},
            "steps": [{"t": "assert", "selector": "#a", "kind": "text_contains"}]
        });
        let errors = validate_action_plan(&plan);
        assert!(errors.iter().any(|e| e.pointer == "/steps/0/value"));
    }

    #[test]
    fn accepts_string_encoded_count_value() {
        let plan = json!({
            "meta": {"testId": "REQ-X", "baseUrl": "https://example.com"},
            "steps": [{"t": "assert", "selector": ".item", "kind": "count_at_least", "value": "3"}]
        });
        assert!(validate_action_plan(&plan).is_empty());
    }

    #[test]
    fn rejects_negative_count_value() {
        let plan = json!({
            "meta": {"testId": "REQ-X", "baseUrl": "https://example.com"},
            "steps": [{"t": "assert", "selector": ".item", "kind": "count_equals", "value": -1}]
        });
        let errors = validate_action_plan(&plan);
        assert!(errors.iter().any(|e| e.pointer == "/steps/0/value"));
    }
}
