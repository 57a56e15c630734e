use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Goto,
    Fill,
    Click,
    Assert,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Goto => "goto",
            StepType::Fill => "fill",
            StepType::Click => "click",
            StepType::Assert => "assert",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertKind {
    Visible,
    Invisible,
    TextContains,
    TextEquals,
    TextRegex,
    CountEquals,
    CountAtLeast,
}

impl AssertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertKind::Visible => "visible",
            AssertKind::Invisible => "invisible",
            AssertKind::TextContains => "text_contains",
            AssertKind::TextEquals => "text_equals",
            AssertKind::TextRegex => "text_regex",
            AssertKind::CountEquals => "count_equals",
            AssertKind::CountAtLeast => "count_at_least",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "visible" => AssertKind::Visible,
            "invisible" => AssertKind::Invisible,
            "text_contains" => AssertKind::TextContains,
            "text_equals" => AssertKind::TextEquals,
            "text_regex" => AssertKind::TextRegex,
            "count_equals" => AssertKind::CountEquals,
            "count_at_least" => AssertKind::CountAtLeast,
            _ => return None,
        })
    }

    pub fn is_count(&self) -> bool {
        matches!(self, AssertKind::CountEquals | AssertKind::CountAtLeast)
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            AssertKind::TextContains | AssertKind::TextEquals | AssertKind::TextRegex
        )
    }
}

/// One step of an `ActionPlan`. `value` is kept as a raw JSON value because
/// count assertions accept either a string or a number (see §3 of the spec).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionStep {
    pub t: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssertKind>,
}

impl ActionStep {
    pub fn value_as_str(&self) -> Option<String> {
        match &self.value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanMeta {
    #[serde(rename = "testId")]
    pub test_id: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "dataSource", default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
}

/// `{meta:{testId, baseUrl}, steps:[ActionStep]}`, the schema-validated JSON DSL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionPlan {
    pub meta: PlanMeta,
    pub steps: Vec<ActionStep>,
}
