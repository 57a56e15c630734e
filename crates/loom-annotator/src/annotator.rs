use std::sync::Arc;

use loom_core_types::dom::Snapshot;
use loom_core_types::profile::{AnnotatedPage, SiteAlias};
use loom_llm::{ChatMessage, LlmClient};
use serde_json::Value;
use tracing::{debug, warn};

use crate::enrichment::{normalize_detail_page_name, synthesize_search_aliases};
use crate::errors::AnnotatorError;
use crate::repair::extract_json;

/// Context the caller supplies alongside a `Snapshot` (spec §4.3 `hints`).
#[derive(Clone, Debug, Default)]
pub struct AnnotationHints {
    pub site_name: Option<String>,
    pub base_url: Option<String>,
    pub is_detail_page: bool,
    pub detail_label: Option<String>,
    pub temperature: f32,
    pub model: Option<String>,
}

pub struct ProfileAnnotator {
    client: Arc<dyn LlmClient>,
}

impl ProfileAnnotator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn annotate(
        &self,
        snapshot: &Snapshot,
        hints: &AnnotationHints,
    ) -> Result<AnnotatedPage, AnnotatorError> {
        let dom_summary = dom_summary_json(snapshot);
        let messages = build_prompt(snapshot, hints, &dom_summary);

        let reply = self
            .client
            .chat_completion(&messages, hints.model.as_deref(), hints.temperature)
            .await?;

        let payload = extract_json(&reply)?;
        let page_payload = payload
            .get("page")
            .ok_or(AnnotatorError::MissingPage)?;

        let page_id = page_payload
            .get("id")
            .or_else(|| page_payload.get("page_id"))
            .and_then(Value::as_str)
            .ok_or(AnnotatorError::MissingPageId)?
            .to_string();

        let mut page_name = page_payload
            .get("name")
            .or_else(|| page_payload.get("title"))
            .and_then(Value::as_str)
            .unwrap_or(&page_id)
            .to_string();

        if hints.is_detail_page {
            page_name = normalize_detail_page_name(&page_name);
        }

        let url_pattern = page_payload
            .get("url_pattern")
            .or_else(|| page_payload.get("path"))
            .and_then(Value::as_str)
            .unwrap_or(&snapshot.url)
            .to_string();

        let summary = page_payload
            .get("summary")
            .or_else(|| page_payload.get("description"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let aliases_payload = page_payload
            .get("aliases")
            .or_else(|| page_payload.get("elements"));
        let mut aliases = normalise_aliases(aliases_payload);
        if aliases.is_empty() {
            warn!(page_id = %page_id, "LLM did not identify any aliases");
        }

        synthesize_search_aliases(&snapshot.controls, &mut aliases);

        let warnings = payload
            .get("warnings")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(AnnotatedPage {
            page_id,
            page_name,
            url_pattern,
            summary,
            aliases,
            warnings,
        })
    }
}

fn dom_summary_json(snapshot: &Snapshot) -> Value {
    serde_json::json!({
        "dom_tree": snapshot.dom_tree,
        "controls": snapshot.controls,
        "stats": snapshot.stats,
    })
}

fn build_prompt(snapshot: &Snapshot, hints: &AnnotationHints, dom_summary: &Value) -> Vec<ChatMessage> {
    let dom_json = serde_json::to_string_pretty(dom_summary).unwrap_or_default();
    debug!(chars = dom_json.len(), "DOM summary token estimate");

    let detail_hint = if hints.is_detail_page {
        let label = hints.detail_label.as_deref().unwrap_or("详情页");
        format!(
            "这是{label}，请以更抽象、更概括的方式描述板块和元素，不要逐字复述长文本。\
             请明确详情页主标题所在元素，并列出页面展示的核心数据项目，逐项说明用途与定位线索。"
        )
    } else {
        String::new()
    };
    let detail_line = if detail_hint.is_empty() {
        String::new()
    } else {
        format!("页面类型提示: {detail_hint}\n")
    };

    let system = ChatMessage::system(
        "你是前端测试工程专家，需要从页面 DOM 摘要中提取可用于 UI 自动化的元素别名。\
         先理解页面的大致功能，再逐功能区块进行解析和抽取。\
         输出严格符合 JSON 格式，包含页面元信息、别名和推荐选择器。",
    );

    let user = ChatMessage::user(format!(
        "请根据以下上下文生成页面标定草稿。\n\n\
         URL: {url}\n页面标题: {title}\n站点名称: {site_name}\n站点 BaseURL: {base_url}\n{detail_line}\
         请输出 JSON，字段示例如下：\n\
         {{\n  \"page\": {{\n    \"id\": \"page_id\",\n    \"name\": \"页面名称\",\n\
         \"url_pattern\": \"/path\",\n    \"summary\": \"页面用途概述\",\n    \"aliases\": {{\n\
         \"alias.name\": {{\n        \"selector\": \"data-test=example\",\n\
         \"description\": \"元素作用说明\",\n        \"role\": \"按钮\",\n        \"confidence\": 0.8\n\
         }}\n    }}\n  }},\n  \"warnings\": []\n}}\n\
         DOM 摘要 (JSON 字符串):\n```json\n{dom_json}\n```",
        url = snapshot.url,
        title = if snapshot.title.is_empty() { "未知" } else { &snapshot.title },
        site_name = hints.site_name.as_deref().unwrap_or("未提供"),
        base_url = hints.base_url.as_deref().unwrap_or("未提供"),
    ));

    vec![system, user]
}

/// Normalizes an `aliases` payload that may arrive as a `{name: {...}}`
/// object or a `[{alias|name, ...}]` list (spec §4.3).
fn normalise_aliases(raw: Option<&Value>) -> Vec<SiteAlias> {
    let mut out = Vec::new();
    match raw {
        Some(Value::Object(map)) => {
            for (name, payload) in map {
                if let Some(alias) = alias_from_payload(name, payload) {
                    out.push(alias);
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let name = item
                    .get("alias")
                    .or_else(|| item.get("name"))
                    .and_then(Value::as_str);
                if let Some(name) = name {
                    if let Some(alias) = alias_from_payload(name, item) {
                        out.push(alias);
                    }
                }
            }
        }
        _ => {}
    }
    out
}

fn alias_from_payload(name: &str, payload: &Value) -> Option<SiteAlias> {
    let selector = payload.get("selector").and_then(Value::as_str)?.to_string();
    let confidence = match payload.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        _ => None,
    };
    Some(SiteAlias {
        name: name.to_string(),
        selector,
        description: payload
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        role: payload.get("role").and_then(Value::as_str).map(str::to_string),
        confidence,
        notes: payload.get("notes").and_then(Value::as_str).map(str::to_string),
        page_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_dict_shaped_aliases() {
        let raw = serde_json::json!({
            "search.input": {"selector": "#q", "role": "输入框", "confidence": "0.9"}
        });
        let aliases = normalise_aliases(Some(&raw));
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].name, "search.input");
        assert_eq!(aliases[0].confidence, Some(0.9));
    }

    #[test]
    fn normalises_list_shaped_aliases() {
        let raw = serde_json::json!([
            {"alias": "search.button", "selector": ".btn"},
            {"selector": "missing-name-is-skipped"},
        ]);
        let aliases = normalise_aliases(Some(&raw));
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].name, "search.button");
    }
}
