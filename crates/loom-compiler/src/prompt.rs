use loom_core_types::profile::SiteProfile;
use loom_core_types::request::TestRequest;
use loom_llm::ChatMessage;

const DSL_SPEC_PROMPT: &str = r#"ActionPlan JSON Schema:
{
  "meta": {"testId": "string", "baseUrl": "string"},
  "steps": [
    {"t": "goto", "url": "string"},
    {"t": "fill", "selector": "string", "value": "string"},
    {"t": "click", "selector": "string", "value": "string?"},
    {"t": "assert", "selector": "string", "kind": "visible|invisible|text_contains|text_equals|text_regex|count_equals|count_at_least", "value": "string|number?"}
  ]
}

Generation rules:
- Selectors are Playwright CSS; for text filtering use :has-text("...") (never :contains).
- Prefer alias selectors from the Site Profile listing provided below.
- Match operation type to element role: fill -> input-like aliases; click -> button/link-like aliases; assert -> text/title/image aliases.
- Images: kind must be visible; never combine img with :has-text.

Exemplar plan:
{
  "meta": {"testId": "REQ-EXAMPLE", "baseUrl": "https://example.com"},
  "steps": [
    {"t": "goto", "url": "https://example.com"},
    {"t": "fill", "selector": "#search-input", "value": "widgets"},
    {"t": "click", "selector": "#search-button"},
    {"t": "assert", "selector": ".result-title", "kind": "text_contains", "value": "widgets"}
  ]
}
"#;

fn summarize_request(request: &TestRequest) -> String {
    let mut out = format!("Test request: {}\n", request.title);
    if let Some(base_url) = &request.base_url {
        out.push_str(&format!("Base URL: {base_url}\n"));
    }
    out.push_str("Steps:\n");
    for step in &request.steps {
        out.push_str(&format!("{}. {}\n", step.index, step.text));
    }
    out
}

fn summarize_profile(profile: &SiteProfile) -> String {
    if profile.pages.is_empty() {
        return "Site Profile: (empty)".to_string();
    }
    let mut out = String::from("Site Profile aliases (name -> selector, role, description):\n");
    for page in &profile.pages {
        out.push_str(&format!("# page {} ({})\n", page.name, page.url_pattern));
        for alias in page.aliases.values() {
            out.push_str(&format!(
                "{} -> {}, {}, {}\n",
                alias.name,
                alias.selector,
                alias.role.as_deref().unwrap_or("?"),
                alias.description.as_deref().unwrap_or("")
            ));
        }
    }
    out
}

/// Builds the three-message opening per spec §4.5.
pub fn initial_messages(request: &TestRequest, profile: &SiteProfile) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a senior UI automation DSL compiler. Strictly follow the provided JSON \
             schema and output only JSON.",
        ),
        ChatMessage::user(DSL_SPEC_PROMPT),
        ChatMessage::user(format!(
            "{}\n\n{}\n\nGenerate the complete ActionPlan JSON for the request above.",
            summarize_request(request),
            summarize_profile(profile)
        )),
    ]
}

/// The follow-up message appended after a failed attempt, quoting the fault.
pub fn repair_message(fault: &str) -> ChatMessage {
    ChatMessage::user(format!(
        "The previously generated JSON has problems:\n{fault}\n\
         Please regenerate the complete, schema-valid JSON. Output only JSON."
    ))
}
