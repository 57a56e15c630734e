use loom_core_types::dom::Control;
use loom_core_types::profile::SiteAlias;
use regex::Regex;

const SEARCH_KEYWORDS: &str = "search|lookup|find";

fn matches_search_hint(control: &Control) -> bool {
    let re = Regex::new(SEARCH_KEYWORDS).unwrap();
    let haystack = [
        control.attrs.id.as_deref(),
        control.attrs.class.as_deref(),
        control.attrs.role.as_deref(),
        Some(control.path.as_str()),
        control.attrs.aria_label.as_deref(),
        control.attrs.name.as_deref(),
        control.attrs.data_test.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();
    re.is_match(&haystack)
}

/// Builds the most specific selector available for a control, in the
/// fallback order `#id` → `tag.firstClass` → `[data-test=...]` →
/// `[name=...]` → `[aria-label=...]` → its computed path.
fn synthesize_selector(control: &Control) -> String {
    if let Some(id) = &control.attrs.id {
        if !id.is_empty() {
            return format!("#{id}");
        }
    }
    if let Some(class) = &control.attrs.class {
        if let Some(first) = class.split_whitespace().next() {
            return format!("{}.{first}", control.tag);
        }
    }
    if let Some(data_test) = &control.attrs.data_test {
        if !data_test.is_empty() {
            return format!("[data-test=\"{data_test}\"]");
        }
    }
    if let Some(name) = &control.attrs.name {
        if !name.is_empty() {
            return format!("[name=\"{name}\"]");
        }
    }
    if let Some(aria) = &control.attrs.aria_label {
        if !aria.is_empty() {
            return format!("[aria-label=\"{aria}\"]");
        }
    }
    control.path.clone()
}

/// Synthesizes `search.input`/`search.button` aliases from the control
/// inventory when the LLM didn't already name them (spec §4.3).
pub fn synthesize_search_aliases(controls: &[Control], aliases: &mut Vec<SiteAlias>) {
    let has_alias = |name: &str, aliases: &[SiteAlias]| aliases.iter().any(|a| a.name == name);

    if !has_alias("search.input", aliases) {
        if let Some(control) = controls
            .iter()
            .filter(|c| matches!(c.tag.as_str(), "input" | "textarea"))
            .find(|c| matches_search_hint(c))
        {
            aliases.push(SiteAlias {
                name: "search.input".to_string(),
                selector: synthesize_selector(control),
                description: Some("deterministically synthesized search input".to_string()),
                role: Some("输入框".to_string()),
                confidence: None,
                notes: None,
                page_id: None,
            });
        }
    }

    if !has_alias("search.button", aliases) {
        if let Some(control) = controls
            .iter()
            .filter(|c| c.tag == "button")
            .find(|c| matches_search_hint(c))
        {
            aliases.push(SiteAlias {
                name: "search.button".to_string(),
                selector: synthesize_selector(control),
                description: Some("deterministically synthesized search button".to_string()),
                role: Some("按钮".to_string()),
                confidence: None,
                notes: None,
                page_id: None,
            });
        }
    }
}

/// Normalizes a detail-page name: strips quotes, keeps only the text before
/// the first separator (`：:——— - --`), caps it to 10 characters, and
/// suffixes with `详情页`.
pub fn normalize_detail_page_name(raw: &str) -> String {
    const SUFFIX: &str = "详情页";
    const SEPARATORS: &[&str] = &["——", "：", "---", "--", " - ", ":", "—", "-"];

    let stripped: &str = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '“' || c == '”');

    let mut head = stripped;
    for sep in SEPARATORS {
        if let Some((before, _)) = head.split_once(sep) {
            head = before.trim();
        }
    }

    let stem: String = head.chars().take(10).collect();
    if stem.ends_with(SUFFIX) {
        stem
    } else {
        format!("{stem}{SUFFIX}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core_types::dom::NodeAttrs;

    fn control(tag: &str, attrs: NodeAttrs, path: &str) -> Control {
        Control {
            dom_id: "dom-1".to_string(),
            tag: tag.to_string(),
            attrs,
            path: path.to_string(),
        }
    }

    #[test]
    fn synthesizes_search_input_when_missing() {
        let controls = vec![control(
            "input",
            NodeAttrs {
                name: Some("searchKeyword".to_string()),
                ..Default::default()
            },
            "body > input",
        )];
        let mut aliases = Vec::new();
        synthesize_search_aliases(&controls, &mut aliases);
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].name, "search.input");
        assert_eq!(aliases[0].selector, "[name=\"searchKeyword\"]");
    }

    #[test]
    fn does_not_duplicate_existing_alias() {
        let controls = vec![control(
            "input",
            NodeAttrs {
                name: Some("searchKeyword".to_string()),
                ..Default::default()
            },
            "body > input",
        )];
        let mut aliases = vec![SiteAlias {
            name: "search.input".to_string(),
            selector: "#already".to_string(),
            description: None,
            role: None,
            confidence: None,
            notes: None,
            page_id: None,
        }];
        synthesize_search_aliases(&controls, &mut aliases);
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].selector, "#already");
    }

    #[test]
    fn normalizes_detail_page_name() {
        assert_eq!(
            normalize_detail_page_name("\"超长的商品标题示例文本\""),
            "超长的商品标题示例文详情页"
        );
        assert_eq!(normalize_detail_page_name("订单 - 详情"), "订单详情页");
    }
}
