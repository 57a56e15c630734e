use std::collections::HashMap;

use loom_core_types::profile::SiteAlias;
use serde_json::Value;

use crate::snapping::{is_buy_button_alias, is_product_name_alias, shares_two_path_segments};

fn append_has_text(selector: &str, value: &str) -> String {
    if selector.contains(":has-text(") {
        return selector.to_string();
    }
    let escaped = value.replace('"', "\\\"");
    format!("{selector}:has-text(\"{escaped}\")")
}

fn str_field<'a>(step: &'a Value, field: &str) -> Option<&'a str> {
    step.get(field).and_then(Value::as_str)
}

fn find_related_item_alias<'a>(
    list_alias: &SiteAlias,
    aliases: &'a [SiteAlias],
) -> Option<&'a SiteAlias> {
    aliases.iter().find(|a| {
        a.name != list_alias.name
            && (a.name.to_lowercase().contains("item") || a.name.to_lowercase().contains("link"))
            && shares_two_path_segments(&list_alias.selector, &a.selector)
    })
}

fn find_buy_button_sibling<'a>(
    product_alias: Option<&SiteAlias>,
    aliases: &'a [SiteAlias],
) -> Option<&'a SiteAlias> {
    aliases.iter().find(|candidate| {
        if !is_buy_button_alias(candidate) {
            return false;
        }
        match product_alias {
            Some(product) => shares_two_path_segments(&product.selector, &candidate.selector),
            None => true,
        }
    })
}

/// Threads textual context between steps and applies the
/// product-name-to-buy-button correction (spec §4.5 steps 3-4). Mutates
/// `steps` in place; `matched_aliases[i]` is the alias (if any) `steps[i]`
/// snapped to.
pub fn post_process_steps(
    steps: &mut [Value],
    matched_aliases: &mut [Option<SiteAlias>],
    aliases: &[SiteAlias],
) {
    let mut value_by_alias: HashMap<String, String> = HashMap::new();
    let mut last_value: Option<String> = None;

    for index in 0..steps.len() {
        let selector = match str_field(&steps[index], "selector") {
            Some(s) => s.to_string(),
            None => continue,
        };
        let step_type = str_field(&steps[index], "t").unwrap_or("").to_lowercase();
        let kind = str_field(&steps[index], "kind").unwrap_or("").to_lowercase();
        let alias = matched_aliases[index].clone();

        if kind == "text_contains" {
            if let Some(value) = str_field(&steps[index], "value").map(str::to_string) {
                steps[index]["selector"] = Value::String(append_has_text(&selector, &value));
                last_value = Some(value.clone());
                if let Some(alias) = &alias {
                    value_by_alias.insert(alias.selector.clone(), value.clone());
                    value_by_alias.insert(alias.name.clone(), value);
                }
                continue;
            }
        }

        if step_type == "assert" {
            if kind == "count_equals" || kind == "count_at_least" {
                if steps[index].get("value").is_none() {
                    if let Some(value) = &last_value {
                        steps[index]["value"] = Value::String(value.clone());
                    }
                }
                continue;
            }

            let mut value = str_field(&steps[index], "value").map(str::to_string);
            if value.is_none() {
                if let Some(alias) = &alias {
                    value = value_by_alias
                        .get(&alias.selector)
                        .or_else(|| value_by_alias.get(&alias.name))
                        .cloned();
                }
            }
            if value.is_none() {
                value = last_value.clone();
            }

            if let Some(value) = value {
                if steps[index].get("kind").and_then(Value::as_str).is_none() {
                    steps[index]["kind"] = Value::String("text_contains".to_string());
                }
                steps[index]["value"] = Value::String(value.clone());
                steps[index]["selector"] = Value::String(append_has_text(&selector, &value));
                last_value = Some(value.clone());
                if let Some(alias) = &alias {
                    value_by_alias.insert(alias.selector.clone(), value.clone());
                    value_by_alias.insert(alias.name.clone(), value);
                }
            }
            continue;
        }

        if step_type == "click" {
            let mut selector = selector;
            let mut alias = alias;

            let mut value = str_field(&steps[index], "value").map(str::to_string);
            if value.is_none() {
                if let Some(a) = &alias {
                    value = value_by_alias
                        .get(&a.selector)
                        .or_else(|| value_by_alias.get(&a.name))
                        .cloned();
                    if value.is_none() && a.name.to_lowercase().contains("list") {
                        if let Some(related) = find_related_item_alias(a, aliases) {
                            selector = related.selector.clone();
                            value = value_by_alias
                                .get(&related.selector)
                                .or_else(|| value_by_alias.get(&related.name))
                                .cloned();
                            alias = Some(related.clone());
                        }
                    }
                }
            }
            if value.is_none() {
                value = last_value.clone();
            }

            let targets_product_text = alias
                .as_ref()
                .map(is_product_name_alias)
                .unwrap_or_else(|| {
                    let lowered = selector.to_lowercase();
                    ["name", "title", "text", "content", "label"]
                        .iter()
                        .any(|kw| lowered.contains(kw))
                });
            if targets_product_text {
                if let Some(buy_alias) = find_buy_button_sibling(alias.as_ref(), aliases) {
                    selector = buy_alias.selector.clone();
                    alias = Some(buy_alias.clone());
                }
            }

            if let Some(value) = value {
                let is_buy_button = alias.as_ref().is_some_and(is_buy_button_alias);
                let is_image_assertion = str_field(&steps[index], "kind") == Some("visible")
                    && (selector.to_lowercase().contains("img")
                        || alias
                            .as_ref()
                            .is_some_and(|a| a.name.to_lowercase().contains("image")));

                if is_buy_button || is_image_assertion {
                    steps[index]["selector"] = Value::String(selector.clone());
                    if is_image_assertion {
                        if let Some(obj) = steps[index].as_object_mut() {
                            obj.remove("value");
                        }
                    }
                } else {
                    steps[index]["selector"] = Value::String(append_has_text(&selector, &value));
                    if steps[index].get("value").is_none() {
                        steps[index]["value"] = Value::String(value.clone());
                    }
                }

                if let Some(alias) = &alias {
                    if !is_image_assertion {
                        value_by_alias.insert(alias.selector.clone(), value.clone());
                        value_by_alias.insert(alias.name.clone(), value);
                    }
                }
            } else {
                steps[index]["selector"] = Value::String(selector.clone());
            }

            matched_aliases[index] = alias;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alias(name: &str, selector: &str, description: Option<&str>) -> SiteAlias {
        SiteAlias {
            name: name.to_string(),
            selector: selector.to_string(),
            description: description.map(str::to_string),
            role: None,
            confidence: None,
            notes: None,
            page_id: None,
        }
    }

    #[test]
    fn threads_text_contains_value_into_later_bare_assert() {
        let mut steps = vec![
            json!({"t": "assert", "selector": ".title", "kind": "text_contains", "value": "Widget"}),
            json!({"t": "assert", "selector": ".subtitle"}),
        ];
        let mut matched = vec![None, None];
        post_process_steps(&mut steps, &mut matched, &[]);
        assert_eq!(steps[1]["kind"], "text_contains");
        assert_eq!(steps[1]["value"], "Widget");
        assert!(steps[1]["selector"].as_str().unwrap().contains(":has-text(\"Widget\")"));
    }

    #[test]
    fn count_assertions_never_get_has_text() {
        let mut steps = vec![json!({"t": "assert", "selector": ".items", "kind": "count_at_least", "value": 3})];
        let mut matched = vec![None];
        post_process_steps(&mut steps, &mut matched, &[]);
        assert_eq!(steps[0]["selector"], ".items");
    }

    #[test]
    fn image_assertions_drop_value_and_skip_has_text() {
        let aliases = vec![alias("product.image", "img.product", None)];
        let mut steps = vec![json!({"t": "click", "selector": "img.product", "kind": "visible", "value": "ignored"})];
        let mut matched = vec![Some(aliases[0].clone())];
        post_process_steps(&mut steps, &mut matched, &aliases);
        assert_eq!(steps[0]["selector"], "img.product");
        assert!(steps[0].get("value").is_none());
    }

    #[test]
    fn buy_buttons_never_get_has_text_suffix() {
        let aliases = vec![alias("buy.button", ".buy-btn", Some("购买按钮"))];
        let mut steps = vec![json!({"t": "click", "selector": ".buy-btn", "value": "Widget"})];
        let mut matched = vec![Some(aliases[0].clone())];
        post_process_steps(&mut steps, &mut matched, &aliases);
        assert_eq!(steps[0]["selector"], ".buy-btn");
    }
}
