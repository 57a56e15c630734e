use std::collections::HashSet;

use loom_core_types::profile::SiteAlias;
use once_cell::sync::Lazy;
use regex::Regex;

static CONTAINS_SELECTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#":contains\((['"])\s*(.*?)\s*\1\)"#).unwrap());
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]{2,}").unwrap());

const CLICK_KEYWORDS: &[&str] = &[
    "button", "btn", "buy", "purchase", "click", "link", "submit", "confirm", "按钮", "购买",
    "点击", "提交", "确定", "buy_list", "buybtn",
];
const FILL_KEYWORDS: &[&str] = &[
    "input", "field", "textbox", "text", "search", "fill", "enter", "输入", "框", "文本框",
    "搜索", "填入",
];
const ASSERT_KEYWORDS: &[&str] = &[
    "title", "text", "label", "name", "content", "value", "price", "h1", "h2", "h3", "h4", "h5",
    "h6", "标题", "文本", "名称", "内容", "价格",
];

/// "Product name clicked instead of buy button" keyword set (spec §4.5 step 4).
const PRODUCT_NAME_KEYWORDS: &[&str] = &["name", "title", "商品", "名称"];
pub const BUY_BUTTON_KEYWORDS: &[&str] = &[
    "buy",
    "purchase",
    "购买",
    "buy_list",
    "shoppingcart_list",
];

/// Rewrites `:contains('X')` into `:has-text("X")`, escaping embedded quotes
/// (spec §4.5 step 1).
pub fn sanitize_selector(selector: &str) -> String {
    CONTAINS_SELECTOR_RE
        .replace_all(selector, |caps: &regex::Captures| {
            let text = caps[2].replace('"', "\\\"");
            format!(":has-text(\"{text}\")")
        })
        .into_owned()
}

fn extract_tokens(text: &str) -> HashSet<String> {
    TOKEN_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn keyword_score(tokens: &HashSet<String>, keywords: &[&str]) -> i32 {
    keywords
        .iter()
        .filter(|kw| tokens.contains(&kw.to_lowercase()))
        .count() as i32
}

/// Best-effort match of a step's selector against the profile's aliases, in
/// the cascade described by spec §4.5 step 2: exact/substring match first,
/// then a step-type-aware keyword score, then Jaccard-like token overlap.
/// Returns the (possibly rewritten) selector and the alias it snapped to, if
/// any.
pub fn fallback_selector_to_profile<'a>(
    selector: &str,
    step_type: &str,
    step_value: Option<&str>,
    aliases: &'a [SiteAlias],
) -> (String, Option<&'a SiteAlias>) {
    if aliases.is_empty() {
        return (selector.to_string(), None);
    }

    if let Some(alias) = aliases.iter().find(|a| a.selector == selector) {
        return (selector.to_string(), Some(alias));
    }

    let lowered = selector.to_lowercase();
    if let Some(alias) = aliases
        .iter()
        .find(|a| !a.selector.is_empty() && lowered.contains(&a.selector.to_lowercase()))
    {
        return (alias.selector.clone(), Some(alias));
    }

    let selector_tokens = extract_tokens(selector);
    let mut best: Option<(&SiteAlias, i32)> = None;

    for alias in aliases {
        let name_tokens = extract_tokens(&alias.name);
        let desc_tokens = alias
            .description
            .as_deref()
            .map(extract_tokens)
            .unwrap_or_default();
        let alias_selector_tokens = extract_tokens(&alias.selector);

        let mut score = 3 * selector_tokens.intersection(&alias_selector_tokens).count() as i32
            + 2 * selector_tokens.intersection(&name_tokens).count() as i32
            + selector_tokens.intersection(&desc_tokens).count() as i32;

        match step_type {
            "fill" => {
                if keyword_score(&name_tokens, FILL_KEYWORDS) > 0
                    || keyword_score(&alias_selector_tokens, FILL_KEYWORDS) > 0
                {
                    score += 4;
                }
            }
            "click" => {
                if keyword_score(&name_tokens, CLICK_KEYWORDS) > 0
                    || keyword_score(&alias_selector_tokens, CLICK_KEYWORDS) > 0
                {
                    score += 3;
                }
                let selector_is_product_name = selector_tokens
                    .iter()
                    .any(|t| PRODUCT_NAME_KEYWORDS.contains(&t.as_str()));
                let alias_is_buy_button = keyword_score(&name_tokens, BUY_BUTTON_KEYWORDS) > 0
                    || keyword_score(&desc_tokens, BUY_BUTTON_KEYWORDS) > 0;
                if selector_is_product_name && alias_is_buy_button {
                    score += 3;
                }
            }
            "assert" => {
                if keyword_score(&name_tokens, ASSERT_KEYWORDS) > 0
                    || keyword_score(&desc_tokens, ASSERT_KEYWORDS) > 0
                {
                    score += 1;
                }
                if let Some(value) = step_value {
                    if alias
                        .description
                        .as_deref()
                        .is_some_and(|d| d.contains(value))
                    {
                        score += 3;
                    }
                }
            }
            _ => {}
        }

        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((alias, score));
        }
    }

    if let Some((alias, score)) = best {
        if score >= 3 {
            return (alias.selector.clone(), Some(alias));
        }
    }

    (selector.to_string(), None)
}

/// True if an alias's name/description reads as a "buy" control the
/// product-name-text-clicked-instead-of-buy-button correction should target.
pub fn is_buy_button_alias(alias: &SiteAlias) -> bool {
    let haystack = format!(
        "{} {}",
        alias.name.to_lowercase(),
        alias.description.as_deref().unwrap_or("").to_lowercase()
    );
    BUY_BUTTON_KEYWORDS
        .iter()
        .chain(CLICK_KEYWORDS.iter().filter(|k| **k == "btn" || **k == "button"))
        .any(|kw| haystack.contains(kw))
}

/// True if an alias reads as "product name/title text" — the thing that
/// gets mis-clicked instead of its sibling buy button.
pub fn is_product_name_alias(alias: &SiteAlias) -> bool {
    let haystack = format!(
        "{} {}",
        alias.name.to_lowercase(),
        alias.description.as_deref().unwrap_or("").to_lowercase()
    );
    PRODUCT_NAME_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

/// Shared-path heuristic: two aliases are "siblings" in the same list item
/// when their selectors share at least two whitespace-separated segments.
pub fn shares_two_path_segments(a: &str, b: &str) -> bool {
    let parts_a: HashSet<&str> = a.split_whitespace().collect();
    let parts_b: HashSet<&str> = b.split_whitespace().collect();
    parts_a.intersection(&parts_b).count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_contains_selector() {
        assert_eq!(
            sanitize_selector(r#"div:contains('Buy Now')"#),
            r#"div:has-text("Buy Now")"#
        );
    }

    #[test]
    fn snaps_exact_selector_match() {
        let aliases = vec![SiteAlias {
            name: "search.input".into(),
            selector: "#q".into(),
            description: None,
            role: None,
            confidence: None,
            notes: None,
            page_id: None,
        }];
        let (selector, alias) = fallback_selector_to_profile("#q", "fill", None, &aliases);
        assert_eq!(selector, "#q");
        assert!(alias.is_some());
    }

    #[test]
    fn scores_click_keyword_match_above_threshold() {
        let aliases = vec![SiteAlias {
            name: "buy.button".into(),
            selector: ".buy-btn".into(),
            description: Some("购买按钮".into()),
            role: Some("按钮".into()),
            confidence: None,
            notes: None,
            page_id: None,
        }];
        let (selector, alias) =
            fallback_selector_to_profile(".some-buy-button-div", "click", None, &aliases);
        assert_eq!(selector, ".buy-btn");
        assert!(alias.is_some());
    }

    #[test]
    fn leaves_unmatched_selector_untouched() {
        let aliases = vec![SiteAlias {
            name: "footer.link".into(),
            selector: ".footer a".into(),
            description: None,
            role: None,
            confidence: None,
            notes: None,
            page_id: None,
        }];
        let (selector, alias) =
            fallback_selector_to_profile("#totally-unrelated", "click", None, &aliases);
        assert_eq!(selector, "#totally-unrelated");
        assert!(alias.is_none());
    }
}
