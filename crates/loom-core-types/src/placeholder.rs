use serde::{Deserialize, Serialize};

/// A single `s_<field>[*N]` token found in a template string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderMatch {
    /// The full matched token, e.g. `s_price*2`.
    pub placeholder: String,
    pub field_name: String,
    pub multiplier: Option<i64>,
    pub is_gender_translation: bool,
}

impl PlaceholderMatch {
    pub fn is_expression(&self) -> bool {
        self.multiplier.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementError {
    pub error_type: String,
    pub placeholder: String,
    pub field_name: String,
    pub data_index: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplacementStats {
    pub errors: Vec<ReplacementError>,
}

impl ReplacementStats {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Per-error-type counts, used by the data expander's `stats.json`.
    pub fn counts_by_type(&self) -> std::collections::BTreeMap<String, usize> {
        let mut counts = std::collections::BTreeMap::new();
        for err in &self.errors {
            *counts.entry(err.error_type.clone()).or_insert(0) += 1;
        }
        counts
    }
}
