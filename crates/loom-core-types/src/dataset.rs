use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flat map from field name to string/number, one row of a dataset category.
pub type Row = BTreeMap<String, Value>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetCategory {
    pub category_key: String,
    pub items: Vec<Row>,
}

/// `{categories:[{category_key, items:[row]}]}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    pub categories: Vec<DatasetCategory>,
}

impl Dataset {
    pub fn category(&self, key: &str) -> Option<&DatasetCategory> {
        self.categories.iter().find(|c| c.category_key == key)
    }
}

/// On-disk envelope: `{data:{categories:[...]}}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetFile {
    pub data: Dataset,
}
