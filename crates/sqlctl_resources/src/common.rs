use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selects zero-or-more objects by label, used by `Reference::selector`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Selector {
    #[serde(rename = "matchLabels")]
    pub match_labels: std::collections::BTreeMap<String, String>,
}

/// The value/reference/selector triple resolved by the reference resolver
/// (C7, `SPEC_FULL.md` 4.6): an explicit value wins; otherwise a named
/// reference to another managed object is fetched by name; otherwise a
/// selector must match exactly one object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Reference {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "valueRef", default)]
    pub value_ref: Option<String>,
    #[serde(rename = "valueSelector", default)]
    pub value_selector: Option<Selector>,
}

impl Reference {
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            value_ref: None,
            value_selector: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum WithOption {
    Admin,
    Grant,
}
