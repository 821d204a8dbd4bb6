//! The filter algebra: a discriminated tree the Filter Engine translates
//! into a backend query, or interprets directly over loaded documents.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "UPPERCASE")]
pub enum Filter {
    Eq { key: String, value: serde_json::Value },
    Geq { key: String, value: serde_json::Value },
    Leq { key: String, value: serde_json::Value },
    Gt { key: String, value: serde_json::Value },
    Lt { key: String, value: serde_json::Value },
    Ne { key: String, value: serde_json::Value },
    In { key: String, values: Vec<serde_json::Value> },
    And { filters: Vec<Filter> },
    Or { filters: Vec<Filter> },
}

impl Filter {
    pub fn eq(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Eq { key: key.into(), value: value.into() }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }
}
