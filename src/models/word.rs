//! Word is a pair <term, definition> belonging to a word list
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(default, skip_serializing)]
    pub id: i64,
    #[serde(default, skip_serializing)]
    pub list_id: i64,
    pub term: String,
    pub definition: String,
    #[serde(default = "active", skip_serializing)]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

impl Word {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id: 0,
            list_id: 0,
            term: term.into(),
            definition: definition.into(),
            is_active: true,
        }
    }
}
