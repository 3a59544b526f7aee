//! WordList is a named set of words; it can be practiced as a single subject
use super::Word;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordList {
    #[serde(default, skip_serializing)]
    pub id: i64,
    pub name: String,
    pub words: Vec<Word>,
    #[serde(default = "active", skip_serializing)]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

impl WordList {
    pub fn active_words(&self) -> impl Iterator<Item = &Word> {
        self.words.iter().filter(|w| w.is_active)
    }

    /// Copy holding only the active words, as written by list export.
    pub fn active_only(&self) -> WordList {
        WordList {
            words: self.active_words().cloned().collect(),
            ..self.clone()
        }
    }
}

impl Default for WordList {
    fn default() -> Self {
        Self {
            id: 0,
            name: "My Words".to_string(),
            words: Vec::new(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_only_drops_deleted_words() {
        let mut deleted = Word::new("żegnaj", "farewell");
        deleted.is_active = false;
        let list = WordList {
            name: "Polish".to_string(),
            words: vec![Word::new("cześć", "hello"), deleted],
            ..WordList::default()
        };

        let exported = list.active_only();
        assert_eq!(exported.name, "Polish");
        assert_eq!(exported.words.len(), 1);
        assert_eq!(exported.words[0].term, "cześć");
        assert_eq!(list.words.len(), 2);
    }
}
