//! Container for all word lists known to the store
use super::{Subject, Word, WordList};

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub lists: Vec<WordList>,
}

impl Catalog {
    pub fn word(&self, id: i64) -> Option<&Word> {
        self.lists
            .iter()
            .flat_map(|list| list.words.iter())
            .find(|word| word.id == id)
    }

    pub fn list(&self, id: i64) -> Option<&WordList> {
        self.lists.iter().find(|list| list.id == id)
    }

    /// Short label used when presenting a subject for review.
    pub fn prompt_for(&self, subject: Subject) -> Option<(String, String)> {
        match subject {
            Subject::Word(id) => self
                .word(id)
                .map(|w| (w.term.clone(), w.definition.clone())),
            Subject::WordList(id) => self.list(id).map(|list| {
                let terms: Vec<&str> = list.active_words().map(|w| w.term.as_str()).collect();
                (format!("List: {}", list.name), terms.join(", "))
            }),
        }
    }
}
