//! Card display helpers.
//!
//! These fill in labels when an entry lacks data. They are display-only and
//! never written back to storage.

use crate::models::VocabularyEntry;

const GENERIC_MEANING: &str = "To perform an action or express a state of being";

/// Part-of-speech label shown next to the headword.
pub fn word_type(entry: &VocabularyEntry) -> &'static str {
    match (&entry.adjective, &entry.noun) {
        (Some(adjective), _) if !adjective.is_empty() && *adjective != entry.word => "verb",
        (_, Some(noun)) if !noun.is_empty() => "noun",
        _ => "word",
    }
}

/// First sentence of the example, or a generated meaning when there is no
/// example.
pub fn verb_meaning(entry: &VocabularyEntry) -> String {
    match entry.example.as_deref().filter(|e| !e.is_empty()) {
        Some(example) => {
            let first = example.split('.').next().unwrap_or_default();
            if first.is_empty() {
                GENERIC_MEANING.to_string()
            } else {
                first.to_string()
            }
        }
        None => format!("To perform an action related to {}", entry.word.to_lowercase()),
    }
}

pub fn synonyms(entry: &VocabularyEntry) -> &[String] {
    &entry.synonyms
}

/// `Label: value` lines for the "Word Forms" section.
pub fn word_forms(entry: &VocabularyEntry) -> Vec<String> {
    let mut forms = Vec::with_capacity(3);
    if let Some(noun) = entry.noun.as_deref().filter(|n| !n.is_empty()) {
        forms.push(format!("Noun: {noun}"));
    }
    if let Some(adjective) = entry.adjective.as_deref().filter(|a| !a.is_empty()) {
        forms.push(format!("Adjective: {adjective}"));
    }
    forms.push(format!("{}: {}", word_type(entry), entry.word));
    forms
}

/// Everything a card shows for one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct WordCard {
    pub word: String,
    pub word_type: &'static str,
    pub adjective: Option<String>,
    pub meaning: String,
    pub example: Option<String>,
    pub synonyms: Vec<String>,
    pub word_forms: Vec<String>,
    pub is_favorite: bool,
}

impl WordCard {
    pub fn new(entry: &VocabularyEntry, is_favorite: bool) -> Self {
        Self {
            word: entry.word.clone(),
            word_type: word_type(entry),
            adjective: entry.adjective.clone().filter(|a| !a.is_empty()),
            meaning: verb_meaning(entry),
            example: entry.example.clone().filter(|e| !e.is_empty()),
            synonyms: synonyms(entry).to_vec(),
            word_forms: word_forms(entry),
            is_favorite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(word: &str) -> VocabularyEntry {
        VocabularyEntry::new(word)
    }

    #[test]
    fn word_type_prefers_distinct_adjective() {
        let mut e = entry("Abate");
        assert_eq!(word_type(&e), "word");

        e.noun = Some("abatement".into());
        assert_eq!(word_type(&e), "noun");

        e.adjective = Some("Abate".into());
        assert_eq!(word_type(&e), "noun");

        e.adjective = Some("abated".into());
        assert_eq!(word_type(&e), "verb");
    }

    #[test]
    fn meaning_uses_first_sentence_or_fallbacks() {
        let mut e = entry("Ponder");
        assert_eq!(verb_meaning(&e), "To perform an action related to ponder");

        e.example = Some("She pondered the offer. Then she left.".into());
        assert_eq!(verb_meaning(&e), "She pondered the offer");

        e.example = Some(".hidden".into());
        assert_eq!(verb_meaning(&e), GENERIC_MEANING);
    }

    #[test]
    fn card_collects_forms_and_synonyms() {
        let mut e = entry("Vivid");
        e.noun = Some("vividness".into());
        e.synonyms = vec!["bright".into()];

        let card = WordCard::new(&e, true);
        assert_eq!(card.word_type, "noun");
        assert_eq!(card.word_forms, vec!["Noun: vividness", "noun: Vivid"]);
        assert_eq!(card.synonyms, vec!["bright"]);
        assert!(card.example.is_none());
        assert!(card.is_favorite);
    }
}
