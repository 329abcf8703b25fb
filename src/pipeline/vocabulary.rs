use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::bucket::BucketSet;
use crate::types::{PartOfSpeech, SentenceId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VocabularyEntry {
    pub lemma: String,
    pub pos: PartOfSpeech,
    pub frequency: u32,
    pub first_occurrence: SentenceId,
}

/// Lemma frequency table over a subtitle file, in first-seen order.
///
/// This is a summary for reporting only; token identity stays positional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "Vec<VocabularyEntry>", into = "Vec<VocabularyEntry>")]
pub struct Vocabulary {
    entries: Vec<VocabularyEntry>,
    lemma_to_index: HashMap<(String, PartOfSpeech), usize>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence, adding the lemma on first sight.
    pub fn record(&mut self, lemma: &str, pos: PartOfSpeech, sentence_id: &SentenceId) {
        let key = (lemma.trim().to_string(), pos);
        if let Some(&index) = self.lemma_to_index.get(&key) {
            self.entries[index].frequency += 1;
            return;
        }
        self.lemma_to_index.insert(key.clone(), self.entries.len());
        self.entries.push(VocabularyEntry {
            lemma: key.0,
            pos,
            frequency: 1,
            first_occurrence: sentence_id.clone(),
        });
    }

    pub fn populate_from_buckets(&mut self, buckets: &BucketSet) {
        for token in buckets.tokens() {
            if !token.lemma.trim().is_empty() {
                self.record(&token.lemma, token.pos, &token.sentence_id);
            }
        }
    }

    pub fn get(&self, lemma: &str, pos: PartOfSpeech) -> Option<&VocabularyEntry> {
        self.lemma_to_index
            .get(&(lemma.trim().to_string(), pos))
            .map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    /// Number of distinct (lemma, pos) pairs.
    pub fn size(&self) -> usize {
        self.entries.len()
    }
}

impl From<Vec<VocabularyEntry>> for Vocabulary {
    fn from(entries: Vec<VocabularyEntry>) -> Self {
        let lemma_to_index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.lemma.clone(), e.pos), i))
            .collect();
        Vocabulary {
            entries,
            lemma_to_index,
        }
    }
}

impl From<Vocabulary> for Vec<VocabularyEntry> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.entries
    }
}
