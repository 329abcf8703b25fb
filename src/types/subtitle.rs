use serde::{Deserialize, Serialize};
use std::fmt;

/// One timestamped subtitle entry as handed over by the subtitle-file reader.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cue {
    pub order_index: u32,
    pub raw_text: String,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
}

/// Opaque sentence key. Derived from the cue's order index, never from its text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SentenceId(String);

impl SentenceId {
    pub fn from_order_index(order_index: u32) -> Self {
        SentenceId(format!("s{}", order_index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token key built from (sentence, position).
///
/// Two tokens with the same surface form or lemma always get different ids,
/// which is what lets generated content be matched back to the exact source token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(sentence_id: &SentenceId, position: usize) -> Self {
        TokenId(format!("{}-t{}", sentence_id.as_str(), position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TokenId {
    fn from(value: &str) -> Self {
        TokenId(value.to_string())
    }
}

impl From<String> for TokenId {
    fn from(value: String) -> Self {
        TokenId(value)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
}

impl PartOfSpeech {
    pub const ALL: [PartOfSpeech; 4] = [
        PartOfSpeech::Noun,
        PartOfSpeech::Verb,
        PartOfSpeech::Adjective,
        PartOfSpeech::Adverb,
    ];
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartOfSpeech::Noun => "NOUN",
            PartOfSpeech::Verb => "VERB",
            PartOfSpeech::Adjective => "ADJECTIVE",
            PartOfSpeech::Adverb => "ADVERB",
        };
        f.write_str(name)
    }
}

/// A normalized cue. Immutable once created; `order_index` drives interleaving order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceSentence {
    pub sentence_id: SentenceId,
    pub order_index: u32,
    pub raw_text: String,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    pub token_id: TokenId,
    pub sentence_id: SentenceId,
    pub surface_form: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    /// Index among the kept tokens of the sentence, contiguous from 0.
    pub position_in_sentence: usize,
    /// Hiragana reading when the analyzer supplies one.
    #[serde(default)]
    pub reading: Option<String>,
}
